//! 延迟消息持久化（persist）
//!
//! 定义延迟消息条目、存储协议及内存实现：
//! - `DeferredEntry`：关联 ID + 类型擦除后的消息 + 延迟时间；
//! - `DeferredMessageStore`：`put` / `contains` / `claim` 三个操作，其中 `claim`
//!   为原子的“查找并移除”，是唯一在 `put` 之后改变成员关系的操作；
//! - `InMemoryDeferredStore`：基于分片并发映射的进程内实现。
//!
//! 该模块聚焦协议，外部键值存储或事务表等后端由上层提供实现并注入。
//!
mod deferred_entry;
mod deferred_store;
mod inmemory_deferred_store;

pub use deferred_entry::DeferredEntry;
pub use deferred_store::{DeferredMessageStore, DuplicatePolicy};
pub use inmemory_deferred_store::InMemoryDeferredStore;
