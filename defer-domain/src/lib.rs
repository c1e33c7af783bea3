//! 延迟消息重新投递的领域层基础库（defer-domain）
//!
//! 提供延迟投递所需的通用抽象与构件：
//! - 消息（`message`）：`Message` 协议、关联 ID、超时事件与类型擦除后的消息形态
//! - 延迟消息存储（`persist`）：`put/contains/claim` 协议与内存实现
//! - 消息总线（`eventing`）：按具体类型发布/订阅的协议与内存实现
//!
//! 本 crate 尽量保持与存储与传输实现解耦，仅定义领域层接口与最小必要的错误类型，
//! 以便在不同基础设施（例如外部键值存储、消息中间件等）上进行适配实现。
//!
//! 典型用法：
//! 1. 使用 `#[message]` 定义可延迟的消息类型；
//! 2. 选择 `persist` 中的存储实现（或自行实现 `DeferredMessageStore`）；
//! 3. 选择 `eventing` 中的总线实现（或自行实现 `MessageBus`）；
//! 4. 在应用层组装重新投递的消费者与引擎。
//!
pub mod error;
#[cfg(feature = "eventing")]
pub mod eventing;
pub mod message;
pub mod persist;

// 允许在本 crate 内部通过 ::defer_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::defer_domain 路径。
extern crate self as defer_domain;
