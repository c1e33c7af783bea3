//! 消息（Message）与延迟投递相关的值类型
//!
//! 定义总线消息需要实现的最小接口（`Message`），用于关联延迟消息与超时事件的
//! `CorrelationId`，类型擦除后的持久化形态 `SerializedMessage`，
//! 以及由超时源发出的 `TimeoutExpired` 事件。

mod correlation_id;
mod message_trait;
mod serialized_message;
mod timeout_expired;

pub use correlation_id::CorrelationId;
pub use message_trait::Message;
pub use serialized_message::SerializedMessage;
pub use timeout_expired::TimeoutExpired;
