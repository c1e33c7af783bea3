//! 类型擦除后的消息形态（SerializedMessage）
//!
//! 存储层只以无类型的 JSON 值保存负载，同时保存生产时捕获的类型描述（`Message::NAME`），
//! 重新投递时据此校验并还原为原始的具体类型。
//!
use super::Message;
use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedMessage {
    /// 消息类型描述，对应 `Message::NAME`
    message_type: String,
    /// 消息负载
    payload: Value,
}

impl SerializedMessage {
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
        }
    }

    /// 序列化具体消息，并捕获其类型描述
    pub fn from_message<M: Message>(message: &M) -> DomainResult<Self> {
        Ok(Self {
            message_type: M::NAME.to_string(),
            payload: serde_json::to_value(message)?,
        })
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 是否以 `M` 的类型描述保存
    pub fn is<M: Message>(&self) -> bool {
        self.message_type == M::NAME
    }

    /// 还原为具体消息
    ///
    /// 类型描述与 `M::NAME` 不一致，或负载无法按 `M` 反序列化，均视为完整性破坏。
    pub fn into_message<M: Message>(self) -> DomainResult<M> {
        if !self.is::<M>() {
            return Err(DomainError::TypeMismatch {
                expected: M::NAME.to_string(),
                found: self.message_type,
            });
        }

        serde_json::from_value(self.payload).map_err(|e| DomainError::CorruptedPayload {
            message_type: self.message_type,
            reason: e.to_string(),
        })
    }
}
