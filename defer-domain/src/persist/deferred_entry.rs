//! 延迟消息条目（DeferredEntry）
//!
//! 条目创建后不再修改；由存储独占持有，直到被成功认领。
//! `due_at` 是预期的超时时间，超时事件丢失时回收扫描据此找回过期条目。
//!
use crate::error::DomainResult;
use crate::message::{CorrelationId, Message, SerializedMessage};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct DeferredEntry {
    /// 关联 ID，存储的唯一键
    correlation_id: CorrelationId,
    /// 类型擦除后的消息（负载 + 类型描述）
    message: SerializedMessage,
    /// 延迟登记时间
    #[builder(default = Utc::now())]
    deferred_at: DateTime<Utc>,
    /// 预期到期时间（缺省为立即到期）
    #[builder(default = Utc::now())]
    due_at: DateTime<Utc>,
}

impl DeferredEntry {
    pub fn new(correlation_id: impl Into<CorrelationId>, message: SerializedMessage) -> Self {
        let now = Utc::now();
        Self {
            correlation_id: correlation_id.into(),
            message,
            deferred_at: now,
            due_at: now,
        }
    }

    /// 序列化具体消息并构造条目
    pub fn from_message<M: Message>(
        correlation_id: impl Into<CorrelationId>,
        message: &M,
    ) -> DomainResult<Self> {
        Ok(Self::new(
            correlation_id,
            SerializedMessage::from_message(message)?,
        ))
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn message(&self) -> &SerializedMessage {
        &self.message
    }

    pub fn message_type(&self) -> &str {
        self.message.message_type()
    }

    pub fn deferred_at(&self) -> DateTime<Utc> {
        self.deferred_at
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    /// 以登记时间加上延迟作为到期时间；超出可表示范围时视为永不到期
    pub fn due_in(mut self, delay: Duration) -> Self {
        self.due_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| self.deferred_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self
    }

    pub fn is_overdue(&self, cutoff: DateTime<Utc>) -> bool {
        self.due_at <= cutoff
    }

    /// 拆出消息（认领之后由消费者取得所有权）
    pub fn into_message(self) -> SerializedMessage {
        self.message
    }
}
