//! 领域层统一错误定义
//!
//! 聚焦序列化、消息类型校验、消息总线与延迟消息存储的最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
//! 注意：认领（claim）时找不到条目属于正常结果，以 `Option::None` 表达，
//! 不在此处建模为错误。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/消息类型 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },
    #[error("corrupted payload: type={message_type}, reason={reason}")]
    CorruptedPayload {
        message_type: String,
        reason: String,
    },

    // --- 消息总线 ---
    #[error("message bus error: {reason}")]
    MessageBus { reason: String },

    // --- 延迟消息存储 ---
    #[error("duplicate correlation id: {correlation_id}")]
    DuplicateKey { correlation_id: String },
    #[error("deferred store error: {reason}")]
    DeferredStore { reason: String },

    // --- 通用 ---
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
}

impl DomainError {
    pub fn message_bus(reason: impl Into<String>) -> Self {
        DomainError::MessageBus {
            reason: reason.into(),
        }
    }

    pub fn deferred_store(reason: impl Into<String>) -> Self {
        DomainError::DeferredStore {
            reason: reason.into(),
        }
    }

    /// 是否为存储完整性破坏（类型描述与负载不一致）
    ///
    /// 这类错误意味着存储实现有缺陷或后端数据已损坏，调用方应向上暴露而非吞掉。
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            DomainError::TypeMismatch { .. } | DomainError::CorruptedPayload { .. }
        )
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
