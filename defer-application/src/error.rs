use defer_domain::error::DomainError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("dispatcher not found: message_type={message_type}")]
    DispatcherNotFound { message_type: String },

    #[error("message type already registered by another type: message_type={message_type}")]
    AlreadyRegistered { message_type: &'static str },

    #[error("scheduler: {0}")]
    Scheduler(String),

    #[error("config: {0}")]
    Config(String),
}

impl AppError {
    /// 是否为存储完整性破坏（类型描述与负载不一致）
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, AppError::Domain(e) if e.is_integrity_violation())
    }
}
