use super::{CorrelationId, Message};
use serde::{Deserialize, Serialize};

/// 超时事件：超时源在登记的延迟到期后发布到总线，
/// 仅携带关联 ID，形态固定。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutExpired {
    correlation_id: CorrelationId,
}

impl TimeoutExpired {
    pub fn new(correlation_id: impl Into<CorrelationId>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

impl Message for TimeoutExpired {
    const NAME: &'static str = "deferral.timeout_expired";
}
