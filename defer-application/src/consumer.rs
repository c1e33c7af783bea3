//! 重新投递消费者（RedeliveryConsumer）
//!
//! 将一次 `TimeoutExpired` 通知转化为对原延迟消息的单次重新发布：
//! - `accept`：以 `contains` 做廉价筛选，拒绝时不做任何存储变更；
//! - `consume`：原子认领条目，认领失败（已被其他实例认领）静默结束；
//!   认领成功则以原始具体类型重新发布；
//! - 不做重试，重试属于总线对超时事件本身的职责。
//!
//! 多个消费者实例可并发处理同一关联 ID 的超时事件，正确性只依赖 `claim` 的原子性。
//!
use crate::dispatcher::MessageDispatcher;
use crate::error::AppError;
use defer_domain::eventing::MessageBus;
use defer_domain::message::TimeoutExpired;
use defer_domain::persist::DeferredMessageStore;
use std::sync::Arc;
use tracing::{debug, info};

/// 单个超时事件的处理结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedeliveryOutcome {
    /// 筛选阶段存储中没有对应条目，未做任何处理
    Declined,
    /// 筛选通过，但条目已被其他实例认领
    AlreadyClaimed,
    /// 认领成功并已按原始类型重新发布
    Redelivered { message_type: String },
}

pub struct RedeliveryConsumer<B> {
    bus: Arc<B>,
    store: Arc<dyn DeferredMessageStore>,
    dispatcher: Arc<MessageDispatcher<B>>,
}

impl<B> Clone for RedeliveryConsumer<B> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
            store: self.store.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<B> RedeliveryConsumer<B>
where
    B: MessageBus + 'static,
{
    pub fn new(
        bus: Arc<B>,
        store: Arc<dyn DeferredMessageStore>,
        dispatcher: Arc<MessageDispatcher<B>>,
    ) -> Self {
        Self {
            bus,
            store,
            dispatcher,
        }
    }

    /// 筛选：当且仅当存储中存在对应条目时接受
    ///
    /// 结果仅作提示，接受之后条目仍可能被其他实例抢先认领。
    pub async fn accept(&self, event: &TimeoutExpired) -> Result<bool, AppError> {
        Ok(self.store.contains(event.correlation_id()).await?)
    }

    /// 认领并以原始具体类型重新发布
    pub async fn consume(&self, event: &TimeoutExpired) -> Result<RedeliveryOutcome, AppError> {
        let correlation_id = event.correlation_id();

        let Some(entry) = self.store.claim(correlation_id).await? else {
            debug!(%correlation_id, "deferred message already claimed");
            return Ok(RedeliveryOutcome::AlreadyClaimed);
        };

        let message = entry.into_message();
        let message_type = message.message_type().to_string();
        self.dispatcher.dispatch(&self.bus, message).await?;

        info!(%correlation_id, %message_type, "deferred message redelivered");
        Ok(RedeliveryOutcome::Redelivered { message_type })
    }

    /// 完整处理一个超时事件：筛选 → 认领 → 重新发布
    pub async fn handle(&self, event: &TimeoutExpired) -> Result<RedeliveryOutcome, AppError> {
        if !self.accept(event).await? {
            debug!(correlation_id = %event.correlation_id(), "timeout declined");
            return Ok(RedeliveryOutcome::Declined);
        }
        self.consume(event).await
    }
}
