//! 延迟投递服务（DeferralService）
//!
//! 生产者侧入口：以关联 ID 登记一条消息，并在延迟到期后由重新投递消费者发布。
//!
use crate::dispatcher::MessageDispatcher;
use crate::error::AppError;
use crate::scheduler::TimeoutScheduler;
use defer_domain::eventing::MessageBus;
use defer_domain::message::{CorrelationId, Message};
use defer_domain::persist::{DeferredEntry, DeferredMessageStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct DeferralService<B> {
    store: Arc<dyn DeferredMessageStore>,
    dispatcher: Arc<MessageDispatcher<B>>,
    scheduler: Arc<dyn TimeoutScheduler>,
}

impl<B> DeferralService<B>
where
    B: MessageBus + 'static,
{
    pub fn new(
        store: Arc<dyn DeferredMessageStore>,
        dispatcher: Arc<MessageDispatcher<B>>,
        scheduler: Arc<dyn TimeoutScheduler>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            scheduler,
        }
    }

    /// 延迟一条消息
    ///
    /// - 注册消息类型，使重新投递时能还原具体类型；
    /// - 登记条目（重复关联 ID 按存储的策略处理）；
    /// - 登记超时。登记超时失败时收回条目，避免遗留永不到期的条目，并返回调度错误。
    ///
    /// 覆盖策略下替换待投递条目时，旧条目的超时仍然有效，会按旧的延迟投递新消息。
    pub async fn defer<M: Message>(
        &self,
        correlation_id: impl Into<CorrelationId>,
        message: &M,
        delay: Duration,
    ) -> Result<(), AppError> {
        let correlation_id = correlation_id.into();

        self.dispatcher.register::<M>()?;
        let entry = DeferredEntry::from_message(correlation_id.clone(), message)?.due_in(delay);
        let replacing = self.store.contains(&correlation_id).await?;
        self.store.put(entry.clone()).await?;
        if replacing {
            warn!(%correlation_id, "pending deferral replaced, its earlier timeout stays armed");
        }

        if let Err(err) = self.scheduler.schedule(correlation_id.clone(), delay).await {
            warn!(%correlation_id, error = %err, "failed to schedule timeout, withdrawing deferral");
            self.withdraw(&entry).await;
            return Err(err);
        }

        debug!(%correlation_id, message_type = M::NAME, ?delay, "message deferred");
        Ok(())
    }

    /// 撤回一条尚未投递的延迟消息；返回是否撤回成功
    ///
    /// 撤回同样通过认领完成，之后到达的超时事件按“已认领”处理。
    pub async fn cancel(&self, correlation_id: &CorrelationId) -> Result<bool, AppError> {
        let withdrawn = self.store.claim(correlation_id).await?.is_some();
        if withdrawn {
            debug!(%correlation_id, "deferral cancelled");
        }
        Ok(withdrawn)
    }

    /// 收回本次登记的条目；若条目已被并发的 `defer` 替换，则放回替换后的条目
    async fn withdraw(&self, entry: &DeferredEntry) {
        let correlation_id = entry.correlation_id();
        match self.store.claim(correlation_id).await {
            Ok(Some(claimed)) if claimed != *entry => {
                if let Err(err) = self.store.put(claimed).await {
                    error!(%correlation_id, error = %err, "failed to restore replaced deferral");
                }
            }
            Ok(_) => {}
            Err(err) => {
                error!(%correlation_id, error = %err, "failed to withdraw unscheduled deferral");
            }
        }
    }

    pub async fn is_pending(&self, correlation_id: &CorrelationId) -> Result<bool, AppError> {
        Ok(self.store.contains(correlation_id).await?)
    }
}
