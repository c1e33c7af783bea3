//! 超时调度（TimeoutScheduler）
//!
//! 延迟到期后向总线发布 `TimeoutExpired`。核心只消费该事件；
//! 这里提供的 `TokioTimeoutScheduler` 是进程内的最小实现，不做定时器持久化，
//! 进程退出时未到期的定时器随之丢失。
//!
use crate::error::AppError;
use async_trait::async_trait;
use defer_domain::eventing::MessageBus;
use defer_domain::message::{CorrelationId, TimeoutExpired};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 超时调度器：为关联 ID 登记一个延迟，到期后发出 `TimeoutExpired`
#[async_trait]
pub trait TimeoutScheduler: Send + Sync {
    async fn schedule(&self, correlation_id: CorrelationId, delay: Duration)
    -> Result<(), AppError>;
}

#[async_trait]
impl<T> TimeoutScheduler for Arc<T>
where
    T: TimeoutScheduler + ?Sized,
{
    async fn schedule(
        &self,
        correlation_id: CorrelationId,
        delay: Duration,
    ) -> Result<(), AppError> {
        (**self).schedule(correlation_id, delay).await
    }
}

/// 基于 tokio 定时器的调度器：每次登记启动一个任务，到期发布超时事件
pub struct TokioTimeoutScheduler<B> {
    bus: Arc<B>,
    token: CancellationToken,
}

impl<B> TokioTimeoutScheduler<B>
where
    B: MessageBus + 'static,
{
    pub fn new(bus: Arc<B>) -> Self {
        Self {
            bus,
            token: CancellationToken::new(),
        }
    }

    /// 取消所有尚未到期的定时器；之后的登记返回错误
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[async_trait]
impl<B> TimeoutScheduler for TokioTimeoutScheduler<B>
where
    B: MessageBus + 'static,
{
    async fn schedule(
        &self,
        correlation_id: CorrelationId,
        delay: Duration,
    ) -> Result<(), AppError> {
        if self.token.is_cancelled() {
            return Err(AppError::Scheduler("scheduler is shut down".into()));
        }

        let bus = self.bus.clone();
        let token = self.token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(%correlation_id, "timeout cancelled before expiry");
                }
                _ = tokio::time::sleep(delay) => {
                    if let Err(err) = bus.publish(TimeoutExpired::new(correlation_id.clone())).await {
                        warn!(%correlation_id, error = %err, "failed to publish timeout");
                    }
                }
            }
        });

        Ok(())
    }
}
