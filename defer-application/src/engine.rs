//! 重新投递引擎（RedeliveryEngine）
//!
//! 驱动一个重新投递消费者实例的长驻任务：
//! - 启动时订阅总线上的 `TimeoutExpired`；
//! - 按配置的并发上限处理超时事件，统计各类处理结果；
//! - 失败只记录日志与计数，不做重试；
//! - 订阅落后（超时事件被总线丢弃）时计数，并由周期性回收扫描
//!   对超过到期时间的条目补发处理，避免条目永久滞留；
//! - 提供关闭与等待的 `EngineHandle`。
//!
//! 同一总线上启动多个引擎即构成竞争消费者，每个实例都会收到同一超时事件，
//! 由存储的原子认领保证只有一个实例重新发布。
//!
use crate::config::RedeliveryConfig;
use crate::consumer::{RedeliveryConsumer, RedeliveryOutcome};
use crate::dispatcher::MessageDispatcher;
use bon::Builder;
use chrono::Utc;
use defer_domain::error::DomainResult;
use defer_domain::eventing::MessageBus;
use defer_domain::message::TimeoutExpired;
use defer_domain::persist::DeferredMessageStore;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Builder)]
pub struct RedeliveryEngine<B> {
    bus: Arc<B>,
    store: Arc<dyn DeferredMessageStore>,
    dispatcher: Arc<MessageDispatcher<B>>,
    #[builder(default)]
    config: RedeliveryConfig,
    /// 实例名称（用于日志区分竞争消费者）
    #[builder(into, default = String::from("redelivery"))]
    name: String,
}

impl<B> RedeliveryEngine<B>
where
    B: MessageBus + 'static,
{
    /// 启动引擎，返回可用于关闭/等待的句柄
    ///
    /// 返回前已完成订阅，此后发布的超时事件都会被本实例看到。
    pub async fn start(self: Arc<Self>) -> EngineHandle {
        let token = CancellationToken::new();
        let stats = Arc::new(RedeliveryStats::default());
        let stream = self.bus.subscribe::<TimeoutExpired>().await;

        info!(engine = %self.name, concurrency = self.config.consumer_concurrency, "redelivery engine started");

        let mut tasks = vec![tokio::spawn(Self::consume_loop(
            self.clone(),
            stream,
            token.clone(),
            stats.clone(),
        ))];
        if let Some(period) = self.config.reclaim_interval() {
            tasks.push(tokio::spawn(Self::reclaim_loop(
                self.clone(),
                period,
                token.clone(),
                stats.clone(),
            )));
        }

        EngineHandle {
            token,
            tasks,
            stats,
        }
    }

    fn consumer(&self) -> RedeliveryConsumer<B> {
        RedeliveryConsumer::new(
            self.bus.clone(),
            self.store.clone(),
            self.dispatcher.clone(),
        )
    }

    async fn consume_loop(
        self: Arc<Self>,
        stream: BoxStream<'static, DomainResult<TimeoutExpired>>,
        token: CancellationToken,
        stats: Arc<RedeliveryStats>,
    ) {
        let consumer = self.consumer();
        let concurrency = self.config.consumer_concurrency.max(1);
        let name = self.name.as_str();
        let consumer = &consumer;
        let stats = &stats;

        // 关闭后不再接收新事件，已在处理中的事件会执行完毕
        stream
            .take_until(token.cancelled_owned())
            .for_each_concurrent(Some(concurrency), move |item| async move {
                match item {
                    Ok(event) => {
                        Self::process(name, consumer, stats, event).await;
                    }
                    Err(err) => {
                        stats.lagged.fetch_add(1, Ordering::Relaxed);
                        warn!(engine = name, error = %err, "timeout events dropped, overdue entries left to reclaim sweep");
                    }
                }
            })
            .await;

        info!(engine = name, "redelivery engine stopped");
    }

    /// 周期性回收：对超过到期时间 `reclaim_grace` 仍未被认领的条目补发处理
    async fn reclaim_loop(
        self: Arc<Self>,
        period: std::time::Duration,
        token: CancellationToken,
        stats: Arc<RedeliveryStats>,
    ) {
        let consumer = self.consumer();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.sweep(&consumer, &stats).await,
            }
        }
    }

    async fn sweep(&self, consumer: &RedeliveryConsumer<B>, stats: &RedeliveryStats) {
        let grace = chrono::Duration::from_std(self.config.reclaim_grace())
            .unwrap_or_else(|_| chrono::Duration::zero());
        let now = Utc::now();
        let cutoff = now.checked_sub_signed(grace).unwrap_or(now);

        let overdue = match self.store.overdue(cutoff).await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(engine = %self.name, error = %err, "failed to list overdue entries");
                return;
            }
        };
        if overdue.is_empty() {
            return;
        }

        warn!(engine = %self.name, count = overdue.len(), "reclaiming overdue deferred messages");
        for correlation_id in overdue {
            let outcome =
                Self::process(&self.name, consumer, stats, TimeoutExpired::new(correlation_id))
                    .await;
            if matches!(outcome, Some(RedeliveryOutcome::Redelivered { .. })) {
                stats.reclaimed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    async fn process(
        name: &str,
        consumer: &RedeliveryConsumer<B>,
        stats: &RedeliveryStats,
        event: TimeoutExpired,
    ) -> Option<RedeliveryOutcome> {
        let correlation_id = event.correlation_id();
        match consumer.handle(&event).await {
            Ok(outcome) => {
                let counter = match outcome {
                    RedeliveryOutcome::Redelivered { .. } => &stats.redelivered,
                    RedeliveryOutcome::AlreadyClaimed => &stats.already_claimed,
                    RedeliveryOutcome::Declined => &stats.declined,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                Some(outcome)
            }
            Err(err) if err.is_integrity_violation() => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(engine = name, %correlation_id, error = %err, "deferred message integrity violated");
                None
            }
            Err(err) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(engine = name, %correlation_id, error = %err, "redelivery failed");
                None
            }
        }
    }
}

/// 处理结果计数
#[derive(Debug, Default)]
pub struct RedeliveryStats {
    redelivered: AtomicUsize,
    already_claimed: AtomicUsize,
    declined: AtomicUsize,
    failed: AtomicUsize,
    lagged: AtomicUsize,
    reclaimed: AtomicUsize,
}

impl RedeliveryStats {
    pub fn redelivered(&self) -> usize {
        self.redelivered.load(Ordering::Relaxed)
    }

    pub fn already_claimed(&self) -> usize {
        self.already_claimed.load(Ordering::Relaxed)
    }

    pub fn declined(&self) -> usize {
        self.declined.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// 订阅落后导致超时事件被丢弃的次数（每次可能丢弃多条）
    pub fn lagged(&self) -> usize {
        self.lagged.load(Ordering::Relaxed)
    }

    /// 由回收扫描完成的重新投递数（已计入 `redelivered`）
    pub fn reclaimed(&self) -> usize {
        self.reclaimed.load(Ordering::Relaxed)
    }

    /// 已处理完成的超时事件总数（含回收扫描补发的处理）
    pub fn processed(&self) -> usize {
        self.redelivered() + self.already_claimed() + self.declined() + self.failed()
    }
}

/// 引擎运行句柄：用于优雅关闭与等待任务结束
pub struct EngineHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    stats: Arc<RedeliveryStats>,
}

impl EngineHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn stats(&self) -> Arc<RedeliveryStats> {
        self.stats.clone()
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for t in tasks {
            let _ = t.await;
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
