use defer_application::{
    DeferralService, MessageDispatcher, RedeliveryConfig, RedeliveryEngine, TokioTimeoutScheduler,
};
use defer_domain::eventing::{InMemoryMessageBus, MessageBus};
use defer_domain::persist::InMemoryDeferredStore;
use defer_macros::message;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[message(name = "orders.timeout")]
struct OrderTimeoutMessage {
    order_id: u64,
}

#[message(name = "payments.overdue")]
struct PaymentOverdue {
    invoice: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 可选：第一个参数为 JSON 配置文件路径
    let cfg = match std::env::args().nth(1) {
        Some(path) => RedeliveryConfig::from_json_file(path)?,
        None => RedeliveryConfig::default(),
    };

    let bus = Arc::new(InMemoryMessageBus::new(cfg.bus_capacity));
    let store = Arc::new(InMemoryDeferredStore::with_policy(cfg.duplicate_policy));
    let dispatcher = Arc::new(MessageDispatcher::<InMemoryMessageBus>::new());
    let scheduler = Arc::new(TokioTimeoutScheduler::new(bus.clone()));
    let deferral = DeferralService::new(store.clone(), dispatcher.clone(), scheduler.clone());

    let mut orders = bus.subscribe::<OrderTimeoutMessage>().await;
    let mut payments = bus.subscribe::<PaymentOverdue>().await;

    // 两个竞争消费者实例
    let mut handles = Vec::new();
    for name in ["consumer-a", "consumer-b"] {
        let engine = Arc::new(
            RedeliveryEngine::builder()
                .bus(bus.clone())
                .store(store.clone())
                .dispatcher(dispatcher.clone())
                .config(cfg.clone())
                .name(name)
                .build(),
        );
        handles.push(engine.start().await);
    }

    deferral
        .defer(
            "abc123",
            &OrderTimeoutMessage { order_id: 42 },
            Duration::from_millis(200),
        )
        .await?;
    deferral
        .defer(
            "inv-7",
            &PaymentOverdue {
                invoice: "INV-7".into(),
            },
            Duration::from_millis(300),
        )
        .await?;
    deferral
        .defer(
            "abc124",
            &OrderTimeoutMessage { order_id: 43 },
            Duration::from_millis(400),
        )
        .await?;
    deferral.cancel(&"abc124".into()).await?;

    if let Some(Ok(order)) = orders.next().await {
        info!(order_id = order.order_id, "order timeout received");
    }
    if let Some(Ok(payment)) = payments.next().await {
        info!(invoice = %payment.invoice, "payment overdue received");
    }

    // 等待被撤回的那条超时事件经过消费者
    tokio::time::sleep(Duration::from_millis(300)).await;

    for handle in &handles {
        handle.shutdown();
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let stats = handle.stats();
        handle.join().await;
        info!(
            instance = i,
            redelivered = stats.redelivered(),
            already_claimed = stats.already_claimed(),
            declined = stats.declined(),
            failed = stats.failed(),
            lagged = stats.lagged(),
            reclaimed = stats.reclaimed(),
            "consumer stopped"
        );
    }
    scheduler.shutdown();
    info!(pending = store.len(), "demo finished");

    Ok(())
}
