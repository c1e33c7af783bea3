use anyhow::Result as AnyResult;
use defer_application::{
    DeferralService, MessageDispatcher, RedeliveryConfig, RedeliveryEngine, TokioTimeoutScheduler,
};
use defer_domain::eventing::{InMemoryMessageBus, MessageBus};
use defer_domain::message::TimeoutExpired;
use defer_domain::persist::InMemoryDeferredStore;
use defer_macros::message;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;

#[message(name = "orders.timeout")]
#[derive(PartialEq)]
struct OrderTimeoutMessage {
    order_id: u64,
}

#[message(name = "payments.overdue")]
struct PaymentOverdue {
    invoice: String,
}

struct World {
    bus: Arc<InMemoryMessageBus>,
    store: Arc<InMemoryDeferredStore>,
    dispatcher: Arc<MessageDispatcher<InMemoryMessageBus>>,
    scheduler: Arc<TokioTimeoutScheduler<InMemoryMessageBus>>,
    deferral: DeferralService<InMemoryMessageBus>,
}

fn world(cfg: &RedeliveryConfig) -> World {
    let bus = Arc::new(InMemoryMessageBus::new(cfg.bus_capacity));
    let store = Arc::new(InMemoryDeferredStore::with_policy(cfg.duplicate_policy));
    let dispatcher = Arc::new(MessageDispatcher::<InMemoryMessageBus>::new());
    let scheduler = Arc::new(TokioTimeoutScheduler::new(bus.clone()));
    let deferral = DeferralService::new(store.clone(), dispatcher.clone(), scheduler.clone());
    World {
        bus,
        store,
        dispatcher,
        scheduler,
        deferral,
    }
}

fn engine(w: &World, name: &str, cfg: &RedeliveryConfig) -> Arc<RedeliveryEngine<InMemoryMessageBus>> {
    Arc::new(
        RedeliveryEngine::builder()
            .bus(w.bus.clone())
            .store(w.store.clone())
            .dispatcher(w.dispatcher.clone())
            .config(cfg.clone())
            .name(name)
            .build(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn deferred_message_is_redelivered_exactly_once_to_matching_subscribers() -> AnyResult<()> {
    let cfg = RedeliveryConfig::from_json_str(r#"{"consumer_concurrency": 4}"#)?;
    let w = world(&cfg);

    let mut orders = w.bus.subscribe::<OrderTimeoutMessage>().await;
    let mut payments = w.bus.subscribe::<PaymentOverdue>().await;

    // 两个竞争消费者实例，都会收到同一个超时事件
    let first = engine(&w, "consumer-a", &cfg).start().await;
    let second = engine(&w, "consumer-b", &cfg).start().await;
    let (stats_a, stats_b) = (first.stats(), second.stats());

    w.deferral
        .defer(
            "abc123",
            &OrderTimeoutMessage { order_id: 42 },
            Duration::from_millis(50),
        )
        .await?;
    assert!(w.deferral.is_pending(&"abc123".into()).await?);

    let got = tokio::time::timeout(Duration::from_secs(2), orders.next())
        .await?
        .expect("stream open")?;
    assert_eq!(got, OrderTimeoutMessage { order_id: 42 });

    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        while stats_a.processed() + stats_b.processed() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    first.shutdown();
    second.shutdown();
    first.join().await;
    second.join().await;
    w.scheduler.shutdown();

    // 恰好一次重新发布；另一个实例要么筛选拒绝，要么认领落空
    assert_eq!(stats_a.redelivered() + stats_b.redelivered(), 1);
    assert_eq!(
        stats_a.declined() + stats_a.already_claimed() + stats_b.declined() + stats_b.already_claimed(),
        1
    );
    assert_eq!(stats_a.failed() + stats_b.failed(), 0);
    assert!(
        tokio::time::timeout(Duration::from_millis(100), orders.next())
            .await
            .is_err()
    );
    assert!(
        tokio::time::timeout(Duration::from_millis(50), payments.next())
            .await
            .is_err()
    );
    assert!(w.store.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_deferral_is_not_redelivered() -> AnyResult<()> {
    let cfg = RedeliveryConfig::default();
    let w = world(&cfg);
    let mut payments = w.bus.subscribe::<PaymentOverdue>().await;
    let handle = engine(&w, "consumer", &cfg).start().await;
    let stats = handle.stats();

    w.deferral
        .defer(
            "inv-7",
            &PaymentOverdue {
                invoice: "inv-7".into(),
            },
            Duration::from_millis(50),
        )
        .await?;
    assert!(w.deferral.cancel(&"inv-7".into()).await?);

    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        while stats.processed() < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    handle.shutdown();
    handle.join().await;

    assert_eq!(stats.redelivered(), 0);
    assert_eq!(stats.declined(), 1);
    assert!(
        tokio::time::timeout(Duration::from_millis(50), payments.next())
            .await
            .is_err()
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn many_deferrals_under_many_consumers() -> AnyResult<()> {
    let cfg = RedeliveryConfig::default();
    let w = world(&cfg);
    let mut orders = w.bus.subscribe::<OrderTimeoutMessage>().await;

    let handles = vec![
        engine(&w, "c-1", &cfg).start().await,
        engine(&w, "c-2", &cfg).start().await,
        engine(&w, "c-3", &cfg).start().await,
    ];

    for order_id in 0..20u64 {
        w.deferral
            .defer(
                format!("order-{order_id}"),
                &OrderTimeoutMessage { order_id },
                Duration::from_millis(10 + order_id),
            )
            .await?;
    }

    let mut seen = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(3), async {
        while seen.len() < 20 {
            match orders.next().await {
                Some(Ok(m)) => seen.push(m.order_id),
                _ => break,
            }
        }
    })
    .await;

    // 等待剩余的重复超时事件处理完毕，确认没有重复发布
    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        while handles.iter().map(|h| h.stats().processed()).sum::<usize>() < 60 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(
        tokio::time::timeout(Duration::from_millis(100), orders.next())
            .await
            .is_err()
    );

    seen.sort_unstable();
    assert_eq!(seen, (0..20).collect::<Vec<_>>());
    let redelivered: usize = handles.iter().map(|h| h.stats().redelivered()).sum();
    assert_eq!(redelivered, 20);

    for h in handles {
        h.shutdown();
        h.join().await;
    }
    w.scheduler.shutdown();
    assert!(w.store.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn overwritten_deferral_is_delivered_by_the_earlier_timeout() -> AnyResult<()> {
    let cfg = RedeliveryConfig::from_json_str(r#"{"duplicate_policy": "overwrite"}"#)?;
    let w = world(&cfg);
    let mut orders = w.bus.subscribe::<OrderTimeoutMessage>().await;
    let handle = engine(&w, "consumer", &cfg).start().await;
    let stats = handle.stats();

    w.deferral
        .defer("dup", &OrderTimeoutMessage { order_id: 1 }, Duration::from_millis(50))
        .await?;
    w.deferral
        .defer("dup", &OrderTimeoutMessage { order_id: 2 }, Duration::from_millis(600))
        .await?;

    // 旧的 50ms 超时认领到替换后的消息，早于新的 600ms 延迟
    let got = tokio::time::timeout(Duration::from_millis(400), orders.next())
        .await?
        .expect("stream open")?;
    assert_eq!(got, OrderTimeoutMessage { order_id: 2 });
    assert!(w.store.is_empty());

    // 新的超时到达时条目已不存在
    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        while stats.processed() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    handle.shutdown();
    handle.join().await;
    w.scheduler.shutdown();

    assert_eq!(stats.redelivered(), 1);
    assert_eq!(stats.declined(), 1);
    assert!(
        tokio::time::timeout(Duration::from_millis(50), orders.next())
            .await
            .is_err()
    );
    Ok(())
}

#[tokio::test]
async fn stray_timeout_is_declined() -> AnyResult<()> {
    let cfg = RedeliveryConfig::default();
    let w = world(&cfg);
    let handle = engine(&w, "consumer", &cfg).start().await;
    let stats = handle.stats();

    w.bus.publish(TimeoutExpired::new("nobody-deferred-this")).await?;

    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        while stats.processed() < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    handle.shutdown();
    handle.join().await;

    assert_eq!(stats.declined(), 1);
    assert_eq!(stats.failed(), 0);
    Ok(())
}
