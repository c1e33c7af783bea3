//! 内存版消息总线（InMemoryMessageBus）
//!
//! 基于 `tokio::sync::broadcast` 实现的轻量消息总线，满足 `MessageBus` 协议：
//! - 以消息的 `TypeId` 为键，每种具体类型一个广播通道（首次发布或订阅时创建）；
//! - `publish`：仅投递给订阅了同一具体类型的订阅者；
//! - `subscribe`：返回 `'static` 生命周期消息流，每个订阅者都会收到每条消息。
//!
//! 注意：无订阅者时发送将被忽略；订阅者落后超过容量时收到一条 `MessageBus` 错误后继续。
//! 同一消息被所有订阅者各收到一次，恰好对应竞争消费者收到重复超时事件的情形。

use crate::error::{DomainError, DomainResult as Result};
use crate::eventing::MessageBus;
use crate::message::Message;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

type AnySender = Box<dyn Any + Send + Sync>;

/// 简单的内存消息总线实现
#[derive(Clone)]
pub struct InMemoryMessageBus {
    capacity: usize,
    channels: Arc<DashMap<TypeId, AnySender>>,
}

impl InMemoryMessageBus {
    /// 创建一个内存总线，`capacity` 为每种消息类型的广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Arc::new(DashMap::new()),
        }
    }

    /// 当前订阅了类型 `M` 的订阅者数量
    pub fn subscriber_count<M: Message>(&self) -> usize {
        self.channels
            .get(&TypeId::of::<M>())
            .and_then(|s| {
                s.value()
                    .downcast_ref::<broadcast::Sender<M>>()
                    .map(|tx| tx.receiver_count())
            })
            .unwrap_or(0)
    }

    fn sender<M: Message>(&self) -> Result<broadcast::Sender<M>> {
        let entry = self
            .channels
            .entry(TypeId::of::<M>())
            .or_insert_with(|| {
                let (tx, _rx) = broadcast::channel::<M>(self.capacity);
                Box::new(tx) as AnySender
            });

        // 键与通道同为类型 M，正常情况下 downcast 不会失败
        entry
            .value()
            .downcast_ref::<broadcast::Sender<M>>()
            .cloned()
            .ok_or_else(|| DomainError::TypeMismatch {
                expected: M::NAME.to_string(),
                found: "unknown".to_string(),
            })
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish<M: Message>(&self, message: M) -> Result<()> {
        let tx = self.sender::<M>()?;
        // 若当前无订阅者，broadcast 的 send 会返回错误，这里视为非致命并忽略
        let _ = tx.send(message);
        Ok(())
    }

    async fn subscribe<M: Message>(&self) -> BoxStream<'static, Result<M>> {
        match self.sender::<M>() {
            Ok(tx) => {
                let stream = BroadcastStream::new(tx.subscribe())
                    .map(|r| r.map_err(|e| DomainError::message_bus(e.to_string())));
                Box::pin(stream)
            }
            Err(e) => Box::pin(futures_util::stream::once(async move { Err(e) })),
        }
    }
}
