//! 消息总线（MessageBus）协议
//!
//! 发布与订阅均以消息的具体类型 `M` 实例化，保证重新投递的消息与生产者
//! 直接发布时走相同的订阅匹配。该 trait 带有泛型方法，通常以具体实现类型注入使用。
//!
use crate::{error::DomainResult as Result, message::Message};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use std::sync::Arc;

#[async_trait]
pub trait MessageBus: Send + Sync {
    /// 以具体类型 `M` 发布消息
    async fn publish<M: Message>(&self, message: M) -> Result<()>;

    /// 订阅类型为 `M` 的消息；返回 'static 生命周期的消息流，便于在 tokio::spawn 中使用
    async fn subscribe<M: Message>(&self) -> BoxStream<'static, Result<M>>;
}

#[async_trait]
impl<T> MessageBus for Arc<T>
where
    T: MessageBus + ?Sized,
{
    async fn publish<M: Message>(&self, message: M) -> Result<()> {
        (**self).publish(message).await
    }

    async fn subscribe<M: Message>(&self) -> BoxStream<'static, Result<M>> {
        (**self).subscribe::<M>().await
    }
}
