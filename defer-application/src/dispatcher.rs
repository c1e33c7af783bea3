use crate::error::AppError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use defer_domain::eventing::MessageBus;
use defer_domain::message::{Message, SerializedMessage};
use std::any::TypeId;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>>;

type DispatchFn<B> =
    Arc<dyn for<'a> Fn(&'a B, SerializedMessage) -> DispatchFuture<'a> + Send + Sync>;

/// 按类型描述还原具体类型并发布的调度器
/// - 以 `Message::NAME` 注册每种消息类型对应的发布闭包（闭包内单态化 `publish::<M>`）
/// - 运行时以类型擦除的 `SerializedMessage` 调度，发布时使用原始具体类型，
///   订阅匹配与生产者直接发布时一致
/// - 可延迟的消息类型集合由应用代码决定，无需在此枚举
pub struct MessageDispatcher<B> {
    dispatchers: DashMap<&'static str, (TypeId, DispatchFn<B>)>,
}

impl<B> Default for MessageDispatcher<B> {
    fn default() -> Self {
        Self {
            dispatchers: DashMap::new(),
        }
    }
}

impl<B> MessageDispatcher<B>
where
    B: MessageBus + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册消息类型
    ///
    /// 同一类型重复注册是幂等的；另一类型声明了相同的 `NAME` 时返回 `AlreadyRegistered`。
    pub fn register<M: Message>(&self) -> Result<(), AppError> {
        match self.dispatchers.entry(M::NAME) {
            Entry::Occupied(o) if o.get().0 == TypeId::of::<M>() => Ok(()),
            Entry::Occupied(_) => Err(AppError::AlreadyRegistered {
                message_type: M::NAME,
            }),
            Entry::Vacant(v) => {
                let f: DispatchFn<B> = Arc::new(|bus, message| {
                    Box::pin(async move {
                        let message = message.into_message::<M>()?;
                        bus.publish(message).await?;
                        Ok(())
                    })
                });
                v.insert((TypeId::of::<M>(), f));
                Ok(())
            }
        }
    }

    pub fn is_registered(&self, message_type: &str) -> bool {
        self.dispatchers.contains_key(message_type)
    }

    /// 以消息的原始具体类型发布到总线
    pub async fn dispatch(&self, bus: &B, message: SerializedMessage) -> Result<(), AppError> {
        let Some(f) = self
            .dispatchers
            .get(message.message_type())
            .map(|d| d.value().1.clone())
        else {
            return Err(AppError::DispatcherNotFound {
                message_type: message.message_type().to_string(),
            });
        };

        (f)(bus, message).await
    }

    /// 获取已注册的消息类型名列表（只读视图）
    pub fn registered_types(&self) -> Vec<&'static str> {
        self.dispatchers.iter().map(|e| *e.key()).collect()
    }
}
