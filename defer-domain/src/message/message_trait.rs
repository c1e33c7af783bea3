use serde::{Serialize, de::DeserializeOwned};

/// 总线消息
///
/// - 总线按消息的具体类型进行订阅匹配，因此每个可延迟的消息都是独立的具体类型；
/// - `NAME` 为稳定的类型描述，随延迟条目一起持久化，重新投递时据此还原具体类型。
///   避免依赖 `type_name::<T>()`，其输出不保证跨编译稳定；
/// - 通常使用 `#[message]` 宏实现本 trait。
pub trait Message: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// 消息的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;
}
