use proc_macro::TokenStream;

mod derive_utils;
mod message;

/// 消息宏
/// - 合并/追加派生：Clone, Debug, Serialize, Deserialize
/// - 自动为目标类型实现 `::defer_domain::message::Message`
/// - 支持参数：`#[message(name = "orders.timeout")]`，默认使用类型名
/// - 支持结构体与枚举
///
/// 使用方需直接依赖 `serde`（派生代码经由 `serde::Serialize` 路径解析）。
#[proc_macro_attribute]
pub fn message(attr: TokenStream, item: TokenStream) -> TokenStream {
    message::expand(attr, item)
}
