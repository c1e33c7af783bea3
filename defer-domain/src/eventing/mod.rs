//! 消息总线子系统（eventing）
//!
//! 提供按具体类型发布/订阅消息的基础抽象与内存实现：
//! - `MessageBus`：统一发布/订阅接口，订阅匹配以消息的具体类型为准；
//! - `InMemoryMessageBus`：进程内实现，每种消息类型一个广播通道。
//!
//! 该模块仅定义协议，不绑定具体传输实现，可对接任意消息系统。
//!
pub mod bus;
pub mod bus_inmemory;

pub use bus::MessageBus;
pub use bus_inmemory::InMemoryMessageBus;
