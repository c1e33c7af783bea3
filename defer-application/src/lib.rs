pub mod config;
pub mod consumer;
pub mod deferral;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod scheduler;

pub use config::RedeliveryConfig;
pub use consumer::{RedeliveryConsumer, RedeliveryOutcome};
pub use deferral::DeferralService;
pub use dispatcher::MessageDispatcher;
pub use engine::{EngineHandle, RedeliveryEngine, RedeliveryStats};
pub use scheduler::{TimeoutScheduler, TokioTimeoutScheduler};
