//! 重新投递配置（RedeliveryConfig）
//!
//! 支持从 JSON 字符串或文件加载，缺省字段取默认值。
//!
use crate::error::AppError;
use defer_domain::persist::DuplicatePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedeliveryConfig {
    /// 单个引擎实例内并发处理超时事件的上限
    pub consumer_concurrency: usize,
    /// 内存总线每种消息类型的广播缓冲区容量
    pub bus_capacity: usize,
    /// 内存存储对重复关联 ID 的处理策略
    pub duplicate_policy: DuplicatePolicy,
    /// 回收扫描周期（毫秒），0 表示不扫描
    pub reclaim_interval_ms: u64,
    /// 条目超过到期时间多久才由扫描回收（毫秒）
    pub reclaim_grace_ms: u64,
}

impl Default for RedeliveryConfig {
    fn default() -> Self {
        Self {
            consumer_concurrency: 8,
            bus_capacity: 1024,
            duplicate_policy: DuplicatePolicy::Reject,
            reclaim_interval_ms: 1000,
            reclaim_grace_ms: 1000,
        }
    }
}

impl RedeliveryConfig {
    pub fn from_json_str(s: &str) -> Result<Self, AppError> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| AppError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// 回收扫描周期；未启用时为 `None`
    pub fn reclaim_interval(&self) -> Option<Duration> {
        (self.reclaim_interval_ms > 0).then(|| Duration::from_millis(self.reclaim_interval_ms))
    }

    pub fn reclaim_grace(&self) -> Duration {
        Duration::from_millis(self.reclaim_grace_ms)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.consumer_concurrency == 0 {
            return Err(AppError::Config(
                "consumer_concurrency must be at least 1".into(),
            ));
        }
        if self.bus_capacity == 0 {
            return Err(AppError::Config("bus_capacity must be at least 1".into()));
        }
        Ok(())
    }
}
