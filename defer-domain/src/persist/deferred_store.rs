//! 延迟消息存储协议
//!
//! 正确性完全依赖 `claim` 的原子性：`contains` 只是廉价的筛选提示，
//! 任何“先查再取再删”的分步实现都会在竞争消费者之间引入重复投递。
//!
use super::DeferredEntry;
use crate::{error::DomainResult as Result, message::CorrelationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[async_trait]
pub trait DeferredMessageStore: Send + Sync {
    /// 登记一条延迟消息；重复关联 ID 的处理由实现的 `DuplicatePolicy` 决定
    async fn put(&self, entry: DeferredEntry) -> Result<()>;

    /// 无副作用的存在性检查，仅用于筛选
    async fn contains(&self, correlation_id: &CorrelationId) -> Result<bool>;

    /// 原子地查找并移除条目；不存在时返回 `None`（正常结果）
    async fn claim(&self, correlation_id: &CorrelationId) -> Result<Option<DeferredEntry>>;

    /// 到期时间不晚于 `cutoff` 的条目 ID；只读，不认领
    async fn overdue(&self, cutoff: DateTime<Utc>) -> Result<Vec<CorrelationId>>;
}

#[async_trait]
impl<T> DeferredMessageStore for Arc<T>
where
    T: DeferredMessageStore + ?Sized,
{
    async fn put(&self, entry: DeferredEntry) -> Result<()> {
        (**self).put(entry).await
    }

    async fn contains(&self, correlation_id: &CorrelationId) -> Result<bool> {
        (**self).contains(correlation_id).await
    }

    async fn claim(&self, correlation_id: &CorrelationId) -> Result<Option<DeferredEntry>> {
        (**self).claim(correlation_id).await
    }

    async fn overdue(&self, cutoff: DateTime<Utc>) -> Result<Vec<CorrelationId>> {
        (**self).overdue(cutoff).await
    }
}

/// 重复关联 ID 的登记策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// 已存在时拒绝，返回 `DomainError::DuplicateKey`
    #[default]
    Reject,
    /// 已存在时以新条目覆盖旧条目；旧条目的超时仍然有效，到达时会提前认领新条目，
    /// 新条目自己的超时随后按“未找到”拒绝
    Overwrite,
}
