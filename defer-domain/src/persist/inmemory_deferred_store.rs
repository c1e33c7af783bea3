//! 内存版延迟消息存储（InMemoryDeferredStore）
//!
//! 基于 `DashMap` 的分片并发映射：
//! - `put` 借助 entry API 在同一分片锁内完成“检查重复 + 插入”；
//! - `claim` 即 `DashMap::remove`，查找与移除在同一分片锁内完成，
//!   并发认领同一关联 ID 时只有一个调用方能拿到条目；
//! - `contains` 只持有分片读锁，不会长时间阻塞写入。
//!
//! 典型用途：单进程部署、测试与示例。
use super::{DeferredEntry, DeferredMessageStore, DuplicatePolicy};
use crate::error::{DomainError, DomainResult as Result};
use crate::message::CorrelationId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Default)]
pub struct InMemoryDeferredStore {
    entries: DashMap<CorrelationId, DeferredEntry>,
    policy: DuplicatePolicy,
}

impl InMemoryDeferredStore {
    /// 默认策略（`DuplicatePolicy::Reject`）
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// 当前待投递条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DeferredMessageStore for InMemoryDeferredStore {
    async fn put(&self, entry: DeferredEntry) -> Result<()> {
        match self.policy {
            DuplicatePolicy::Reject => match self.entries.entry(entry.correlation_id().clone()) {
                Entry::Occupied(o) => Err(DomainError::DuplicateKey {
                    correlation_id: o.key().to_string(),
                }),
                Entry::Vacant(v) => {
                    v.insert(entry);
                    Ok(())
                }
            },
            DuplicatePolicy::Overwrite => {
                self.entries.insert(entry.correlation_id().clone(), entry);
                Ok(())
            }
        }
    }

    async fn contains(&self, correlation_id: &CorrelationId) -> Result<bool> {
        Ok(self.entries.contains_key(correlation_id))
    }

    async fn claim(&self, correlation_id: &CorrelationId) -> Result<Option<DeferredEntry>> {
        Ok(self.entries.remove(correlation_id).map(|(_, entry)| entry))
    }

    async fn overdue(&self, cutoff: DateTime<Utc>) -> Result<Vec<CorrelationId>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.value().is_overdue(cutoff))
            .map(|e| e.key().clone())
            .collect())
    }
}
