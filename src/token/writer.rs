use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;

use crate::cache::{TokenCache, token_key};
use crate::database::{TokenStatus, TokenStore};
use crate::error::TokenError;
use crate::scheduler::ScheduledJob;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    /// 写入缓存的条目数
    pub written: usize,
    /// 实际提升为 ACTIVE 的记录数
    pub promoted: u64,
}

/// 把 INACTIVE 令牌批量推送到缓存，成功后提升为 ACTIVE
pub struct CacheWriter {
    store: Arc<dyn TokenStore>,
    cache: Arc<dyn TokenCache>,
    ttl_secs: u64,
}

impl CacheWriter {
    pub fn new(store: Arc<dyn TokenStore>, cache: Arc<dyn TokenCache>, ttl_secs: u64) -> Self {
        Self {
            store,
            cache,
            ttl_secs,
        }
    }

    pub async fn push(&self) -> Result<PushReport, TokenError> {
        let started = Instant::now();

        let mut pending = self.store.find_by_status(TokenStatus::Inactive).await?;
        if pending.is_empty() {
            tracing::debug!("No inactive tokens to push");
            return Ok(PushReport::default());
        }

        let entries: Vec<(String, String)> = pending
            .iter()
            .map(|token| (token_key(token.id), token.payload.clone()))
            .collect();

        // 管道失败时不提升，下一周期重试
        self.cache.set_batch(&entries, self.ttl_secs).await?;

        pending.iter_mut().for_each(|token| token.activate());
        let promoted = self.store.save_all(&pending).await?;

        let report = PushReport {
            written: entries.len(),
            promoted,
        };
        tracing::info!(
            written = report.written,
            promoted = report.promoted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pushed inactive tokens to cache"
        );
        Ok(report)
    }
}

#[async_trait]
impl ScheduledJob for CacheWriter {
    fn name(&self) -> &str {
        "push_to_cache"
    }

    async fn run(&self) -> Result<(), TokenError> {
        self.push().await.map(|_| ())
    }
}
