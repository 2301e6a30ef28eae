use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::cache::{CachedValue, MATCH_ALL, TokenCache, parse_token_id};
use crate::error::TokenError;
use crate::scheduler::ScheduledJob;
use crate::utils::fingerprint;

/// 按键的数值奇偶划分缓存
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Odd,
    Even,
    /// 全量，包括非数字键
    All,
}

impl Partition {
    /// 非数字键不属于奇偶任一分区
    pub fn admits(self, key: &str) -> bool {
        match self {
            Partition::All => true,
            Partition::Odd => parse_token_id(key).is_some_and(|id| id % 2 != 0),
            Partition::Even => parse_token_id(key).is_some_and(|id| id % 2 == 0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Odd => "odd",
            Partition::Even => "even",
            Partition::All => "all",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub partition: Partition,
    pub entries: Vec<CachedValue>,
}

/// 只读遍历缓存中的一个分区并输出每个键值
pub struct CacheReconciler {
    cache: Arc<dyn TokenCache>,
    partition: Partition,
    batch_size: usize,
    job_name: String,
}

impl CacheReconciler {
    pub fn new(cache: Arc<dyn TokenCache>, partition: Partition, batch_size: usize) -> Self {
        Self {
            cache,
            partition,
            batch_size,
            job_name: format!("pull_{}_keys", partition),
        }
    }

    pub async fn pull(&self) -> Result<ReconcileReport, TokenError> {
        let started = Instant::now();
        let partition = self.partition;
        let filter = move |key: &str| partition.admits(key);

        let entries = self
            .cache
            .scan_values(MATCH_ALL, self.batch_size, &filter)
            .await?;

        for entry in &entries {
            match &entry.value {
                Some(value) => tracing::info!(
                    partition = %partition,
                    key = %entry.key,
                    value = %fingerprint(value),
                    "Cached token"
                ),
                None => tracing::debug!(
                    partition = %partition,
                    key = %entry.key,
                    "Key expired during scan"
                ),
            }
        }

        tracing::info!(
            partition = %partition,
            keys = entries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cache partition scanned"
        );

        Ok(ReconcileReport { partition, entries })
    }
}

#[async_trait]
impl ScheduledJob for CacheReconciler {
    fn name(&self) -> &str {
        &self.job_name
    }

    async fn run(&self) -> Result<(), TokenError> {
        self.pull().await.map(|_| ())
    }
}
