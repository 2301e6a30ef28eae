// 内存版令牌缓存，仅用于测试
// 使用 tokio 时钟，测试中可以暂停并快进时间

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::cache::operations::token::{CachedValue, ScanFilter, TokenCache};
use crate::error::TokenError;

#[derive(Default)]
pub struct MemoryTokenCache {
    entries: Mutex<BTreeMap<String, (String, Instant)>>,
    pub fail_flush: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub fail_scans: AtomicBool,
    /// 已执行的管道批次数
    pub flushes: AtomicUsize,
}

fn injected(what: &'static str) -> TokenError {
    TokenError::Cache(redis::RedisError::from((redis::ErrorKind::IoError, what)))
}

fn matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入，不经过管道
    pub fn insert(&self, key: &str, value: &str, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        }
    }

    pub fn live_len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|entry| entry.1 > now).count())
            .unwrap_or(0)
    }

    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock().ok()?;
        let (_, expires_at) = entries.get(key)?;
        expires_at.checked_duration_since(now)
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn set_batch(
        &self,
        entries: &[(String, String)],
        ttl_secs: u64,
    ) -> Result<(), TokenError> {
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(injected("pipeline flush failed"));
        }

        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        let mut stored = self
            .entries
            .lock()
            .map_err(|_| injected("cache lock poisoned"))?;
        for (key, value) in entries {
            stored.insert(key.clone(), (value.clone(), expires_at));
        }
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TokenError> {
        let now = Instant::now();
        let entries = self
            .entries
            .lock()
            .map_err(|_| injected("cache lock poisoned"))?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.1 > now)
            .map(|entry| entry.0.clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, TokenError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected("delete failed"));
        }

        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| injected("cache lock poisoned"))?;
        // 已过期的键对 DEL 来说不存在
        Ok(entries
            .remove(key)
            .is_some_and(|entry| entry.1 > now))
    }

    async fn scan_values(
        &self,
        pattern: &str,
        count: usize,
        filter: ScanFilter<'_>,
    ) -> Result<Vec<CachedValue>, TokenError> {
        if self.fail_scans.load(Ordering::SeqCst) {
            return Err(injected("scan failed"));
        }

        let now = Instant::now();
        let entries = self
            .entries
            .lock()
            .map_err(|_| injected("cache lock poisoned"))?;
        let live: Vec<(&String, &String)> = entries
            .iter()
            .filter(|entry| entry.1.1 > now && matches(pattern, entry.0))
            .map(|(key, (value, _))| (key, value))
            .collect();

        // 按页模拟游标
        let mut found = Vec::new();
        for page in live.chunks(count.max(1)) {
            for (key, value) in page {
                if filter(key.as_str()) {
                    found.push(CachedValue {
                        key: (*key).clone(),
                        value: Some((*value).clone()),
                    });
                }
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryTokenCache::new();
        cache
            .set_batch(&[("1".into(), "a.b.c".into())], 5)
            .await
            .unwrap();

        assert_eq!(cache.get("1").await.unwrap().as_deref(), Some("a.b.c"));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get("1").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_of_expired_entry_reports_absent() {
        let cache = MemoryTokenCache::new();
        cache.insert("1", "a.b.c", Duration::from_secs(5));
        cache.insert("2", "d.e.f", Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(!cache.delete("1").await.unwrap());
        assert!(cache.delete("2").await.unwrap());
    }
}
