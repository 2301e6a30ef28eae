use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use std::sync::Arc;

use crate::error::TokenError;

/// 扫描时的键过滤条件
pub type ScanFilter<'a> = &'a (dyn Fn(&str) -> bool + Send + Sync);

/// 扫描得到的键值；值可能在 SCAN 与 MGET 之间过期
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedValue {
    pub key: String,
    pub value: Option<String>,
}

/// 令牌缓存接口
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// 在一个连接上以管道批量 UPSERT，带 TTL
    async fn set_batch(&self, entries: &[(String, String)], ttl_secs: u64)
    -> Result<(), TokenError>;

    async fn get(&self, key: &str) -> Result<Option<String>, TokenError>;

    /// 返回键是否存在
    async fn delete(&self, key: &str) -> Result<bool, TokenError>;

    /// 基于游标遍历所有匹配的键，读取通过过滤的键的值
    async fn scan_values(
        &self,
        pattern: &str,
        count: usize,
        filter: ScanFilter<'_>,
    ) -> Result<Vec<CachedValue>, TokenError>;
}

/// Redis 令牌缓存操作
pub struct RedisTokenCache {
    redis: Arc<RedisClient>,
}

impl RedisTokenCache {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn set_batch(
        &self,
        entries: &[(String, String)],
        ttl_secs: u64,
    ) -> Result<(), TokenError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let mut pipe = redis::pipe();
        for (key, value) in entries {
            // 不带 NX/XX 的 SET 即 UPSERT
            pipe.cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs)
                .ignore();
        }

        let _: () = pipe.query_async(&mut conn).await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TokenError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let result: Option<String> = conn.get(key).await?;

        Ok(result)
    }

    async fn delete(&self, key: &str) -> Result<bool, TokenError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let removed: i64 = conn.del(key).await?;

        Ok(removed > 0)
    }

    async fn scan_values(
        &self,
        pattern: &str,
        count: usize,
        filter: ScanFilter<'_>,
    ) -> Result<Vec<CachedValue>, TokenError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let mut found = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            // 键按字节读取，非 UTF-8 的键不会被当作令牌ID
            let (next, keys): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(count.max(1))
                .query_async(&mut conn)
                .await?;

            let selected: Vec<(String, Vec<u8>)> = keys
                .into_iter()
                .map(|raw| (String::from_utf8_lossy(&raw).into_owned(), raw))
                .filter(|(key, _)| filter(key.as_str()))
                .collect();

            if !selected.is_empty() {
                let raw_keys: Vec<&[u8]> = selected.iter().map(|(_, raw)| raw.as_slice()).collect();
                let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
                    .arg(&raw_keys)
                    .query_async(&mut conn)
                    .await?;

                found.extend(selected.into_iter().zip(values).map(|((key, _), value)| {
                    CachedValue {
                        key,
                        value: value.map(|v| String::from_utf8_lossy(&v).into_owned()),
                    }
                }));
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(found)
    }
}
