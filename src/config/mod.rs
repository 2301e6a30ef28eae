use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    /// base64 编码的 HMAC 密钥
    pub jwt_secret: String,
    /// 令牌有效期，同时作为缓存 TTL（秒）
    pub jwt_expiration_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    // 签发线程池
    pub issuer_workers: usize,
    pub max_generate_count: usize,
    // 数据库连接池
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_idle_timeout_secs: u64,
    // 定时任务周期
    pub push_interval_secs: u64,
    pub odd_pull_interval_secs: u64,
    pub even_pull_interval_secs: u64,
    /// 全量拉取周期，0 表示不启用
    pub full_pull_interval_secs: u64,
    pub scan_batch_size: usize,
    /// 签发后立即写入缓存（状态仍为 INACTIVE）
    pub warm_cache_on_issue: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置，便于测试注入
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| lookup(var).ok_or(ConfigError::Missing(var));

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_secs: parse_positive(&lookup, "JWT_EXPIRATION", 3600)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3000)?,
            api_base_uri: lookup("API_BASE_URI").unwrap_or_else(|| "/api".into()),
            issuer_workers: parse_or(&lookup, "ISSUER_WORKERS", 20)?,
            max_generate_count: parse_or(&lookup, "MAX_GENERATE_COUNT", 10_000)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            db_min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", 1)?,
            db_idle_timeout_secs: parse_or(&lookup, "DB_IDLE_TIMEOUT_SECS", 600)?,
            push_interval_secs: parse_or(&lookup, "PUSH_INTERVAL_SECS", 60)?,
            odd_pull_interval_secs: parse_or(&lookup, "ODD_PULL_INTERVAL_SECS", 180)?,
            even_pull_interval_secs: parse_or(&lookup, "EVEN_PULL_INTERVAL_SECS", 300)?,
            full_pull_interval_secs: parse_or(&lookup, "FULL_PULL_INTERVAL_SECS", 0)?,
            scan_batch_size: parse_or(&lookup, "SCAN_BATCH_SIZE", 100)?,
            warm_cache_on_issue: parse_or(&lookup, "WARM_CACHE_ON_ISSUE", false)?,
        })
    }

    pub fn db_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.db_idle_timeout_secs)
    }

    pub fn push_interval(&self) -> Duration {
        Duration::from_secs(self.push_interval_secs)
    }

    pub fn odd_pull_interval(&self) -> Duration {
        Duration::from_secs(self.odd_pull_interval_secs)
    }

    pub fn even_pull_interval(&self) -> Duration {
        Duration::from_secs(self.even_pull_interval_secs)
    }

    pub fn full_pull_interval(&self) -> Duration {
        Duration::from_secs(self.full_pull_interval_secs)
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        None => Ok(default),
    }
}

/// 令牌有效期同时是缓存 TTL，Redis 不接受 EX 0
fn parse_positive<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, var, default)? {
        0 => Err(ConfigError::Invalid {
            var,
            value: "0".into(),
        }),
        value => Ok(value),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/tokens".into(),
        redis_url: "redis://127.0.0.1:6379".into(),
        // 解码后不少于 32 字节
        jwt_secret: "c2VjcmV0LWtleS1mb3ItdGVzdGluZy1wdXJwb3Nlcy0xMjM0NTY=".into(),
        jwt_expiration_secs: 3600,
        server_host: "127.0.0.1".into(),
        server_port: 3000,
        api_base_uri: "/api".into(),
        issuer_workers: 4,
        max_generate_count: 100,
        db_max_connections: 5,
        db_min_connections: 1,
        db_idle_timeout_secs: 60,
        push_interval_secs: 60,
        odd_pull_interval_secs: 180,
        even_pull_interval_secs: 300,
        full_pull_interval_secs: 0,
        scan_batch_size: 2,
        warm_cache_on_issue: false,
    }
}
