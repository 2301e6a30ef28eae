use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::cache::{TokenCache, token_key};
use crate::config::Config;
use crate::database::{TokenEntity, TokenStore};
use crate::error::TokenError;
use crate::utils::{fingerprint, sign};

/// 签发请求中的用户名和密码，不会被持久化
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 令牌签发：签名后以 INACTIVE 状态保存
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn TokenStore>,
    cache: Arc<dyn TokenCache>,
    secret: String,
    ttl_secs: u64,
    warm_cache: bool,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn TokenStore>, cache: Arc<dyn TokenCache>, config: &Config) -> Self {
        Self {
            store,
            cache,
            secret: config.jwt_secret.clone(),
            ttl_secs: config.jwt_expiration_secs,
            warm_cache: config.warm_cache_on_issue,
        }
    }

    pub async fn issue(&self, credentials: &Credentials) -> Result<TokenEntity, TokenError> {
        let payload = sign(&credentials.username, Utc::now(), self.ttl_secs, &self.secret)?;
        let token = self.store.save(&payload).await?;

        if self.warm_cache {
            // 提前写入缓存，状态仍由推送任务提升
            let entry = [(token_key(token.id), payload)];
            if let Err(e) = self.cache.set_batch(&entry, self.ttl_secs).await {
                tracing::warn!(id = token.id, "Failed to warm cache for new token: {}", e);
            }
        }

        Ok(token)
    }

    /// 工作线程入口；错误只记录日志，不返回给请求方
    pub async fn create(&self, credentials: &Credentials) -> bool {
        let started = Instant::now();

        match self.issue(credentials).await {
            Ok(token) => {
                tracing::debug!(
                    id = token.id,
                    token = %fingerprint(&token.payload),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Token issued and stored"
                );
                true
            }
            Err(e) => {
                tracing::error!(username = %credentials.username, "Failed to issue token: {}", e);
                false
            }
        }
    }
}
