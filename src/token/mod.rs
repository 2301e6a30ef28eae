// 令牌生命周期
// 签发 -> INACTIVE -> 推送缓存 -> ACTIVE -> 注销

pub mod dispatcher;
pub mod issuer;
pub mod reconciler;
pub mod writer;

use std::sync::Arc;

use serde::Serialize;

use crate::cache::{TokenCache, token_key};
use crate::config::Config;
use crate::database::{TokenEntity, TokenStore};
use crate::error::TokenError;

pub use dispatcher::{BulkDispatcher, DispatchSnapshot};
pub use issuer::{Credentials, TokenIssuer};
pub use reconciler::{CacheReconciler, Partition, ReconcileReport};
pub use writer::{CacheWriter, PushReport};

/// 单个存储上的删除结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Removed,
    Absent,
    Failed,
}

impl From<&Result<bool, TokenError>> for DeleteOutcome {
    fn from(result: &Result<bool, TokenError>) -> Self {
        match result {
            Ok(true) => DeleteOutcome::Removed,
            Ok(false) => DeleteOutcome::Absent,
            Err(_) => DeleteOutcome::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogoutOutcome {
    pub store: DeleteOutcome,
    pub cache: DeleteOutcome,
}

/// 请求层使用的令牌服务
pub struct TokenService {
    store: Arc<dyn TokenStore>,
    cache: Arc<dyn TokenCache>,
    dispatcher: BulkDispatcher,
}

impl TokenService {
    pub fn new(store: Arc<dyn TokenStore>, cache: Arc<dyn TokenCache>, config: &Config) -> Self {
        let issuer = TokenIssuer::new(store.clone(), cache.clone(), config);
        Self {
            dispatcher: BulkDispatcher::start(issuer, config.issuer_workers),
            store,
            cache,
        }
    }

    /// 异步批量签发，返回入队数量
    pub fn generate(&self, count: usize, credentials: Credentials) -> usize {
        self.dispatcher.generate(count, credentials)
    }

    pub async fn list_all(&self) -> Result<Vec<TokenEntity>, TokenError> {
        self.store.find_all().await
    }

    /// 先删除数据库记录，再删除缓存；两步互不影响，失败只记录日志
    pub async fn logout(&self, id: i64) -> LogoutOutcome {
        let stored = self.store.delete_by_id(id).await;
        if let Err(e) = &stored {
            tracing::error!(id, "Failed to delete token record: {}", e);
        }

        let cached = self.cache.delete(&token_key(id)).await;
        if let Err(e) = &cached {
            tracing::error!(id, "Failed to evict token from cache: {}", e);
        }

        let outcome = LogoutOutcome {
            store: DeleteOutcome::from(&stored),
            cache: DeleteOutcome::from(&cached),
        };
        tracing::info!(id, store = ?outcome.store, cache = ?outcome.cache, "Token logged out");
        outcome
    }

    pub fn dispatch_stats(&self) -> DispatchSnapshot {
        self.dispatcher.snapshot()
    }

    /// 停止接收新任务并等待工作池清空
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}
