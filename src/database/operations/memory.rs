// 内存版令牌存储，仅用于测试

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::models::token::{TokenEntity, TokenStatus};
use crate::database::operations::token::TokenStore;
use crate::error::TokenError;

#[derive(Default)]
struct Inner {
    next_id: i64,
    tokens: BTreeMap<i64, TokenEntity>,
}

#[derive(Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Inner>,
    pub fail_saves: AtomicBool,
    pub fail_save_all: AtomicBool,
    pub fail_find: AtomicBool,
    pub fail_deletes: AtomicBool,
}

fn injected(what: &str) -> TokenError {
    TokenError::Persistence(sqlx::Error::Protocol(format!("injected {} failure", what)))
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tokens.len()
    }

    pub async fn get(&self, id: i64) -> Option<TokenEntity> {
        self.inner.read().await.tokens.get(&id).cloned()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn save(&self, payload: &str) -> Result<TokenEntity, TokenError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(injected("save"));
        }

        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let token = TokenEntity {
            id: inner.next_id,
            payload: payload.to_string(),
            status: TokenStatus::Inactive,
        };
        inner.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn save_all(&self, tokens: &[TokenEntity]) -> Result<u64, TokenError> {
        if self.fail_save_all.load(Ordering::SeqCst) {
            return Err(injected("save_all"));
        }

        let mut inner = self.inner.write().await;
        let mut updated = 0;
        for token in tokens {
            if let Some(stored) = inner.tokens.get_mut(&token.id) {
                stored.status = stored.status.max(token.status);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn find_all(&self) -> Result<Vec<TokenEntity>, TokenError> {
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(injected("find_all"));
        }

        Ok(self.inner.read().await.tokens.values().cloned().collect())
    }

    async fn find_by_status(&self, status: TokenStatus) -> Result<Vec<TokenEntity>, TokenError> {
        Ok(self
            .inner
            .read()
            .await
            .tokens
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, TokenError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }

        Ok(self.inner.write().await.tokens.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_all_never_resurrects_or_demotes() {
        let store = MemoryTokenStore::new();
        let first = store.save("a.b.c").await.unwrap();
        let second = store.save("d.e.f").await.unwrap();
        store.delete_by_id(second.id).await.unwrap();

        let mut promoted = vec![first.clone(), second.clone()];
        promoted.iter_mut().for_each(TokenEntity::activate);
        assert_eq!(store.save_all(&promoted).await.unwrap(), 1);

        // 旧快照写回不能降级
        assert_eq!(store.save_all(&[first.clone()]).await.unwrap(), 1);

        let all = store.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, TokenStatus::Active);
    }
}
