use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;

use super::issuer::{Credentials, TokenIssuer};

type TaskQueue = Arc<AsyncMutex<mpsc::UnboundedReceiver<Arc<Credentials>>>>;

#[derive(Debug, Default)]
struct DispatchStats {
    enqueued: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// 批量签发的计数快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchSnapshot {
    pub enqueued: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl DispatchSnapshot {
    pub fn pending(&self) -> u64 {
        self.enqueued
            .saturating_sub(self.succeeded)
            .saturating_sub(self.failed)
    }
}

/// 固定大小的签发工作池
///
/// 请求线程只负责入队，签发由工作任务异步完成，结果通过计数反映。
pub struct BulkDispatcher {
    sender: Mutex<Option<mpsc::UnboundedSender<Arc<Credentials>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<DispatchStats>,
}

impl BulkDispatcher {
    pub fn start(issuer: TokenIssuer, worker_count: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue: TaskQueue = Arc::new(AsyncMutex::new(receiver));
        let stats = Arc::new(DispatchStats::default());

        let worker_count = worker_count.max(1);
        let workers = (0..worker_count)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    issuer.clone(),
                    queue.clone(),
                    stats.clone(),
                ))
            })
            .collect();

        tracing::info!(workers = worker_count, "Issuer pool started");

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            stats,
        }
    }

    /// 入队 count 个相同的签发任务，立即返回实际入队数
    pub fn generate(&self, count: usize, credentials: Credentials) -> usize {
        if count == 0 {
            return 0;
        }

        let guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::error!("Issuer queue lock poisoned");
                return 0;
            }
        };
        let Some(sender) = guard.as_ref() else {
            tracing::warn!("Issuer pool is shut down, dropping request");
            return 0;
        };

        let username = credentials.username.clone();
        let task = Arc::new(credentials);
        let mut enqueued = 0;
        for _ in 0..count {
            if sender.send(task.clone()).is_err() {
                break;
            }
            enqueued += 1;
        }
        self.stats
            .enqueued
            .fetch_add(enqueued as u64, Ordering::Relaxed);

        tracing::info!(username = %username, count = enqueued, "Bulk issuance enqueued");
        enqueued
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            enqueued: self.stats.enqueued.load(Ordering::Relaxed),
            succeeded: self.stats.succeeded.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }

    /// 关闭队列，等待已入队任务处理完毕
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().ok().and_then(|mut guard| guard.take());
        drop(sender);

        let workers = self
            .workers
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default();

        for result in join_all(workers).await {
            if let Err(e) = result {
                tracing::error!("Issuer worker terminated abnormally: {}", e);
            }
        }

        let snapshot = self.snapshot();
        tracing::info!(
            enqueued = snapshot.enqueued,
            succeeded = snapshot.succeeded,
            failed = snapshot.failed,
            "Issuer pool drained"
        );
    }
}

async fn run_worker(worker: usize, issuer: TokenIssuer, queue: TaskQueue, stats: Arc<DispatchStats>) {
    loop {
        // 只在取任务时持有锁
        let next = queue.lock().await.recv().await;
        let Some(credentials) = next else {
            break;
        };

        if issuer.create(&credentials).await {
            stats.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            stats.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    tracing::debug!(worker, "Issuer worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::operations::memory::MemoryTokenCache;
    use crate::config::test_config;
    use crate::database::operations::memory::MemoryTokenStore;
    use crate::database::{TokenStatus, TokenStore};
    use crate::utils::verify;

    fn dispatcher() -> (BulkDispatcher, Arc<MemoryTokenStore>) {
        let config = test_config();
        let store = Arc::new(MemoryTokenStore::new());
        let cache = Arc::new(MemoryTokenCache::new());
        let issuer = TokenIssuer::new(store.clone(), cache, &config);
        (BulkDispatcher::start(issuer, config.issuer_workers), store)
    }

    #[tokio::test]
    async fn generates_requested_number_of_inactive_tokens() {
        let (dispatcher, store) = dispatcher();

        assert_eq!(dispatcher.generate(5, Credentials::new("alice", "p")), 5);
        dispatcher.shutdown().await;

        let tokens = store.find_all().await.unwrap();
        assert_eq!(tokens.len(), 5);
        for token in &tokens {
            assert_eq!(token.status, TokenStatus::Inactive);
            let claims = verify(&token.payload, &test_config().jwt_secret).unwrap();
            assert_eq!(claims.sub, "alice");
        }
        assert_eq!(
            dispatcher.snapshot(),
            DispatchSnapshot { enqueued: 5, succeeded: 5, failed: 0 }
        );
    }

    #[tokio::test]
    async fn zero_count_enqueues_nothing() {
        let (dispatcher, store) = dispatcher();

        assert_eq!(dispatcher.generate(0, Credentials::new("alice", "p")), 0);
        dispatcher.shutdown().await;

        assert_eq!(store.len().await, 0);
        assert_eq!(dispatcher.snapshot().enqueued, 0);
    }

    #[tokio::test]
    async fn failures_are_counted_not_propagated() {
        let (dispatcher, store) = dispatcher();
        store
            .fail_saves
            .store(true, std::sync::atomic::Ordering::SeqCst);

        assert_eq!(dispatcher.generate(3, Credentials::new("bob", "p")), 3);
        dispatcher.shutdown().await;

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.failed, 3);
        assert_eq!(snapshot.pending(), 0);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn generate_after_shutdown_is_rejected() {
        let (dispatcher, store) = dispatcher();
        dispatcher.shutdown().await;

        assert_eq!(dispatcher.generate(2, Credentials::new("alice", "p")), 0);
        assert_eq!(store.len().await, 0);
    }
}
