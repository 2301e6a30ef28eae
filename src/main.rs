use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tokensync::{
    AppState,
    cache::RedisTokenCache,
    config::Config,
    database::PgTokenStore,
    router::create_router,
    scheduler::Scheduler,
    token::{CacheReconciler, CacheWriter, Partition, TokenService},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .idle_timeout(config.db_idle_timeout())
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'tokensync';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    let store = Arc::new(PgTokenStore::new(pool));
    store
        .ensure_schema()
        .await
        .expect("Failed to prepare jwt_tokens table");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let cache = Arc::new(RedisTokenCache::new(Arc::new(redis_client)));

    let tokens = Arc::new(TokenService::new(store.clone(), cache.clone(), &config));

    // 启动定时任务
    let scheduler = Scheduler::new()
        .every(
            config.push_interval(),
            Arc::new(CacheWriter::new(
                store.clone(),
                cache.clone(),
                config.jwt_expiration_secs,
            )),
        )
        .every(
            config.odd_pull_interval(),
            Arc::new(CacheReconciler::new(
                cache.clone(),
                Partition::Odd,
                config.scan_batch_size,
            )),
        )
        .every(
            config.even_pull_interval(),
            Arc::new(CacheReconciler::new(
                cache.clone(),
                Partition::Even,
                config.scan_batch_size,
            )),
        )
        // 周期为 0 时不启用
        .every(
            config.full_pull_interval(),
            Arc::new(CacheReconciler::new(
                cache.clone(),
                Partition::All,
                config.scan_batch_size,
            )),
        )
        .start();

    let state = AppState {
        config: config.clone(),
        tokens: tokens.clone(),
    };
    let app = create_router(state);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    // 先停止定时任务，再等待签发队列清空
    scheduler.shutdown().await;
    tokens.shutdown().await;
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
