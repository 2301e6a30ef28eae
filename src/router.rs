use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::middleware::log_errors;
use crate::routes;

// 令牌相关的路由
pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/tokens/generate", post(routes::token::generate))
        .route("/tokens", get(routes::token::list_tokens))
        .route("/tokens/{id}", delete(routes::token::logout))
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let base = state.config.api_base_uri.trim_end_matches('/').to_owned();
    let router = if base.is_empty() {
        token_routes()
    } else {
        Router::new().nest(&base, token_routes())
    };

    let router = router
        .layer(axum::middleware::from_fn(log_errors))
        .layer(TraceLayer::new_for_http());

    // 开发模式允许所有来源
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}
