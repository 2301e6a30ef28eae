use std::sync::Arc;

use config::Config;
use token::TokenService;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod scheduler;
pub mod token;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tokens: Arc<TokenService>,
}
