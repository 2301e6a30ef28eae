// 数据库模块
// 包含令牌实体定义和存储库操作

pub mod models;
pub mod operations;

pub use models::token::{TokenEntity, TokenStatus};
pub use operations::token::{PgTokenStore, TokenStore};
