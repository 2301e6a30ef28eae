/// 数据库实体定义
pub mod token;

pub use token::{TokenEntity, TokenStatus};
