/// 数据库操作实现
pub mod token;

#[cfg(test)]
pub mod memory;

pub use token::{PgTokenStore, TokenStore};
