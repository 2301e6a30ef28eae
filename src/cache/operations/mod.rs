/// 缓存操作
pub mod token;

#[cfg(test)]
pub mod memory;

pub use token::{CachedValue, RedisTokenCache, ScanFilter, TokenCache};
