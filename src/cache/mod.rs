// 缓存模块
// 活跃令牌在 Redis 中的 TTL 投影

pub mod keys;
pub mod operations;

pub use keys::{MATCH_ALL, parse_token_id, token_key};
pub use operations::token::{CachedValue, RedisTokenCache, TokenCache};
