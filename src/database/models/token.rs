// 令牌实体
// 对应数据库中的 jwt_tokens 表

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 令牌状态，只允许 INACTIVE -> ACTIVE
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum TokenStatus {
    /// 已持久化，尚未推送到缓存
    Inactive = 0,
    /// 已写入缓存
    Active = 1,
}

impl TokenStatus {
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TokenEntity {
    /// 数据库分配的自增ID
    pub id: i64,
    /// 签名后的令牌
    #[sqlx(rename = "jwt_token")]
    pub payload: String,
    pub status: TokenStatus,
}

impl TokenEntity {
    /// 标记为已推送；已是 ACTIVE 时保持不变
    pub fn activate(&mut self) {
        self.status = self.status.max(TokenStatus::Active);
    }
}
