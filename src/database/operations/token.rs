// 令牌存储库
// 数据库是令牌记录的唯一可信来源

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::models::token::{TokenEntity, TokenStatus};
use crate::error::TokenError;

/// 令牌持久化接口
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// 保存新令牌，状态为 INACTIVE，返回带ID的记录
    async fn save(&self, payload: &str) -> Result<TokenEntity, TokenError>;

    /// 批量写回状态；只会提升状态，不会插入已删除的记录
    async fn save_all(&self, tokens: &[TokenEntity]) -> Result<u64, TokenError>;

    async fn find_all(&self) -> Result<Vec<TokenEntity>, TokenError>;

    async fn find_by_status(&self, status: TokenStatus) -> Result<Vec<TokenEntity>, TokenError>;

    /// 返回是否删除了记录
    async fn delete_by_id(&self, id: i64) -> Result<bool, TokenError>;
}

pub struct PgTokenStore {
    db: PgPool,
}

impl PgTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 建表（如不存在）
    pub async fn ensure_schema(&self) -> Result<(), TokenError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jwt_tokens (
                id BIGSERIAL PRIMARY KEY,
                jwt_token TEXT NOT NULL,
                status SMALLINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jwt_tokens_status ON jwt_tokens (status)")
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn save(&self, payload: &str) -> Result<TokenEntity, TokenError> {
        let token = sqlx::query_as::<_, TokenEntity>(
            r#"
            INSERT INTO jwt_tokens (jwt_token, status)
            VALUES ($1, $2)
            RETURNING id, jwt_token, status
            "#,
        )
        .bind(payload)
        .bind(TokenStatus::Inactive)
        .fetch_one(&self.db)
        .await?;

        Ok(token)
    }

    async fn save_all(&self, tokens: &[TokenEntity]) -> Result<u64, TokenError> {
        if tokens.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = tokens.iter().map(|t| t.id).collect();
        let statuses: Vec<i16> = tokens.iter().map(|t| t.status.as_i16()).collect();

        // GREATEST 保证状态单调，重复执行结果相同
        let result = sqlx::query(
            r#"
            UPDATE jwt_tokens AS t
            SET status = GREATEST(t.status, v.status)
            FROM UNNEST($1::BIGINT[], $2::SMALLINT[]) AS v(id, status)
            WHERE t.id = v.id
            "#,
        )
        .bind(ids)
        .bind(statuses)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_all(&self) -> Result<Vec<TokenEntity>, TokenError> {
        let tokens = sqlx::query_as::<_, TokenEntity>(
            "SELECT id, jwt_token, status FROM jwt_tokens ORDER BY id",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(tokens)
    }

    async fn find_by_status(&self, status: TokenStatus) -> Result<Vec<TokenEntity>, TokenError> {
        let tokens = sqlx::query_as::<_, TokenEntity>(
            "SELECT id, jwt_token, status FROM jwt_tokens WHERE status = $1 ORDER BY id",
        )
        .bind(status)
        .fetch_all(&self.db)
        .await?;

        Ok(tokens)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, TokenError> {
        let result = sqlx::query("DELETE FROM jwt_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
