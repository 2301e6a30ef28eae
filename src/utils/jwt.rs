use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

// HS256 至少需要 256 位密钥
const MIN_KEY_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户名
    pub iat: i64,    // 签发时间
    pub exp: i64,    // 过期时间
}

fn decode_key(key: &str) -> Result<Vec<u8>, TokenError> {
    let bytes = STANDARD
        .decode(key.trim())
        .map_err(|e| TokenError::Signing(format!("secret key is not valid base64: {}", e)))?;

    if bytes.len() < MIN_KEY_BYTES {
        return Err(TokenError::Signing(format!(
            "secret key is {} bytes, HS256 needs at least {}",
            bytes.len(),
            MIN_KEY_BYTES
        )));
    }

    Ok(bytes)
}

/// 生成 HS256 签名令牌，相同输入与时间戳得到相同结果
pub fn sign(
    subject: &str,
    issued_at: DateTime<Utc>,
    ttl_secs: u64,
    key: &str,
) -> Result<String, TokenError> {
    let key = decode_key(key)?;
    let iat = issued_at.timestamp();
    let ttl = i64::try_from(ttl_secs)
        .map_err(|_| TokenError::Signing(format!("ttl {} out of range", ttl_secs)))?;

    let claims = Claims {
        sub: subject.to_string(),
        iat,
        exp: iat.saturating_add(ttl),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&key),
    )?;

    Ok(token)
}

pub fn verify(token: &str, key: &str) -> Result<Claims, TokenError> {
    let key = decode_key(key)?;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(&key),
        &Validation::new(Algorithm::HS256),
    )?;

    Ok(data.claims)
}
