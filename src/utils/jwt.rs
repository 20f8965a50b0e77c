use crate::config::AppConfig;
use actix_web::cookie::{Cookie, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// 令牌类型，写入 claims 防止 refresh token 被当作 access token 使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

// JWT Claims 结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // Subject (user ID)
    pub role: String,          // 用户角色
    pub token_type: TokenKind, // token类型
    pub exp: usize,            // Expiration time (时间戳)
    pub iat: usize,            // Issued at (签发时间)
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

// Token 响应结构体
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct JwtUtils;

impl JwtUtils {
    fn secret() -> String {
        AppConfig::get().jwt.secret.clone()
    }

    /// 以给定密钥签发令牌
    pub fn encode_with_secret(
        secret: &str,
        user_id: i64,
        role: &str,
        kind: TokenKind,
        expiry: chrono::TimeDelta,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            token_type: kind,
            exp: (now + expiry).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// 以给定密钥校验令牌签名、有效期与类型
    pub fn decode_with_secret(
        secret: &str,
        token: &str,
        expected: TokenKind,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?
        .claims;

        if claims.token_type != expected {
            return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
        }
        Ok(claims)
    }

    pub fn generate_access_token(
        user_id: i64,
        role: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let minutes = AppConfig::get().jwt.access_token_expiry;
        Self::encode_with_secret(
            &Self::secret(),
            user_id,
            role,
            TokenKind::Access,
            chrono::TimeDelta::minutes(minutes),
        )
    }

    /// `expiry` 为空时使用配置中的默认天数
    pub fn generate_refresh_token(
        user_id: i64,
        role: &str,
        expiry: Option<chrono::TimeDelta>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let expiry = expiry.unwrap_or_else(|| {
            chrono::TimeDelta::days(AppConfig::get().jwt.refresh_token_expiry)
        });
        Self::encode_with_secret(&Self::secret(), user_id, role, TokenKind::Refresh, expiry)
    }

    pub fn generate_token_pair(
        user_id: i64,
        role: &str,
        refresh_token_expiry: Option<chrono::TimeDelta>,
    ) -> Result<TokenPair, jsonwebtoken::errors::Error> {
        Ok(TokenPair {
            access_token: Self::generate_access_token(user_id, role)?,
            refresh_token: Self::generate_refresh_token(user_id, role, refresh_token_expiry)?,
        })
    }

    pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        Self::decode_with_secret(&Self::secret(), token, TokenKind::Access)
    }

    pub fn verify_refresh_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        Self::decode_with_secret(&Self::secret(), token, TokenKind::Refresh)
    }

    /// 创建 Refresh Token Cookie，`max_age_days` 与令牌有效期一致
    pub fn create_refresh_token_cookie(refresh_token: &str, max_age_days: i64) -> Cookie<'static> {
        let config = AppConfig::get();
        Cookie::build(REFRESH_TOKEN_COOKIE, refresh_token.to_string())
            .path("/")
            .max_age(actix_web::cookie::time::Duration::days(max_age_days))
            .same_site(SameSite::Strict)
            .http_only(true)
            .secure(config.is_production()) // 生产环境下使用 HTTPS
            .finish()
    }

    /// 创建空的 Refresh Token Cookie（用于注销）
    pub fn create_empty_refresh_token_cookie() -> Cookie<'static> {
        let config = AppConfig::get();
        Cookie::build(REFRESH_TOKEN_COOKIE, "")
            .path("/")
            .max_age(actix_web::cookie::time::Duration::seconds(0))
            .same_site(SameSite::Strict)
            .http_only(true)
            .secure(config.is_production())
            .finish()
    }

    pub fn extract_refresh_token_from_cookie(req: &actix_web::HttpRequest) -> Option<String> {
        req.cookie(REFRESH_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-please-ignore";

    #[test]
    fn test_access_token_roundtrip() {
        let token = JwtUtils::encode_with_secret(
            SECRET,
            42,
            "teacher",
            TokenKind::Access,
            chrono::TimeDelta::minutes(5),
        )
        .unwrap();

        let claims = JwtUtils::decode_with_secret(SECRET, &token, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.role, "teacher");
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let token = JwtUtils::encode_with_secret(
            SECRET,
            7,
            "user",
            TokenKind::Refresh,
            chrono::TimeDelta::days(1),
        )
        .unwrap();

        assert!(JwtUtils::decode_with_secret(SECRET, &token, TokenKind::Access).is_err());
        assert!(JwtUtils::decode_with_secret(SECRET, &token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_wrong_secret_and_expired_tokens_fail() {
        let token = JwtUtils::encode_with_secret(
            SECRET,
            1,
            "admin",
            TokenKind::Access,
            chrono::TimeDelta::minutes(5),
        )
        .unwrap();
        assert!(JwtUtils::decode_with_secret("other", &token, TokenKind::Access).is_err());

        // 默认校验有 60 秒宽限
        let expired = JwtUtils::encode_with_secret(
            SECRET,
            1,
            "admin",
            TokenKind::Access,
            chrono::TimeDelta::minutes(-10),
        )
        .unwrap();
        assert!(JwtUtils::decode_with_secret(SECRET, &expired, TokenKind::Access).is_err());
    }
}
