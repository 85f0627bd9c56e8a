//! Session tokens: HS256 JWT access/refresh pairs.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;
use crate::models::{TokenPair, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Token id, used for refresh revocation
    pub jti: String,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Token is invalid: {0}")]
    Invalid(String),
    #[error("Expected a {expected:?} token")]
    WrongKind { expected: TokenKind },
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => AppError::Internal(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

/// Issues and verifies session tokens for authenticated users.
pub struct JwtSessions {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtSessions {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issue a fresh access + refresh pair for `user`.
    pub fn issue_session(&self, user: &User) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        Ok(TokenPair {
            access: self.sign(&user.id, TokenKind::Access, now, self.access_ttl)?,
            refresh: self.sign(&user.id, TokenKind::Refresh, now, self.refresh_ttl)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(token, TokenKind::Refresh)
    }

    fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        if claims.typ != expected {
            return Err(TokenError::WrongKind { expected });
        }
        Ok(claims)
    }

    fn sign(
        &self,
        user_id: &str,
        typ: TokenKind,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            typ,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions() -> JwtSessions {
        JwtSessions::new(b"test-secret", Duration::minutes(5), Duration::days(1))
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            first_name: String::new(),
            last_name: String::new(),
            full_name: String::new(),
            bio: String::new(),
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let sessions = sessions();
        let pair = sessions.issue_session(&user("u1")).unwrap();

        let access = sessions.verify_access(&pair.access).unwrap();
        assert_eq!(access.sub, "u1");
        assert_eq!(access.typ, TokenKind::Access);

        let refresh = sessions.verify_refresh(&pair.refresh).unwrap();
        assert_eq!(refresh.sub, "u1");
        assert_ne!(access.jti, refresh.jti);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let sessions = sessions();
        let pair = sessions.issue_session(&user("u1")).unwrap();

        assert!(matches!(
            sessions.verify_access(&pair.refresh),
            Err(TokenError::WrongKind { .. })
        ));
        assert!(matches!(
            sessions.verify_refresh(&pair.access),
            Err(TokenError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let sessions = sessions();
        let issued = Utc::now() - Duration::hours(2);
        let token = sessions
            .sign("u1", TokenKind::Access, issued, Duration::minutes(5))
            .unwrap();

        assert!(matches!(sessions.verify_access(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = JwtSessions::new(b"another-secret", Duration::minutes(5), Duration::days(1));
        let pair = other.issue_session(&user("u1")).unwrap();

        let err = sessions().verify_access(&pair.access).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
        let app_err: AppError = err.into();
        assert_eq!(app_err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
