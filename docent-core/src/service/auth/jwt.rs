use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{config::JwtConfig, models::UserId, Error, Result};

/// JWT token type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Token type (access or refresh)
    pub typ: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::from_string(self.sub.clone())
    }

    #[must_use]
    pub fn is_access_token(&self) -> bool {
        self.typ == TokenType::Access.as_str()
    }

    #[must_use]
    pub fn is_refresh_token(&self) -> bool {
        self.typ == TokenType::Refresh.as_str()
    }
}

/// JWT service for signing and verifying tokens
///
/// Tokens are issued by the platform's identity service with a shared
/// HMAC secret; the relay only needs to verify them. Signing is kept for
/// tooling and tests.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    algorithm: Algorithm,
    access_duration: Duration,
    leeway_seconds: u64,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl JwtService {
    /// Create a new JWT service with an HS256 secret
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Internal("JWT secret must not be empty".to_string()));
        }

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            algorithm: Algorithm::HS256,
            access_duration: Duration::hours(1),
            leeway_seconds: 60,
        })
    }

    /// Create a JWT service from configuration
    pub fn from_config(config: &JwtConfig) -> Result<Self> {
        let mut service = Self::new(config.secret.as_bytes())?;
        service.access_duration =
            Duration::hours(i64::try_from(config.access_token_duration_hours).unwrap_or(1));
        service.leeway_seconds = config.leeway_seconds;
        Ok(service)
    }

    /// Sign a token for a user
    pub fn sign_token(&self, user_id: &UserId, token_type: TokenType) -> Result<String> {
        let now = Utc::now();
        let duration = match token_type {
            TokenType::Access => self.access_duration,
            TokenType::Refresh => Duration::days(30),
        };

        let claims = Claims {
            sub: user_id.as_str().to_string(),
            typ: token_type.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + duration).timestamp(),
        };

        self.sign_claims(&claims)
    }

    /// Sign arbitrary claims (expired tokens in tests, service tokens in tooling)
    pub fn sign_claims(&self, claims: &Claims) -> Result<String> {
        let header = Header::new(self.algorithm);
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify a token and extract claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = self.leeway_seconds;

        let token_data: TokenData<Claims> = decode(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::Authentication("Token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    Error::Authentication("Invalid token".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    Error::Authentication("Invalid token signature".to_string())
                }
                _ => Error::Authentication(format!("Token verification failed: {e}")),
            })?;

        Ok(token_data.claims)
    }

    /// Verify an access token (convenience method)
    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        let claims = self.verify_token(token)?;
        if !claims.is_access_token() {
            return Err(Error::Authentication("Not an access token".to_string()));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_jwt_service() -> JwtService {
        JwtService::new(b"test-secret-test-secret-test-secret").unwrap()
    }

    #[test]
    fn test_sign_and_verify_access_token() {
        let jwt = create_jwt_service();
        let user_id = UserId::from("visitor-1");

        let token = jwt.sign_token(&user_id, TokenType::Access).unwrap();
        let claims = jwt.verify_access_token(&token).unwrap();

        assert_eq!(claims.sub, "visitor-1");
        assert_eq!(claims.user_id(), user_id);
        assert!(claims.is_access_token());
    }

    #[test]
    fn test_refresh_token_is_not_access() {
        let jwt = create_jwt_service();
        let token = jwt
            .sign_token(&UserId::from("visitor-1"), TokenType::Refresh)
            .unwrap();

        assert!(jwt.verify_token(&token).unwrap().is_refresh_token());
        assert!(jwt.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let jwt = create_jwt_service();
        let now = Utc::now().timestamp();
        let token = jwt
            .sign_claims(&Claims {
                sub: "visitor-1".to_string(),
                typ: "access".to_string(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();

        match jwt.verify_access_token(&token) {
            Err(Error::Authentication(msg)) => assert_eq!(msg, "Token expired"),
            other => panic!("expected expiry failure, got {other:?}"),
        }
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let issuer = JwtService::new(b"some-other-secret-some-other-secret").unwrap();
        let token = issuer
            .sign_token(&UserId::from("visitor-1"), TokenType::Access)
            .unwrap();

        assert!(create_jwt_service().verify_token(&token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let jwt = create_jwt_service();
        assert!(jwt.verify_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(JwtService::new(b"").is_err());
    }
}
