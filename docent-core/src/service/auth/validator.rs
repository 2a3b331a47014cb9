//! Bearer-token validation for the signaling endpoint
//!
//! Browsers cannot set headers on a WebSocket handshake, so the token is
//! accepted either from the `Authorization` header or from a query parameter.

use super::{jwt::JwtService, Claims};
use crate::{models::UserId, Error, Result};
use std::sync::Arc;

/// JWT validator shared by HTTP handlers
#[derive(Clone)]
pub struct JwtValidator {
    jwt_service: Arc<JwtService>,
}

impl JwtValidator {
    /// Create a new JWT validator
    #[must_use]
    pub const fn new(jwt_service: Arc<JwtService>) -> Self {
        Self { jwt_service }
    }

    /// Extract bearer token from Authorization header value
    ///
    /// Supports both "Bearer <token>" and "bearer <token>" formats.
    pub fn extract_bearer_token(auth_value: &str) -> Result<String> {
        let token = auth_value
            .strip_prefix("Bearer ")
            .or_else(|| auth_value.strip_prefix("bearer "))
            .ok_or_else(|| {
                Error::Authentication("Authorization header must start with 'Bearer '".to_string())
            })?
            .trim();

        if token.is_empty() {
            return Err(Error::Authentication("Empty bearer token".to_string()));
        }
        Ok(token.to_string())
    }

    /// Validate JWT token and return claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        self.jwt_service.verify_access_token(token)
    }

    /// Validate JWT token and return user ID
    pub fn validate_and_extract_user_id(&self, token: &str) -> Result<UserId> {
        let claims = self.validate_token(token)?;
        Ok(claims.user_id())
    }

    /// Resolve the caller from whichever credential the handshake carried
    ///
    /// The header wins when both are present.
    pub fn authenticate(
        &self,
        auth_header: Option<&str>,
        query_token: Option<&str>,
    ) -> Result<UserId> {
        let token = match (auth_header, query_token) {
            (Some(header), _) => Self::extract_bearer_token(header)?,
            (None, Some(token)) if !token.is_empty() => token.to_string(),
            _ => return Err(Error::Authentication("Missing bearer token".to_string())),
        };
        self.validate_and_extract_user_id(&token)
    }
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::auth::TokenType;

    fn create_validator() -> (JwtValidator, Arc<JwtService>) {
        let jwt = Arc::new(JwtService::new(b"validator-secret-validator-secret").unwrap());
        (JwtValidator::new(jwt.clone()), jwt)
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(JwtValidator::extract_bearer_token("Bearer abc").unwrap(), "abc");
        assert_eq!(JwtValidator::extract_bearer_token("bearer abc").unwrap(), "abc");
        assert!(JwtValidator::extract_bearer_token("Basic abc").is_err());
        assert!(JwtValidator::extract_bearer_token("Bearer ").is_err());
    }

    #[test]
    fn test_authenticate_from_header() {
        let (validator, jwt) = create_validator();
        let token = jwt.sign_token(&UserId::from("u1"), TokenType::Access).unwrap();

        let user = validator
            .authenticate(Some(&format!("Bearer {token}")), None)
            .unwrap();
        assert_eq!(user.as_str(), "u1");
    }

    #[test]
    fn test_authenticate_from_query() {
        let (validator, jwt) = create_validator();
        let token = jwt.sign_token(&UserId::from("u2"), TokenType::Access).unwrap();

        let user = validator.authenticate(None, Some(&token)).unwrap();
        assert_eq!(user.as_str(), "u2");
    }

    #[test]
    fn test_authenticate_missing_credential() {
        let (validator, _) = create_validator();
        assert!(matches!(
            validator.authenticate(None, None),
            Err(Error::Authentication(_))
        ));
        assert!(validator.authenticate(None, Some("")).is_err());
    }

    #[test]
    fn test_authenticate_garbage_token() {
        let (validator, _) = create_validator();
        assert!(validator.authenticate(None, Some("not-a-jwt")).is_err());
    }
}
