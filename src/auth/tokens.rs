//! HS256 access and refresh tokens.

use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Payload stored in a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i32,
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            secret: secret.to_string(),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn issue(&self, user_id: i32, token_type: TokenType) -> Result<String, ApiError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ApiError::Internal(format!("System time error: {e}")))?
            .as_secs();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        };

        let claims = Claims {
            sub: user_id,
            token_type,
            iat: now,
            exp: now + ttl,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {e}")))
    }

    /// Decodes a token and checks that it is of the expected type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, ApiError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::Unauthenticated("Token has expired".into()),
            ErrorKind::InvalidSignature => {
                ApiError::Unauthenticated("Invalid token signature".into())
            }
            _ => ApiError::Unauthenticated("Invalid token".into()),
        })?;

        if claims.token_type != expected {
            return Err(ApiError::Unauthenticated("Wrong token type".into()));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-that-is-long-enough-for-hs256", 3600, 7200)
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let token = issuer.issue(42, TokenType::Access).unwrap();
        let claims = issuer.verify(&token, TokenType::Access).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let issuer = issuer();
        let refresh = issuer.issue(7, TokenType::Refresh).unwrap();

        assert!(issuer.verify(&refresh, TokenType::Refresh).is_ok());
        assert!(matches!(
            issuer.verify(&refresh, TokenType::Access),
            Err(ApiError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let token = TokenIssuer::new("another-secret-entirely-different-value", 60, 60)
            .issue(1, TokenType::Access)
            .unwrap();

        assert!(matches!(
            issuer().verify(&token, TokenType::Access),
            Err(ApiError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = issuer();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            sub: 1,
            token_type: TokenType::Access,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret-that-is-long-enough-for-hs256"),
        )
        .unwrap();

        match issuer.verify(&token, TokenType::Access) {
            Err(ApiError::Unauthenticated(message)) => assert_eq!(message, "Token has expired"),
            other => panic!("expected expiry rejection, got {other:?}"),
        }
    }
}
