//! Signed session tokens
//!
//! A session token is an HS256 JWT carrying the username (`sub`) and an
//! absolute expiry (`exp`, unix seconds) 15 minutes after issue. Tokens are
//! stateless: there is no server-side session table and no refresh.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Lifetime of a session token
pub const SESSION_TTL: Duration = Duration::from_secs(15 * 60);

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Username the token was issued to
    pub sub: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: u64,
}

/// Keys for issuing and verifying session tokens
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl SessionKeys {
    /// Keys derived from the shared HMAC secret
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `username`, valid for [`SESSION_TTL`] from now
    pub fn issue(&self, username: &str) -> Result<String, ApiError> {
        self.issue_at(username, now_epoch())
    }

    /// Issue a token as if at `issued_at` (unix seconds)
    pub fn issue_at(&self, username: &str, issued_at: u64) -> Result<String, ApiError> {
        let claims = SessionClaims {
            sub: username.to_string(),
            exp: issued_at + SESSION_TTL.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign session token: {}", e)))
    }

    /// Verify signature and expiry; returns the username
    pub fn verify(&self, token: &str) -> Result<String, ApiError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::auth_error("AUTH_TOKEN_EXPIRED", "Session token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ApiError::auth_error("AUTH_INVALID_TOKEN", "Invalid session token signature")
                }
                _ => ApiError::auth_error(
                    "AUTH_INVALID_TOKEN",
                    format!("Session token validation failed: {}", e),
                ),
            },
        )?;

        // jsonwebtoken accepts exp == now; the session is over at exp
        if data.claims.exp <= now_epoch() {
            return Err(ApiError::auth_error(
                "AUTH_TOKEN_EXPIRED",
                "Session token has expired",
            ));
        }

        Ok(data.claims.sub)
    }
}
