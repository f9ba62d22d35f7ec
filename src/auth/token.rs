// JWT token generation and validation service

use std::fmt;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::auth::error::AuthError;

/// Access tokens expire in 15 minutes
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
/// Refresh tokens expire in 7 days
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Which of the two bearer credentials a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,             // account id
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,             // issued at timestamp
    pub exp: i64,             // expiration timestamp
}

/// Token service for JWT operations
///
/// Holds the signing secret for the lifetime of the process; it is injected
/// at construction and never read from the environment here.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_duration: i64,  // in seconds
    refresh_token_duration: i64, // in seconds
}

impl TokenService {
    /// Create a new TokenService with the default lifetimes (15 minutes / 7 days)
    pub fn new(secret: &str) -> Self {
        Self::with_durations(secret, ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS)
    }

    pub fn with_durations(secret: &str, access_secs: i64, refresh_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_duration: access_secs,
            refresh_token_duration: refresh_secs,
        }
    }

    /// Issue an access token
    pub fn issue_access(&self, account_id: i64) -> Result<String, AuthError> {
        self.issue(account_id, TokenKind::Access, self.access_token_duration)
    }

    /// Issue a refresh token
    pub fn issue_refresh(&self, account_id: i64) -> Result<String, AuthError> {
        self.issue(account_id, TokenKind::Refresh, self.refresh_token_duration)
    }

    /// Issue both tokens, access first
    pub fn issue_pair(&self, account_id: i64) -> Result<(String, String), AuthError> {
        let access_token = self.issue_access(account_id)?;
        let refresh_token = self.issue_refresh(account_id)?;
        Ok((access_token, refresh_token))
    }

    fn issue(&self, account_id: i64, kind: TokenKind, ttl: i64) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account_id,
            kind,
            iat: now,
            exp: now + ttl,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Verify a token and return the account id it was issued for
    ///
    /// Fails with `InvalidToken` on decode or signature failure, `ExpiredToken`
    /// once `exp` has passed, and `WrongTokenKind` when the embedded kind is not
    /// the one the caller expects.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<i64, AuthError> {
        let claims = self.decode_claims(token)?;
        if claims.kind != expected {
            return Err(AuthError::WrongTokenKind {
                expected,
                actual: claims.kind,
            });
        }
        Ok(claims.sub)
    }

    /// Decode and validate signature and expiry, without checking the kind
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is authoritative; no grace period
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }
}
