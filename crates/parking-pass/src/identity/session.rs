use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::domain::{User, UserId};
use crate::config::SessionConfig;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Signed bearer token handed to a client after login.
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and resolves HS256 session tokens carrying only the user id.
#[derive(Clone)]
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.secret, Duration::minutes(config.ttl_minutes))
    }

    pub fn issue(&self, user: &User) -> Result<SessionToken, SessionError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<SessionToken, SessionError> {
        let expires_at = now + self.ttl;
        let claims = SessionClaims {
            sub: user.id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| SessionError::Encoding(err.to_string()))?;
        Ok(SessionToken { token, expires_at })
    }

    /// Resolve a token to the user it was issued for. The caller reloads the user from the store.
    pub fn resolve(&self, token: &str) -> Result<UserId, SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::Missing);
        }

        let data = decode::<SessionClaims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Invalid,
        })?;

        data.claims
            .sub
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| SessionError::Invalid)
    }
}

/// Error raised while issuing or resolving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session token missing")]
    Missing,
    #[error("session token invalid")]
    Invalid,
    #[error("session expired")]
    Expired,
    #[error("session token could not be issued: {0}")]
    Encoding(String),
}
