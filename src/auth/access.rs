use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::users;

#[derive(Debug, Error)]
pub enum AccessTokenError {
    #[error("failed to sign access token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("invalid access token")]
    Invalid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl AccessClaims {
    #[must_use]
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// Mints and verifies stateless HS256 access tokens.
#[derive(Clone)]
pub struct AccessTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl AccessTokenIssuer {
    #[must_use]
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    pub fn mint(&self, user: &users::Model) -> Result<String, AccessTokenError> {
        let now = chrono::Utc::now();
        let claims = AccessClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(self.ttl_hours)).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AccessTokenError::Sign)
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, AccessTokenError> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AccessTokenError::Invalid)
    }
}
