// Bearer token handling and password hashing.
// Tokens are HS256 JWTs signed with the process-wide `APP_SECRET`. The
// `userId` claim identifies the caller; `exp` is checked when present but is
// not required.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

const BEARER_PREFIX: &str = "Bearer ";

// Decoded JWT claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokenPayload {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

pub struct Auth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    token_ttl: Option<Duration>,
    bcrypt_cost: u32,
}

impl Auth {
    pub fn new(secret: &str, token_ttl: Option<Duration>, bcrypt_cost: u32) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims::<&str>(&[]);
        Auth {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_ttl,
            bcrypt_cost,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let ttl = (config.token_ttl_hours > 0).then(|| Duration::hours(config.token_ttl_hours));
        Self::new(&config.app_secret, ttl, config.bcrypt_cost)
    }

    // Strips the `Bearer ` prefix and verifies what is left.
    pub fn decode_header(&self, header: &str) -> Result<AuthTokenPayload> {
        let token = header.strip_prefix(BEARER_PREFIX).unwrap_or(header).trim();
        if token.is_empty() {
            return Err(Error::MissingToken);
        }
        let data = decode::<AuthTokenPayload>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    pub fn issue_token(&self, user_id: i32) -> Result<String> {
        let now = Utc::now();
        let claims = AuthTokenPayload {
            user_id: Some(user_id),
            iat: Some(now.timestamp()),
            exp: self.token_ttl.map(|ttl| (now + ttl).timestamp()),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    // bcrypt is CPU bound, so it runs off the async workers
    pub async fn hash_password(&self, password: String) -> Result<String> {
        let cost = self.bcrypt_cost;
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hashed)
    }

    pub async fn verify_password(&self, password: String, hash: String) -> Result<bool> {
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        Ok(valid)
    }
}
