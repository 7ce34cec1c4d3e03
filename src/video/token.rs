//! Access tokens for the video platform.
//!
//! Tokens are HS256 JWTs signed with the platform API secret.

use crate::error::{BridgeError, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backdating applied to `iat` so slightly fast platform clocks accept the token.
const CLOCK_SKEW_SECS: i64 = 5;

/// Claims carried by a user token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserClaims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
    /// Calls the token is restricted to. Empty = any call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_cids: Vec<String>,
}

/// Signs and verifies tokens with the platform secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Token for `user_id`, valid for `validity`.
    pub fn user_token(&self, user_id: &str, validity: Duration) -> Result<String> {
        self.sign(user_id, Vec::new(), validity)
    }

    /// Token for `user_id` restricted to the given calls.
    pub fn call_token(&self, user_id: &str, call_cids: &[String], validity: Duration) -> Result<String> {
        self.sign(user_id, call_cids.to_vec(), validity)
    }

    fn sign(&self, user_id: &str, call_cids: Vec<String>, validity: Duration) -> Result<String> {
        let now = Utc::now().timestamp();
        let exp = i64::try_from(validity.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(secs))
            .ok_or_else(|| {
                BridgeError::InvalidInput(format!(
                    "Token validity of {}s is out of range",
                    validity.as_secs()
                ))
            })?;
        let claims = UserClaims {
            user_id: user_id.to_string(),
            iat: now - CLOCK_SKEW_SECS,
            exp,
            call_cids,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<UserClaims> {
        let validation = Validation::new(Algorithm::HS256);
        Ok(decode::<UserClaims>(token, &self.decoding, &validation)?.claims)
    }
}
