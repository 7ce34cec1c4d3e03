//! Vendor credentials read from the process environment.

use crate::error::{BridgeError, Result};
use std::fmt;

pub const STREAM_API_KEY: &str = "STREAM_API_KEY";
pub const STREAM_API_SECRET: &str = "STREAM_API_SECRET";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Every variable the server refuses to start without.
pub const REQUIRED_VARS: [&str; 3] = [STREAM_API_KEY, STREAM_API_SECRET, OPENAI_API_KEY];

/// API keys and secrets for the video platform and the AI provider.
#[derive(Clone)]
pub struct Credentials {
    pub stream_api_key: String,
    pub stream_api_secret: String,
    pub openai_api_key: String,
}

impl Credentials {
    /// Read all credentials from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read all credentials through a lookup function.
    ///
    /// Empty values count as missing. The error names every missing
    /// variable, not just the first.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut read = |name: &'static str| match lookup(name) {
            Some(value) if !value.trim().is_empty() => value,
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let stream_api_key = read(STREAM_API_KEY);
        let stream_api_secret = read(STREAM_API_SECRET);
        let openai_api_key = read(OPENAI_API_KEY);

        if !missing.is_empty() {
            return Err(BridgeError::MissingEnv(missing));
        }

        Ok(Self {
            stream_api_key,
            stream_api_secret,
            openai_api_key,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("stream_api_key", &self.stream_api_key)
            .field("stream_api_secret", &"<redacted>")
            .field("openai_api_key", &"<redacted>")
            .finish()
    }
}
