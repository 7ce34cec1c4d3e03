//! Configuration settings for callbridge.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Longest token lifetime accepted from configuration or the command line.
pub const MAX_TOKEN_VALIDITY_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub server: ServerSettings,
    pub stream: StreamSettings,
    pub agent: AgentSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Video platform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Base URL of the video platform API.
    pub base_url: String,
    /// Call type namespace used for every call.
    pub call_type: String,
    /// Prefix for the synthetic user that joins a freshly minted call.
    pub user_id_prefix: String,
    /// Lifetime of minted tokens, in seconds.
    pub token_validity_seconds: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            base_url: "https://video.stream-io-api.com".to_string(),
            call_type: "default".to_string(),
            user_id_prefix: "openai-demo-".to_string(),
            token_validity_seconds: 3600,
        }
    }
}

impl StreamSettings {
    /// Token lifetime as a duration.
    pub fn token_validity(&self) -> Duration {
        Duration::from_secs(self.token_validity_seconds)
    }

    /// Reject token lifetimes that are zero or beyond [`MAX_TOKEN_VALIDITY_SECS`].
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(1..=MAX_TOKEN_VALIDITY_SECS).contains(&self.token_validity_seconds) {
            return Err(BridgeError::Config(format!(
                "stream.token_validity_seconds must be between 1 and {}, got {}",
                MAX_TOKEN_VALIDITY_SECS, self.token_validity_seconds
            )));
        }
        Ok(())
    }

    /// Synthetic user id for a call id.
    pub fn user_id_for(&self, call_id: &str) -> String {
        format!("{}{}", self.user_id_prefix, call_id)
    }
}

/// Realtime agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// User id the agent joins the call as.
    pub user_id: String,
    /// Behavioral instructions sent with the session configuration.
    pub instructions: String,
    /// Realtime model override. None = platform default.
    pub model: Option<String>,
    /// Upper bound on the bridge connection, in seconds.
    pub connect_timeout_seconds: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            user_id: "lucy".to_string(),
            instructions:
                "You are a helpful assistant that can answer questions and help with tasks."
                    .to_string(),
            model: None,
            connect_timeout_seconds: 30,
        }
    }
}

impl AgentSettings {
    /// Bridge connection timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.stream.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("callbridge")
            .join("config.toml")
    }
}
