//! Error types for callbridge.

use thiserror::Error;

/// Library-level error type for callbridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Missing required environment variables: {}. Set them in the environment or in a .env file in the project root.",
        .0.join(", ")
    )]
    MissingEnv(Vec<&'static str>),

    #[error("Token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Agent bridge connection failed: {0}")]
    Connect(String),

    #[error("Agent bridge connection timed out after {0} seconds")]
    ConnectTimeout(u64),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Realtime session error: {0}")]
    Realtime(String),

    #[error("Realtime session is closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for callbridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
