//! Configuration module for callbridge.
//!
//! Non-secret settings come from a TOML file; vendor credentials come from
//! the environment.

mod secrets;
mod settings;

pub use secrets::{
    Credentials, OPENAI_API_KEY, REQUIRED_VARS, STREAM_API_KEY, STREAM_API_SECRET,
};
pub use settings::{
    AgentSettings, ServerSettings, Settings, StreamSettings, MAX_TOKEN_VALIDITY_SECS,
};
