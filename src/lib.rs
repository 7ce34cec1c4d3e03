//! callbridge - video call credentials and realtime AI agent bridge
//!
//! A small HTTP service sitting between a video-calling platform and a
//! realtime conversational-AI API.
//!
//! # Overview
//!
//! callbridge allows you to:
//! - Mint connection credentials (API key, user token, call id) for a new call
//! - Attach a realtime AI agent to an existing call
//! - Give the agent tools it can call during the conversation
//!
//! # Architecture
//!
//! - `config` - Settings file and environment credentials
//! - `video` - Video platform client: tokens and the agent bridge
//! - `realtime` - Realtime agent sessions, events and tools
//! - `agent` - Agent instructions and the tools it is given
//! - `server` - HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use callbridge::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let addr = format!("{}:{}", settings.server.host, settings.server.port);
//!     let state = callbridge::server::prepare(settings, |name| std::env::var(name).ok())?;
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     callbridge::server::serve(listener, state).await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod realtime;
pub mod server;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{BridgeError, Result};
