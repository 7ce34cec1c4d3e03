//! Realtime agent sessions.
//!
//! A session is the live, configured state of an AI agent attached to a
//! call: its instructions, its tools and the observers watching it. The
//! [`RealtimeSession`] trait is the seam between the HTTP handlers and the
//! transport; [`WsRealtimeSession`] drives the agent over a WebSocket.

pub mod events;
mod session;
mod tools;

pub use events::{ClientEvent, RealtimeError, ServerEvent, SessionConfig, ToolDefinition};
pub use session::{SessionCore, WsRealtimeSession};
pub use tools::{FunctionTool, ToolError, ToolRegistry};

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Callback for errors reported by the agent.
pub type ErrorObserver = Box<dyn Fn(&RealtimeError) + Send + Sync>;

/// Callback for session configuration updates.
pub type SessionObserver = Box<dyn Fn(&Value) + Send + Sync>;

/// Lifecycle of an agent connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Failed,
    Disconnected,
}

impl ConnectionState {
    /// Whether the connection is in progress or usable.
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

/// Partial session update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub instructions: Option<String>,
}

impl SessionUpdate {
    pub fn instructions(instructions: &str) -> Self {
        Self {
            instructions: Some(instructions.to_string()),
        }
    }
}

/// A live agent session attached to a call.
#[async_trait]
pub trait RealtimeSession: Send + Sync {
    /// Register an observer for agent-reported errors.
    fn on_error(&self, observer: ErrorObserver);

    /// Register an observer for session configuration updates.
    fn on_session_update(&self, observer: SessionObserver);

    /// Merge `update` into the session configuration and send it.
    async fn update_session(&self, update: SessionUpdate) -> Result<()>;

    /// Register a tool and advertise it to the agent.
    async fn add_tool(&self, tool: FunctionTool) -> Result<()>;

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Close the connection. Idempotent.
    async fn disconnect(&self);
}
