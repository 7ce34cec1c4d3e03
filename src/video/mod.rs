//! Video platform integration.
//!
//! The [`VideoPlatform`] trait covers the two things this service needs
//! from the platform: signing user tokens and bridging a call to a
//! realtime AI agent.

mod client;
mod token;

pub use client::StreamVideoClient;
pub use token::{TokenSigner, UserClaims};

use crate::error::Result;
use crate::realtime::RealtimeSession;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Handle to a call, identified by type and id.
///
/// Building one does not create the call on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallRef {
    pub call_type: String,
    pub id: String,
}

impl CallRef {
    pub fn new(call_type: &str, id: &str) -> Self {
        Self {
            call_type: call_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Composite identifier, `<type>:<id>`.
    pub fn cid(&self) -> String {
        format!("{}:{}", self.call_type, self.id)
    }
}

impl fmt::Display for CallRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.call_type, self.id)
    }
}

/// Parameters for attaching a realtime agent to a call.
#[derive(Clone, Copy)]
pub struct AgentConnectRequest<'a> {
    pub call: &'a CallRef,
    pub openai_api_key: &'a str,
    pub agent_user_id: &'a str,
    pub model: Option<&'a str>,
}

/// Video platform client.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Public API key handed to clients.
    fn api_key(&self) -> &str;

    /// Handle for a call of the given type.
    fn call(&self, call_type: &str, id: &str) -> CallRef {
        CallRef::new(call_type, id)
    }

    /// Sign a token authorizing `user_id`.
    fn generate_user_token(&self, user_id: &str) -> Result<String>;

    /// Bridge the call to a realtime AI agent and return its session.
    async fn connect_openai(
        &self,
        request: AgentConnectRequest<'_>,
    ) -> Result<Arc<dyn RealtimeSession>>;
}
