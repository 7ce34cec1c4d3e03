//! Realtime protocol events exchanged with the agent over the bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Function tool as advertised in the session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Session configuration sent with `session.update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

/// Item appended to the conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub call_id: String,
    pub output: String,
}

impl ConversationItem {
    /// Output of a function call, JSON-encoded.
    pub fn function_call_output(call_id: &str, output: &Value) -> Self {
        Self {
            kind: "function_call_output".to_string(),
            call_id: call_id.to_string(),
            output: output.to_string(),
        }
    }
}

/// Events this system sends to the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },

    #[serde(rename = "response.create")]
    ResponseCreate {},
}

/// Error reported by the agent runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealtimeError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
}

impl RealtimeError {
    /// Error raised locally by the transport rather than by the agent.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: "transport_error".to_string(),
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Output item of a finished response.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Events received from the agent. Anything unrecognized maps to `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "error")]
    Error { error: RealtimeError },

    #[serde(rename = "session.created")]
    SessionCreated { session: Value },

    #[serde(rename = "session.updated")]
    SessionUpdated { session: Value },

    #[serde(rename = "response.output_item.done")]
    OutputItemDone { item: OutputItem },

    #[serde(other)]
    Other,
}
