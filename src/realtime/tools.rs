//! Tool registration and invocation for realtime sessions.

use super::events::ToolDefinition;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure of a single tool invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    Failed(String),

    #[error("Tool handler panicked")]
    Panicked,
}

type Handler = Arc<dyn Fn(Value) -> Result<Value, ToolError> + Send + Sync>;

/// A named, schema-described function the agent may call.
#[derive(Clone)]
pub struct FunctionTool {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    handler: Handler,
}

impl FunctionTool {
    /// Create a tool from a typed handler.
    ///
    /// Arguments are checked against the schema's `required` list and then
    /// deserialized into `A` before the handler runs.
    pub fn new<A, R, F>(name: &str, description: &str, parameters: Value, handler: F) -> Self
    where
        A: DeserializeOwned,
        R: Serialize,
        F: Fn(A) -> Result<R, ToolError> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(move |args: Value| {
            let args: A = serde_json::from_value(args)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
            let result = handler(args)?;
            serde_json::to_value(result).map_err(|e| ToolError::Failed(e.to_string()))
        });

        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
            handler,
        }
    }

    /// Definition advertised to the agent.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            kind: "function".to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    /// Validate and run the tool.
    pub fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        check_required(&self.parameters, &args)?;
        let handler = Arc::clone(&self.handler);
        catch_unwind(AssertUnwindSafe(move || handler(args))).unwrap_or(Err(ToolError::Panicked))
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Reject arguments that are not an object or lack a required property.
fn check_required(schema: &Value, args: &Value) -> Result<(), ToolError> {
    let object = args
        .as_object()
        .ok_or_else(|| ToolError::InvalidArguments("arguments must be a JSON object".to_string()))?;

    let required = schema["required"].as_array().into_iter().flatten();
    for key in required.filter_map(Value::as_str) {
        if object.get(key).map_or(true, Value::is_null) {
            return Err(ToolError::InvalidArguments(format!(
                "missing required argument '{}'",
                key
            )));
        }
    }
    Ok(())
}

/// Ordered set of tools registered on a session.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<FunctionTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name is replaced in place.
    pub fn add(&mut self, tool: FunctionTool) {
        match self.tools.iter_mut().find(|t| t.name == tool.name) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of every tool, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(FunctionTool::definition).collect()
    }

    /// Run a tool from its raw JSON arguments.
    ///
    /// Never fails: errors become an `{"error": ...}` payload for the agent.
    pub fn call(&self, name: &str, arguments: &str) -> Value {
        debug!(tool = name, arguments, "Tool call");

        let result = self
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
            .and_then(|tool| {
                let args = if arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(arguments)
                        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?
                };
                tool.invoke(args)
            });

        match result {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                json!({ "error": e.to_string() })
            }
        }
    }
}
