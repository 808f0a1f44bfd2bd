//! Tool system
//!
//! Each tool is a named, schema-declared operation invoked only through the
//! model's function-calling mechanism. Tools report failure through
//! `ToolResult`, never by panicking; the agent loop forwards failure text
//! back to the model so it can recover or narrate.

pub mod answer;
pub mod detail;
pub mod registry;
pub mod reservation;
pub mod search;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Canonical tool names. The TTL policy and the orchestrator's dispatch
/// guard key on these.
pub mod names {
    pub const UNIFIED_SEARCH: &str = "unified_search";
    pub const RESTAURANT_DETAIL: &str = "restaurant_detail";
    pub const POPULAR_RESTAURANTS: &str = "popular_restaurants";
    pub const CREATE_RESERVATION: &str = "create_reservation";
    pub const LIST_RESERVATIONS: &str = "list_reservations";
    pub const CANCEL_RESERVATION: &str = "cancel_reservation";
    pub const FREE_FORM_ANSWER: &str = "free_form_answer";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    /// JSON schema type: "string", "number", "integer" or "boolean".
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

impl ToolParameter {
    pub fn required(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type: param_type.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type: param_type.to_string(),
            description: description.to_string(),
            required: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    /// Whether the orchestrator injects the session id into the arguments.
    /// Model-supplied session ids are never trusted.
    pub requires_session: bool,
}

impl ToolMetadata {
    /// Render as an OpenAI function-calling schema.
    pub fn to_function_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type,
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    /// Restaurant ids surfaced during the call, for UI hinting.
    #[serde(default)]
    pub surfaced_restaurants: Vec<String>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            surfaced_restaurants: Vec::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            surfaced_restaurants: Vec::new(),
        }
    }

    pub fn with_restaurants(mut self, ids: Vec<String>) -> Self {
        self.surfaced_restaurants = ids;
        self
    }

    /// Text handed back to the model as the tool observation.
    pub fn observation(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!(
                "Tool failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

/// Tool trait - all tools must implement this.
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;

    /// Execute the tool with the given JSON arguments. Domain failures are
    /// reported through `ToolResult::failure`; `Err` is reserved for
    /// infrastructure problems the loop treats as an upstream outage.
    async fn execute(&self, args: Value) -> Result<ToolResult>;
}

pub(crate) fn arg_str(args: &Value, name: &str) -> Option<String> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn arg_f64(args: &Value, name: &str) -> Option<f64> {
    args.get(name).and_then(Value::as_f64)
}

pub(crate) fn arg_u64(args: &Value, name: &str) -> Option<u64> {
    args.get(name).and_then(Value::as_u64)
}
