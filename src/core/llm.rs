//! Language-model capability
//!
//! The model is treated as a capability: given a prompt and the registry's
//! tool schemas, it returns either final text or a list of typed tool
//! invocations. That outcome is the `ModelTurn` sum type; the orchestrator
//! dispatches on it and never inspects raw completions.

use crate::config::Settings;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// What the model produced for one loop iteration.
#[derive(Debug, Clone)]
pub enum ModelTurn {
    Final(String),
    ToolCalls(Vec<ToolCall>),
}

/// Conversation items fed to the model. Tool traffic is kept structured so
/// each backend can render it in its own wire format.
#[derive(Debug, Clone)]
pub enum PromptMessage {
    System(String),
    User(String),
    Assistant(String),
    AssistantToolCalls(Vec<ToolCall>),
    ToolOutput {
        call_id: String,
        name: String,
        content: String,
    },
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion over the conversation. `tools` holds
    /// function-calling schemas; pass an empty slice to force plain text.
    async fn complete(&self, messages: &[PromptMessage], tools: &[Value]) -> Result<ModelTurn>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    /// JSON-encoded argument object, per the OpenAI wire format.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

fn render_messages(messages: &[PromptMessage]) -> Vec<ApiMessage> {
    messages
        .iter()
        .map(|message| match message {
            PromptMessage::System(text) => ApiMessage {
                role: "system".to_string(),
                content: Some(text.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            PromptMessage::User(text) => ApiMessage {
                role: "user".to_string(),
                content: Some(text.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            PromptMessage::Assistant(text) => ApiMessage {
                role: "assistant".to_string(),
                content: Some(text.clone()),
                tool_calls: None,
                tool_call_id: None,
            },
            PromptMessage::AssistantToolCalls(calls) => ApiMessage {
                role: "assistant".to_string(),
                content: None,
                tool_calls: Some(
                    calls
                        .iter()
                        .map(|call| ApiToolCall {
                            id: call.id.clone(),
                            kind: "function".to_string(),
                            function: ApiFunction {
                                name: call.name.clone(),
                                arguments: call.arguments.to_string(),
                            },
                        })
                        .collect(),
                ),
                tool_call_id: None,
            },
            PromptMessage::ToolOutput {
                call_id,
                name: _,
                content,
            } => ApiMessage {
                role: "tool".to_string(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: Some(call_id.clone()),
            },
        })
        .collect()
}

pub struct OpenAiModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiModel {
    pub fn new(api_key: String, settings: &Settings) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: settings.llm.model.clone(),
            base_url: settings.llm.base_url.clone(),
            max_tokens: settings.llm.max_tokens,
            temperature: settings.llm.temperature,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, messages: &[PromptMessage], tools: &[Value]) -> Result<ModelTurn> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: render_messages(messages),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools: tools.to_vec(),
        };

        const MAX_RETRIES: u32 = 3;
        const BASE_DELAY_MS: u64 = 1000;

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_DELAY_MS * 2_u64.pow(attempt - 1);
                tracing::warn!(
                    "[OpenAiModel] Retrying API call (attempt {}/{}) after {}ms delay",
                    attempt + 1,
                    MAX_RETRIES,
                    delay
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
            }

            let response_result = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await;

            let response = match response_result {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!("[OpenAiModel] HTTP request failed: {}", e);
                    last_error = Some(anyhow::anyhow!("HTTP request failed: {}", e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                tracing::warn!(
                    "[OpenAiModel] API returned error status {}: {}",
                    status,
                    error_text
                );
                last_error = Some(anyhow::anyhow!("API error {}: {}", status, error_text));
                continue;
            }

            let chat_response = match response.json::<ChatResponse>().await {
                Ok(cr) => cr,
                Err(e) => {
                    tracing::warn!("[OpenAiModel] Failed to decode response body: {}", e);
                    last_error = Some(anyhow::anyhow!("Response decode error: {}", e));
                    continue;
                }
            };

            let choice = match chat_response.choices.into_iter().next() {
                Some(c) => c,
                None => {
                    last_error = Some(anyhow::anyhow!("API returned no choices"));
                    continue;
                }
            };

            if let Some(calls) = choice.message.tool_calls {
                if !calls.is_empty() {
                    let tool_calls = calls
                        .into_iter()
                        .map(|call| {
                            let arguments = serde_json::from_str(&call.function.arguments)
                                .unwrap_or_else(|e| {
                                    tracing::warn!(
                                        "[OpenAiModel] Malformed tool arguments for '{}': {}",
                                        call.function.name,
                                        e
                                    );
                                    Value::Object(serde_json::Map::new())
                                });
                            ToolCall {
                                id: call.id,
                                name: call.function.name,
                                arguments,
                            }
                        })
                        .collect();
                    return Ok(ModelTurn::ToolCalls(tool_calls));
                }
            }

            return Ok(ModelTurn::Final(
                choice.message.content.unwrap_or_default(),
            ));
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("All retry attempts failed")))
    }
}
