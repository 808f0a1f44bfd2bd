//! Query orchestrator
//!
//! Runs one user turn through the pipeline:
//!
//! INIT -> CACHE_CHECK -> {hit: DONE | miss: AGENT_LOOP} -> CACHE_WRITE -> DONE
//!
//! The agent loop is bounded: the model either answers or requests tool
//! calls, tool results are fed back, and exceeding the iteration cap fails
//! closed with the apology message instead of looping. At most one cache
//! write happens per turn, and a turn in which any tool failed is never
//! cached. The final user and assistant messages are appended to the
//! session transcript exactly once, after the workflow completes.
//!
//! Concurrent turns for the same session are serialized by a per-session
//! single-flight guard; different sessions run in parallel.

use crate::cache::{ttl_for_tools, CacheGateway};
use crate::config::Settings;
use crate::core::llm::{LanguageModel, ModelTurn, PromptMessage, ToolCall};
use crate::domain::session::{ChatMessage, SessionStore};
use crate::error::{AgentError, APOLOGY_MESSAGE};
use crate::tools::{names, registry::ToolRegistry, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Inbound turn shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub session_id: String,
    pub chat_id: String,
    pub message: String,
    /// Scope the cache to this session (lookups and writes).
    #[serde(default)]
    pub use_smart_recall: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub content: String,
    pub is_cached_response: bool,
    #[serde(flatten)]
    pub state: AgentTurnState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
    Skip,
    Saved,
    Error,
}

/// Transient per-turn trace. Never persisted beyond the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTurnState {
    pub session_id: String,
    pub cache_status: CacheStatus,
    /// Ordered, may repeat.
    pub tools_used: Vec<String>,
    /// Restaurant ids surfaced during the turn, for UI hinting.
    pub restaurants: Vec<String>,
    #[serde(skip)]
    any_tool_failed: bool,
    #[serde(skip)]
    listed_reservations: bool,
}

impl AgentTurnState {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            cache_status: CacheStatus::Miss,
            tools_used: Vec::new(),
            restaurants: Vec::new(),
            any_tool_failed: false,
            listed_reservations: false,
        }
    }

    fn record(&mut self, tool_name: &str, result: &ToolResult) {
        self.tools_used.push(tool_name.to_string());
        if !result.success {
            self.any_tool_failed = true;
        }
        if tool_name == names::LIST_RESERVATIONS && result.success {
            self.listed_reservations = true;
        }
        for id in &result.surfaced_restaurants {
            if !self.restaurants.contains(id) {
                self.restaurants.push(id.clone());
            }
        }
    }
}

const SYSTEM_PROMPT: &str = "\
You are a helpful dining assistant. You can search restaurants, look up \
details, list popular places, manage the user's reservations and answer \
general food questions through the tools provided.

Rules:
- Use unified_search when the user wants restaurants matching a need; pass \
every filter they mention (cuisine, city, locality, price, rating).
- Reservation ids are opaque. Before cancelling, always call \
list_reservations in this conversation and use an id from its output. Never \
invent a reservation or restaurant id.
- Contact details for bookings come from the user's saved profile; never ask \
the model caller for them.
- When a tool fails, explain the problem briefly and suggest what the user \
can do next.
- Answer concisely once you have what you need.";

pub struct Orchestrator {
    model: Arc<dyn LanguageModel>,
    cache: Arc<dyn CacheGateway>,
    sessions: Arc<dyn SessionStore>,
    registry: Arc<ToolRegistry>,
    cache_enabled: bool,
    max_iterations: usize,
    session_guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        cache: Arc<dyn CacheGateway>,
        sessions: Arc<dyn SessionStore>,
        registry: Arc<ToolRegistry>,
        settings: &Settings,
    ) -> Self {
        Self {
            model,
            cache,
            sessions,
            registry,
            cache_enabled: settings.cache.enabled,
            max_iterations: settings.agent.max_iterations,
            session_guards: Mutex::new(HashMap::new()),
        }
    }

    /// Process one user turn end to end.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse, AgentError> {
        let session_id = request.session_id.trim().to_lowercase();
        if session_id.is_empty() {
            return Err(AgentError::Validation("sessionId is required".into()));
        }
        let chat_id = request.chat_id.trim().to_string();
        if chat_id.is_empty() {
            return Err(AgentError::Validation("chatId is required".into()));
        }
        let message = request.message.trim().to_string();
        if message.is_empty() {
            return Err(AgentError::Validation("message is required".into()));
        }

        // Single-flight per session: a double-submit waits rather than
        // interleaving transcript writes.
        let guard = self.guard_for(&session_id).await;
        let flight = guard.lock().await;
        let outcome = self
            .run_turn(&session_id, &chat_id, &message, request.use_smart_recall)
            .await;
        drop(flight);
        drop(guard);
        self.release_guard(&session_id).await;
        outcome
    }

    async fn run_turn(
        &self,
        session_id: &str,
        chat_id: &str,
        message: &str,
        use_smart_recall: bool,
    ) -> Result<TurnResponse, AgentError> {
        let mut state = AgentTurnState::new(session_id.to_string());
        let scope = use_smart_recall.then(|| session_id.to_string());

        let history = match self.sessions.history(session_id, chat_id).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("Session history unavailable, starting fresh: {}", e);
                Vec::new()
            }
        };

        // CACHE_CHECK: a hit ends the turn with no tools and no re-cache.
        if self.cache_enabled {
            match self.cache.lookup(message, scope.as_deref()).await {
                Ok(Some(cached)) => {
                    tracing::info!("Cache hit for session '{}'", session_id);
                    state.cache_status = CacheStatus::Hit;
                    self.append_transcript(session_id, chat_id, message, &cached)
                        .await;
                    return Ok(TurnResponse {
                        content: cached,
                        is_cached_response: true,
                        state,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    // Cache outage is never fatal to the turn.
                    tracing::warn!("Cache lookup failed, treating as miss: {}", e);
                }
            }
        }

        // AGENT_LOOP
        let loop_result = self
            .run_agent_loop(&history, message, session_id, &mut state)
            .await;

        let (content, loop_completed) = match loop_result {
            Ok(text) => (text, true),
            Err(e) => {
                tracing::error!("Agent loop failed: {}", e);
                (APOLOGY_MESSAGE.to_string(), false)
            }
        };

        // CACHE_WRITE: at most one write per turn, only for clean turns.
        if !loop_completed || state.any_tool_failed || !self.cache_enabled {
            state.cache_status = CacheStatus::Skip;
        } else {
            let ttl = ttl_for_tools(&state.tools_used);
            if ttl.is_zero() {
                state.cache_status = CacheStatus::Skip;
            } else {
                match self
                    .cache
                    .store(message, &content, ttl, scope.as_deref())
                    .await
                {
                    Ok(()) => {
                        tracing::debug!("Cached turn response for {}ms", ttl.as_millis());
                        state.cache_status = CacheStatus::Saved;
                    }
                    Err(e) => {
                        tracing::error!("Cache store failed: {}", e);
                        state.cache_status = CacheStatus::Error;
                    }
                }
            }
        }

        self.append_transcript(session_id, chat_id, message, &content)
            .await;

        Ok(TurnResponse {
            content,
            is_cached_response: false,
            state,
        })
    }

    async fn guard_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut guards = self.session_guards.lock().await;
        guards
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a session's guard once no turn holds it, so the map does not
    /// grow with every session id ever seen.
    async fn release_guard(&self, session_id: &str) {
        let mut guards = self.session_guards.lock().await;
        if let Some(entry) = guards.get(session_id) {
            if Arc::strong_count(entry) == 1 {
                guards.remove(session_id);
            }
        }
    }

    /// The final user and assistant messages land in the transcript exactly
    /// once, after the workflow completes.
    async fn append_transcript(&self, session_id: &str, chat_id: &str, user: &str, assistant: &str) {
        let messages = [ChatMessage::user(user), ChatMessage::assistant(assistant)];
        if let Err(e) = self.sessions.append(session_id, chat_id, &messages).await {
            tracing::error!("Failed to append transcript for '{}': {}", session_id, e);
        }
    }

    async fn run_agent_loop(
        &self,
        history: &[ChatMessage],
        message: &str,
        session_id: &str,
        state: &mut AgentTurnState,
    ) -> Result<String, AgentError> {
        let schemas = self.registry.schemas();

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(PromptMessage::System(SYSTEM_PROMPT.to_string()));
        for entry in history {
            match entry.role.as_str() {
                "assistant" => messages.push(PromptMessage::Assistant(entry.content.clone())),
                _ => messages.push(PromptMessage::User(entry.content.clone())),
            }
        }
        messages.push(PromptMessage::User(message.to_string()));

        for iteration in 0..self.max_iterations {
            tracing::debug!("Agent iteration {}/{}", iteration + 1, self.max_iterations);

            let turn = self
                .model
                .complete(&messages, &schemas)
                .await
                .map_err(|e| AgentError::Upstream(format!("model call failed: {}", e)))?;

            match turn {
                ModelTurn::Final(text) => {
                    return Ok(if text.trim().is_empty() {
                        APOLOGY_MESSAGE.to_string()
                    } else {
                        text
                    });
                }
                ModelTurn::ToolCalls(calls) => {
                    messages.push(PromptMessage::AssistantToolCalls(calls.clone()));
                    for call in calls {
                        let result = self.dispatch(&call, session_id, state).await;
                        state.record(&call.name, &result);
                        messages.push(PromptMessage::ToolOutput {
                            call_id: call.id,
                            name: call.name,
                            content: result.observation(),
                        });
                    }
                }
            }
        }

        Err(AgentError::Upstream(format!(
            "agent loop exceeded {} iterations without a final answer",
            self.max_iterations
        )))
    }

    async fn dispatch(&self, call: &ToolCall, session_id: &str, state: &AgentTurnState) -> ToolResult {
        tracing::info!("Executing tool '{}'", call.name);

        // Reservation ids must come from a listing in this same turn.
        if call.name == names::CANCEL_RESERVATION && !state.listed_reservations {
            return ToolResult::failure(
                "call list_reservations first and use a reservation id from its output",
            );
        }

        let tool = match self.registry.get(&call.name) {
            Some(tool) => tool,
            None => return ToolResult::failure(format!("Tool '{}' not found", call.name)),
        };

        let mut args = match &call.arguments {
            Value::Object(_) => call.arguments.clone(),
            _ => Value::Object(serde_json::Map::new()),
        };
        if tool.metadata().requires_session {
            // The session identity comes from the turn, never the model.
            args["session_id"] = Value::String(session_id.to_string());
        }

        match tool.execute(args).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Tool '{}' execution error: {}", call.name, e);
                ToolResult::failure(format!("Tool execution failed: {}", e))
            }
        }
    }
}
