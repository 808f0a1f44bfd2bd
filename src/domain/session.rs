//! Session store
//!
//! Persists per-session chat transcripts and profile data. Sessions are
//! created lazily on first append and removed wholesale on session end.
//! Message ordering is insertion order; that is the only ordering guarantee.

use crate::domain::restaurant::Coordinate;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub preferences: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct SessionRecord {
    chats: HashMap<String, Vec<ChatMessage>>,
    profile: UserProfile,
}

/// Trait defining session persistence.
/// Implementations can use different backends (memory, database, cache).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the transcript for one chat. Returns an empty vector if the
    /// session or chat does not exist.
    async fn history(&self, session_id: &str, chat_id: &str) -> Result<Vec<ChatMessage>>;

    /// Append messages to a chat, creating the session lazily.
    async fn append(&self, session_id: &str, chat_id: &str, messages: &[ChatMessage])
        -> Result<()>;

    /// Fetch the session profile, if the session exists.
    async fn profile(&self, session_id: &str) -> Result<Option<UserProfile>>;

    /// Replace the session profile, creating the session lazily.
    async fn update_profile(&self, session_id: &str, profile: UserProfile) -> Result<()>;

    /// List all session IDs.
    async fn list_sessions(&self) -> Result<Vec<String>>;

    /// Remove the entire session record.
    async fn end_session(&self, session_id: &str) -> Result<()>;

    async fn exists(&self, session_id: &str) -> Result<bool>;
}

/// In-memory store using a RwLock'd HashMap.
/// Data is lost when the process terminates.
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn history(&self, session_id: &str, chat_id: &str) -> Result<Vec<ChatMessage>> {
        let sessions = self.sessions.read().await;
        let history = sessions
            .get(session_id)
            .and_then(|record| record.chats.get(chat_id))
            .cloned()
            .unwrap_or_default();
        tracing::debug!(
            "[InMemorySessionStore] Loaded {} messages for session '{}' chat '{}'",
            history.len(),
            session_id,
            chat_id
        );
        Ok(history)
    }

    async fn append(
        &self,
        session_id: &str,
        chat_id: &str,
        messages: &[ChatMessage],
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let record = sessions.entry(session_id.to_string()).or_default();
        record
            .chats
            .entry(chat_id.to_string())
            .or_default()
            .extend_from_slice(messages);
        tracing::debug!(
            "[InMemorySessionStore] Appended {} messages to session '{}' chat '{}'",
            messages.len(),
            session_id,
            chat_id
        );
        Ok(())
    }

    async fn profile(&self, session_id: &str) -> Result<Option<UserProfile>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).map(|record| record.profile.clone()))
    }

    async fn update_profile(&self, session_id: &str, profile: UserProfile) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.to_string()).or_default().profile = profile;
        tracing::debug!(
            "[InMemorySessionStore] Updated profile for session '{}'",
            session_id
        );
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.keys().cloned().collect())
    }

    async fn end_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        tracing::debug!("[InMemorySessionStore] Ended session '{}'", session_id);
        Ok(())
    }

    async fn exists(&self, session_id: &str) -> Result<bool> {
        let sessions = self.sessions.read().await;
        Ok(sessions.contains_key(session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_history() {
        let store = InMemorySessionStore::new();
        let messages = vec![
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi there"),
        ];

        store.append("alice", "chat-1", &messages).await.unwrap();
        let loaded = store.history("alice", "chat-1").await.unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "Hello");
        assert_eq!(loaded[1].role, "assistant");
    }

    #[tokio::test]
    async fn test_history_preserves_insertion_order() {
        let store = InMemorySessionStore::new();
        store
            .append("alice", "chat-1", &[ChatMessage::user("first")])
            .await
            .unwrap();
        store
            .append("alice", "chat-1", &[ChatMessage::user("second")])
            .await
            .unwrap();

        let loaded = store.history("alice", "chat-1").await.unwrap();
        assert_eq!(loaded[0].content, "first");
        assert_eq!(loaded[1].content, "second");
    }

    #[tokio::test]
    async fn test_history_for_unknown_session_is_empty() {
        let store = InMemorySessionStore::new();
        assert!(store.history("ghost", "chat-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chats_are_isolated_within_a_session() {
        let store = InMemorySessionStore::new();
        store
            .append("alice", "chat-1", &[ChatMessage::user("one")])
            .await
            .unwrap();
        store
            .append("alice", "chat-2", &[ChatMessage::user("two")])
            .await
            .unwrap();

        assert_eq!(store.history("alice", "chat-1").await.unwrap().len(), 1);
        assert_eq!(store.history("alice", "chat-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_roundtrip() {
        let store = InMemorySessionStore::new();
        let profile = UserProfile {
            display_name: Some("Alice".to_string()),
            phone: Some("+91-9999999999".to_string()),
            email: None,
            coordinate: None,
            preferences: vec!["vegetarian".to_string()],
        };

        store.update_profile("alice", profile).await.unwrap();
        let loaded = store.profile("alice").await.unwrap().unwrap();
        assert_eq!(loaded.display_name.as_deref(), Some("Alice"));
        assert_eq!(loaded.preferences, vec!["vegetarian"]);
    }

    #[tokio::test]
    async fn test_end_session_removes_everything() {
        let store = InMemorySessionStore::new();
        store
            .append("alice", "chat-1", &[ChatMessage::user("hi")])
            .await
            .unwrap();
        assert!(store.exists("alice").await.unwrap());

        store.end_session("alice").await.unwrap();
        assert!(!store.exists("alice").await.unwrap());
        assert!(store.history("alice", "chat-1").await.unwrap().is_empty());
    }
}
