//! In-memory semantic cache
//!
//! Entries hold the prompt, its embedding, the response, an optional
//! session scope, and an expiry instant. Expired entries are purged lazily
//! on access.

use super::CacheGateway;
use crate::core::embedding::{cosine_similarity, Embedder};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CacheEntry {
    prompt: String,
    embedding: Vec<f32>,
    response: String,
    scope: Option<String>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }

    fn scope_matches(&self, scope: Option<&str>) -> bool {
        self.scope.as_deref() == scope
    }
}

pub struct InMemorySemanticCache {
    entries: Arc<RwLock<Vec<CacheEntry>>>,
    embedder: Arc<dyn Embedder>,
    similarity_threshold: f32,
}

impl InMemorySemanticCache {
    pub fn new(embedder: Arc<dyn Embedder>, similarity_threshold: f32) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            embedder,
            similarity_threshold,
        }
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.iter().filter(|e| e.is_live(now)).count()
    }
}

#[async_trait]
impl CacheGateway for InMemorySemanticCache {
    async fn lookup(&self, prompt: &str, scope: Option<&str>) -> Result<Option<String>> {
        let now = Instant::now();

        // Exact strategy first; it wins even over a closer semantic match.
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries
                .iter()
                .filter(|e| e.is_live(now) && e.scope_matches(scope))
                .find(|e| e.prompt == prompt)
            {
                tracing::debug!("[SemanticCache] Exact hit for prompt");
                return Ok(Some(entry.response.clone()));
            }
        }

        let query_embedding = self.embedder.embed(prompt).await?;

        let entries = self.entries.read().await;
        let best = entries
            .iter()
            .filter(|e| e.is_live(now) && e.scope_matches(scope))
            .map(|e| (cosine_similarity(&e.embedding, &query_embedding), e))
            .filter(|(similarity, _)| *similarity >= self.similarity_threshold)
            .max_by(|(a, _), (b, _)| a.total_cmp(b));

        match best {
            Some((similarity, entry)) => {
                tracing::debug!(
                    "[SemanticCache] Semantic hit at similarity {:.3}",
                    similarity
                );
                Ok(Some(entry.response.clone()))
            }
            None => Ok(None),
        }
    }

    async fn store(
        &self,
        prompt: &str,
        response: &str,
        ttl: Duration,
        scope: Option<&str>,
    ) -> Result<()> {
        if ttl.is_zero() {
            anyhow::bail!("refusing to store cache entry with zero TTL");
        }

        let embedding = self.embedder.embed(prompt).await?;
        let now = Instant::now();

        let mut entries = self.entries.write().await;
        entries.retain(|e| e.is_live(now));
        // A rewrite of the same prompt within the same scope replaces the
        // old entry, avoiding stale responses shadowing fresh ones.
        entries.retain(|e| !(e.prompt == prompt && e.scope_matches(scope)));
        entries.push(CacheEntry {
            prompt: prompt.to_string(),
            embedding,
            response: response.to_string(),
            scope: scope.map(str::to_string),
            expires_at: now + ttl,
        });

        tracing::debug!(
            "[SemanticCache] Stored entry (ttl {}ms, scoped: {})",
            ttl.as_millis(),
            scope.is_some()
        );
        Ok(())
    }
}
