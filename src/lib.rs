//! Tavola - dining assistant core
//!
//! Natural-language dining queries are routed through a semantic-cache
//! lookup, a bounded tool-using agent loop, and a hybrid restaurant
//! retrieval index, then the answer is written back to the cache with a
//! TTL decided by which tools fired.

pub mod cache;
mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod index;
pub mod loader;
pub mod orchestrator;
pub mod retrieval;
pub mod tools;
pub mod utils;

pub mod cli;

pub use config::Settings;
pub use error::{AgentError, APOLOGY_MESSAGE};
pub use orchestrator::{AgentTurnState, CacheStatus, Orchestrator, TurnRequest, TurnResponse};
pub use retrieval::{HybridRetriever, SearchFilters};

use crate::cache::InMemorySemanticCache;
use crate::core::embedding::{Embedder, HashEmbedder, OpenAiEmbedder};
use crate::core::llm::OpenAiModel;
use crate::domain::reservation::InMemoryReservationStore;
use crate::domain::session::InMemorySessionStore;
use crate::index::{InMemoryIndex, RestaurantIndex};
use crate::tools::registry::ToolRegistry;
use std::sync::Arc;

/// The assembled system: the orchestrator plus the collaborators the CLI
/// needs direct access to.
pub struct System {
    pub orchestrator: Arc<Orchestrator>,
    pub index: Arc<dyn RestaurantIndex>,
    pub embedder: Arc<dyn Embedder>,
    pub sessions: Arc<InMemorySessionStore>,
}

/// Register the seven canonical tools against their backing capabilities.
pub fn build_registry(
    retriever: Arc<HybridRetriever>,
    index: Arc<dyn RestaurantIndex>,
    sessions: Arc<dyn domain::session::SessionStore>,
    reservations: Arc<dyn domain::reservation::ReservationStore>,
    model: Arc<dyn core::llm::LanguageModel>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(tools::search::UnifiedSearchTool::new(
        retriever.clone(),
    )));
    registry.register(Arc::new(tools::search::PopularRestaurantsTool::new(
        retriever,
    )));
    registry.register(Arc::new(tools::detail::RestaurantDetailTool::new(
        index.clone(),
    )));
    registry.register(Arc::new(tools::reservation::CreateReservationTool::new(
        reservations.clone(),
        sessions,
        index,
    )));
    registry.register(Arc::new(tools::reservation::ListReservationsTool::new(
        reservations.clone(),
    )));
    registry.register(Arc::new(tools::reservation::CancelReservationTool::new(
        reservations,
    )));
    registry.register(Arc::new(tools::answer::FreeFormAnswerTool::new(model)));
    registry
}

/// Wire up the whole system from settings. With an API key the model and
/// embedder go over HTTP; without one the deterministic hash embedder keeps
/// search and caching usable offline, but turns need a reachable model.
pub fn build_system(settings: &Settings, api_key: Option<String>) -> System {
    let embedder: Arc<dyn Embedder> = match &api_key {
        Some(key) => Arc::new(OpenAiEmbedder::new(key.clone(), settings)),
        None => Arc::new(HashEmbedder::default()),
    };
    let model: Arc<dyn core::llm::LanguageModel> = Arc::new(OpenAiModel::new(
        api_key.unwrap_or_default(),
        settings,
    ));

    let index: Arc<dyn RestaurantIndex> = Arc::new(InMemoryIndex::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let reservations = Arc::new(InMemoryReservationStore::new());
    let retriever = Arc::new(HybridRetriever::new(
        index.clone(),
        embedder.clone(),
        settings.agent.semantic_search,
    ));
    let cache = Arc::new(InMemorySemanticCache::new(
        embedder.clone(),
        settings.cache.similarity_threshold,
    ));

    let registry = Arc::new(build_registry(
        retriever,
        index.clone(),
        sessions.clone(),
        reservations,
        model.clone(),
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        model,
        cache,
        sessions.clone(),
        registry,
        settings,
    ));

    System {
        orchestrator,
        index,
        embedder,
        sessions,
    }
}
