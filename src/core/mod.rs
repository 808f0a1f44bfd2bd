//! Capability clients for external collaborators
//!
//! The language model and the embedder are treated as capabilities behind
//! traits so the orchestrator and cache can be exercised without network
//! access.

pub mod embedding;
pub mod llm;
