//! Semantic cache gateway
//!
//! Stores (prompt, response, scope, TTL) tuples and answers "does a
//! sufficiently similar prior query exist?". Lookup runs two strategies in
//! declared order, exact string match then embedding similarity above the
//! gateway's threshold, and the first to produce a hit wins: an exact hit
//! is returned even if a semantically closer entry exists. At most one
//! entry is returned, the highest ranked.
//!
//! A scoped entry is only visible to lookups supplying the matching scope,
//! and an unscoped lookup never sees scoped entries. Entries expire
//! passively; there is no deletion API.

pub mod memory;
pub mod ttl;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait CacheGateway: Send + Sync {
    /// Return the cached response for a sufficiently similar prior prompt,
    /// if one exists within the given scope.
    async fn lookup(&self, prompt: &str, scope: Option<&str>) -> Result<Option<String>>;

    /// Write one entry. A zero TTL must not be stored; callers skip the
    /// write instead.
    async fn store(
        &self,
        prompt: &str,
        response: &str,
        ttl: Duration,
        scope: Option<&str>,
    ) -> Result<()>;
}

pub use memory::InMemorySemanticCache;
pub use ttl::ttl_for_tools;
