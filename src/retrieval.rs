//! Hybrid retrieval
//!
//! Composes index queries into a fixed fallback ladder so callers get
//! non-empty, best-effort results whenever the index has anything at all:
//!
//! 1. semantic: embed the free-text query, KNN restricted by all filters,
//!    2x limit headroom, distance-to-coordinate ranking when a coordinate
//!    is supplied
//! 2. geo: radius query ranked by distance
//! 3. popular: rating >= 4.0 ranked by rating, review count as tiebreak
//!
//! Steps 1 and 2 are retried once without the cuisine filter when they come
//! back empty; the popular rung runs unconditionally as the final fallback,
//! keeping only city/cuisine. "Empty after the whole ladder" is a valid
//! outcome, never an error.

use crate::core::embedding::Embedder;
use crate::domain::restaurant::{Coordinate, RestaurantDocument};
use crate::index::query::{GeoRadius, IndexFilters, IndexQuery, Ranking};
use crate::index::RestaurantIndex;
use anyhow::Result;
use std::sync::Arc;

/// Rating floor for the popular rung.
pub const POPULAR_MIN_RATING: f32 = 4.0;

const DEFAULT_RADIUS_KM: f64 = 5.0;

/// Caller-facing filter set for one search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub coordinate: Option<Coordinate>,
    pub radius_km: Option<f64>,
    pub cuisine: Option<String>,
    pub city: Option<String>,
    pub locality: Option<String>,
    pub kind: Option<String>,
    pub max_price: Option<u32>,
    pub min_rating: Option<f32>,
}

impl SearchFilters {
    fn to_index_filters(&self) -> IndexFilters {
        IndexFilters {
            cuisine: self.cuisine.clone(),
            city: self.city.clone(),
            locality: self.locality.clone(),
            kind: self.kind.clone(),
            max_price: self.max_price,
            min_rating: self.min_rating,
            geo: self.coordinate.map(|center| GeoRadius {
                center,
                radius_km: self.radius_km.unwrap_or(DEFAULT_RADIUS_KM),
            }),
        }
    }
}

pub struct HybridRetriever {
    index: Arc<dyn RestaurantIndex>,
    embedder: Arc<dyn Embedder>,
    semantic_enabled: bool,
}

impl HybridRetriever {
    pub fn new(
        index: Arc<dyn RestaurantIndex>,
        embedder: Arc<dyn Embedder>,
        semantic_enabled: bool,
    ) -> Self {
        Self {
            index,
            embedder,
            semantic_enabled,
        }
    }

    /// Run the full fallback ladder. The result is truncated to `limit`.
    pub async fn search(
        &self,
        query: Option<&str>,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<RestaurantDocument>> {
        let index_filters = filters.to_index_filters();
        let query_text = query.map(str::trim).filter(|q| !q.is_empty());

        let mut results = if let Some(text) = query_text.filter(|_| self.semantic_enabled) {
            self.semantic_step(text, &index_filters, filters.coordinate, limit)
                .await?
        } else if filters.coordinate.is_some() {
            self.geo_step(&index_filters, filters.coordinate, limit).await?
        } else {
            self.popular(filters.city.as_deref(), filters.cuisine.as_deref(), limit)
                .await?
        };

        if results.is_empty() {
            tracing::info!("Hybrid search exhausted primary rungs, falling back to popular");
            results = self
                .popular(filters.city.as_deref(), filters.cuisine.as_deref(), limit)
                .await?;
        }

        results.truncate(limit);
        Ok(results)
    }

    async fn semantic_step(
        &self,
        text: &str,
        filters: &IndexFilters,
        coordinate: Option<Coordinate>,
        limit: usize,
    ) -> Result<Vec<RestaurantDocument>> {
        let vector = self.embedder.embed(text).await?;
        let ranking = match coordinate {
            Some(center) => Ranking::Distance(center),
            None => Ranking::Similarity,
        };

        // 2x headroom for downstream re-ranking and truncation.
        let query = IndexQuery {
            vector: Some(vector),
            filters: filters.clone(),
            ranking,
            limit: limit * 2,
        };

        let results = self.index.query(query.clone()).await?;
        tracing::debug!("Semantic rung returned {} candidates", results.len());
        if !results.is_empty() || filters.cuisine.is_none() {
            return Ok(results);
        }

        tracing::debug!("Semantic rung empty, retrying without cuisine filter");
        let retry = IndexQuery {
            filters: filters.without_cuisine(),
            ..query
        };
        self.index.query(retry).await
    }

    async fn geo_step(
        &self,
        filters: &IndexFilters,
        coordinate: Option<Coordinate>,
        limit: usize,
    ) -> Result<Vec<RestaurantDocument>> {
        let center = match coordinate {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };

        let query = IndexQuery {
            vector: None,
            filters: filters.clone(),
            ranking: Ranking::Distance(center),
            limit,
        };

        let results = self.index.query(query.clone()).await?;
        tracing::debug!("Geo rung returned {} candidates", results.len());
        if !results.is_empty() || filters.cuisine.is_none() {
            return Ok(results);
        }

        tracing::debug!("Geo rung empty, retrying without cuisine filter");
        let retry = IndexQuery {
            filters: filters.without_cuisine(),
            ..query
        };
        self.index.query(retry).await
    }

    /// The popular rung, also exposed directly for the popular-restaurants
    /// tool: rating >= 4.0, optionally restricted to city and cuisine.
    pub async fn popular(
        &self,
        city: Option<&str>,
        cuisine: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RestaurantDocument>> {
        let filters = IndexFilters {
            cuisine: cuisine.map(str::to_string),
            city: city.map(str::to_string),
            min_rating: Some(POPULAR_MIN_RATING),
            ..Default::default()
        };
        self.index.query(IndexQuery::popular(filters, limit)).await
    }
}
