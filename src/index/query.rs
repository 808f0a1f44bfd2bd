//! Index query shapes
//!
//! One query is a free-text-derived vector clause plus structured filters,
//! all AND-combined, with a declared ranking and a result limit.

use crate::domain::restaurant::Coordinate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoRadius {
    pub center: Coordinate,
    pub radius_km: f64,
}

/// Structured filters, AND-combined. `None` means "no constraint".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexFilters {
    pub cuisine: Option<String>,
    pub city: Option<String>,
    pub locality: Option<String>,
    pub kind: Option<String>,
    pub max_price: Option<u32>,
    pub min_rating: Option<f32>,
    pub geo: Option<GeoRadius>,
}

impl IndexFilters {
    pub fn without_cuisine(&self) -> Self {
        let mut filters = self.clone();
        filters.cuisine = None;
        filters
    }
}

/// How matching documents are ranked before the limit is applied.
#[derive(Debug, Clone)]
pub enum Ranking {
    /// Ascending vector distance to the query embedding.
    Similarity,
    /// Ascending great-circle distance to the given point.
    Distance(Coordinate),
    /// Descending rating, review count as tiebreak.
    RatingDesc,
}

#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub vector: Option<Vec<f32>>,
    pub filters: IndexFilters,
    pub ranking: Ranking,
    pub limit: usize,
}

impl IndexQuery {
    pub fn popular(filters: IndexFilters, limit: usize) -> Self {
        Self {
            vector: None,
            filters,
            ranking: Ranking::RatingDesc,
            limit,
        }
    }
}
