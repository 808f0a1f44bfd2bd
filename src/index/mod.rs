//! Restaurant retrieval index
//!
//! Trait defining the index capability: upsert a document with typed
//! fields, query by structured filters with an optional K-nearest-neighbor
//! vector clause, ranked and bounded by a limit. The in-memory
//! implementation scans and ranks; a server-backed implementation would
//! push the same query shape down to the engine.

pub mod query;

use crate::core::embedding::cosine_similarity;
use crate::domain::restaurant::RestaurantDocument;
use anyhow::Result;
use async_trait::async_trait;
use query::{IndexFilters, IndexQuery, Ranking};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait RestaurantIndex: Send + Sync {
    /// Insert or replace one document, embedding included, atomically.
    async fn upsert(&self, document: RestaurantDocument) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<RestaurantDocument>>;

    /// Run one filtered, ranked, bounded query. Empty results are Ok.
    async fn query(&self, query: IndexQuery) -> Result<Vec<RestaurantDocument>>;

    async fn count(&self) -> Result<usize>;
}

fn matches_filters(doc: &RestaurantDocument, filters: &IndexFilters) -> bool {
    if let Some(cuisine) = &filters.cuisine {
        if !doc.has_cuisine(cuisine) {
            return false;
        }
    }
    if let Some(city) = &filters.city {
        if !doc.city.eq_ignore_ascii_case(city) {
            return false;
        }
    }
    if let Some(locality) = &filters.locality {
        if !doc.locality.eq_ignore_ascii_case(locality) {
            return false;
        }
    }
    if let Some(kind) = &filters.kind {
        if !doc.kind.eq_ignore_ascii_case(kind) {
            return false;
        }
    }
    if let Some(max_price) = filters.max_price {
        if doc.price_for_two > max_price {
            return false;
        }
    }
    if let Some(min_rating) = filters.min_rating {
        if doc.rating < min_rating {
            return false;
        }
    }
    if let Some(geo) = &filters.geo {
        if doc.coordinate.distance_km(&geo.center) > geo.radius_km {
            return false;
        }
    }
    true
}

/// In-memory index over a RwLock'd HashMap.
/// Suitable for tests and single-process deployments.
pub struct InMemoryIndex {
    documents: Arc<RwLock<HashMap<String, RestaurantDocument>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RestaurantIndex for InMemoryIndex {
    async fn upsert(&self, document: RestaurantDocument) -> Result<()> {
        let mut documents = self.documents.write().await;
        tracing::debug!("[InMemoryIndex] Upserting document '{}'", document.id);
        documents.insert(document.id.clone(), document);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<RestaurantDocument>> {
        let documents = self.documents.read().await;
        Ok(documents.get(id).cloned())
    }

    async fn query(&self, query: IndexQuery) -> Result<Vec<RestaurantDocument>> {
        let documents = self.documents.read().await;
        let mut matched: Vec<RestaurantDocument> = documents
            .values()
            .filter(|doc| matches_filters(doc, &query.filters))
            .cloned()
            .collect();

        match &query.ranking {
            Ranking::Similarity => {
                let vector = query.vector.as_deref().unwrap_or(&[]);
                matched.sort_by(|a, b| {
                    let sim_a = cosine_similarity(&a.embedding, vector);
                    let sim_b = cosine_similarity(&b.embedding, vector);
                    sim_b.total_cmp(&sim_a)
                });
            }
            Ranking::Distance(center) => {
                matched.sort_by(|a, b| {
                    let d_a = a.coordinate.distance_km(center);
                    let d_b = b.coordinate.distance_km(center);
                    d_a.total_cmp(&d_b)
                });
            }
            Ranking::RatingDesc => {
                matched.sort_by(|a, b| {
                    b.rating
                        .total_cmp(&a.rating)
                        .then_with(|| b.review_count.cmp(&a.review_count))
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
        }

        matched.truncate(query.limit);
        tracing::debug!(
            "[InMemoryIndex] Query matched {} documents (limit {})",
            matched.len(),
            query.limit
        );
        Ok(matched)
    }

    async fn count(&self) -> Result<usize> {
        let documents = self.documents.read().await;
        Ok(documents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::query::{GeoRadius, IndexFilters, IndexQuery, Ranking};
    use super::*;
    use crate::domain::restaurant::Coordinate;

    fn doc(id: &str, cuisine: &str, city: &str, rating: f32, reviews: u32) -> RestaurantDocument {
        RestaurantDocument {
            id: id.to_string(),
            name: format!("Restaurant {}", id),
            cuisines: vec![cuisine.to_string()],
            city: city.to_string(),
            locality: "Khan Market".to_string(),
            address: "1 Main St".to_string(),
            coordinate: Coordinate { lat: 28.6, lon: 77.22 },
            rating,
            price_for_two: 1500,
            kind: "casual dining".to_string(),
            description: "Food".to_string(),
            review_count: reviews,
            embedding: vec![1.0, 0.0],
        }
    }

    async fn seeded_index() -> InMemoryIndex {
        let index = InMemoryIndex::new();
        index.upsert(doc("r1", "Italian", "Delhi", 4.5, 100)).await.unwrap();
        index.upsert(doc("r2", "Thai", "Delhi", 4.5, 300)).await.unwrap();
        index.upsert(doc("r3", "Italian", "Mumbai", 3.8, 50)).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let index = InMemoryIndex::new();
        index.upsert(doc("r1", "Italian", "Delhi", 4.0, 10)).await.unwrap();
        index.upsert(doc("r1", "Thai", "Delhi", 4.2, 10)).await.unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
        let stored = index.get("r1").await.unwrap().unwrap();
        assert!(stored.has_cuisine("thai"));
    }

    #[tokio::test]
    async fn test_cuisine_and_city_filters_combine() {
        let index = seeded_index().await;
        let results = index
            .query(IndexQuery::popular(
                IndexFilters {
                    cuisine: Some("italian".to_string()),
                    city: Some("delhi".to_string()),
                    ..Default::default()
                },
                10,
            ))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "r1");
    }

    #[tokio::test]
    async fn test_rating_sort_breaks_ties_by_review_count() {
        let index = seeded_index().await;
        let results = index
            .query(IndexQuery::popular(IndexFilters::default(), 10))
            .await
            .unwrap();
        // r1 and r2 share a 4.5 rating; r2 has more reviews.
        assert_eq!(results[0].id, "r2");
        assert_eq!(results[1].id, "r1");
        assert_eq!(results[2].id, "r3");
    }

    #[tokio::test]
    async fn test_limit_is_respected() {
        let index = seeded_index().await;
        let results = index
            .query(IndexQuery::popular(IndexFilters::default(), 2))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_geo_radius_filter() {
        let index = InMemoryIndex::new();
        let mut near = doc("near", "Italian", "Delhi", 4.0, 10);
        near.coordinate = Coordinate { lat: 28.60, lon: 77.22 };
        let mut far = doc("far", "Italian", "Delhi", 4.0, 10);
        far.coordinate = Coordinate { lat: 28.90, lon: 77.60 };
        index.upsert(near).await.unwrap();
        index.upsert(far).await.unwrap();

        let results = index
            .query(IndexQuery {
                vector: None,
                filters: IndexFilters {
                    geo: Some(GeoRadius {
                        center: Coordinate { lat: 28.60, lon: 77.22 },
                        radius_km: 5.0,
                    }),
                    ..Default::default()
                },
                ranking: Ranking::Distance(Coordinate { lat: 28.60, lon: 77.22 }),
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "near");
    }

    #[tokio::test]
    async fn test_similarity_ranking() {
        let index = InMemoryIndex::new();
        let mut close = doc("close", "Italian", "Delhi", 4.0, 10);
        close.embedding = vec![1.0, 0.0];
        let mut distant = doc("distant", "Italian", "Delhi", 4.0, 10);
        distant.embedding = vec![0.0, 1.0];
        index.upsert(close).await.unwrap();
        index.upsert(distant).await.unwrap();

        let results = index
            .query(IndexQuery {
                vector: Some(vec![1.0, 0.1]),
                filters: IndexFilters::default(),
                ranking: Ranking::Similarity,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(results[0].id, "close");
    }
}
