//! Search tools: unified search and popular restaurants
//!
//! Both are backed by the hybrid retriever and always succeed; an empty
//! result set is reported as such, not as a failure.

use super::{arg_f64, arg_str, arg_u64, names, Tool, ToolMetadata, ToolParameter, ToolResult};
use crate::domain::restaurant::{Coordinate, RestaurantDocument};
use crate::retrieval::{HybridRetriever, SearchFilters};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 20;

fn render_results(results: &[RestaurantDocument]) -> ToolResult {
    if results.is_empty() {
        return ToolResult::success(
            "No restaurants matched, even after relaxing the filters. The index may be empty.",
        );
    }
    let ids = results.iter().map(|doc| doc.id.clone()).collect();
    let summaries: Vec<Value> = results.iter().map(RestaurantDocument::summary).collect();
    ToolResult::success(json!({ "restaurants": summaries }).to_string()).with_restaurants(ids)
}

fn limit_from(args: &Value) -> usize {
    arg_u64(args, "limit")
        .map(|l| l as usize)
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT)
}

pub struct UnifiedSearchTool {
    retriever: Arc<HybridRetriever>,
}

impl UnifiedSearchTool {
    pub fn new(retriever: Arc<HybridRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for UnifiedSearchTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: names::UNIFIED_SEARCH.to_string(),
            description: "Search restaurants by free text plus optional filters \
                          (cuisine, city, locality, type, price, rating, location radius)."
                .to_string(),
            parameters: vec![
                ToolParameter::optional("query", "string", "Free-text description of what the user wants"),
                ToolParameter::optional("latitude", "number", "Latitude to search around"),
                ToolParameter::optional("longitude", "number", "Longitude to search around"),
                ToolParameter::optional("radius_km", "number", "Search radius in kilometers"),
                ToolParameter::optional("cuisine", "string", "Cuisine filter, e.g. Italian"),
                ToolParameter::optional("city", "string", "City filter"),
                ToolParameter::optional("locality", "string", "Neighborhood filter, e.g. Khan Market"),
                ToolParameter::optional("type", "string", "Restaurant type, e.g. cafe or fine dining"),
                ToolParameter::optional("max_price", "integer", "Maximum price for two"),
                ToolParameter::optional("min_rating", "number", "Minimum rating, 0 to 5"),
                ToolParameter::optional("limit", "integer", "Maximum number of results"),
            ],
            requires_session: false,
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let coordinate = match (arg_f64(&args, "latitude"), arg_f64(&args, "longitude")) {
            (Some(lat), Some(lon)) => Some(Coordinate { lat, lon }),
            _ => None,
        };
        let filters = SearchFilters {
            coordinate,
            radius_km: arg_f64(&args, "radius_km"),
            cuisine: arg_str(&args, "cuisine"),
            city: arg_str(&args, "city"),
            locality: arg_str(&args, "locality"),
            kind: arg_str(&args, "type"),
            max_price: arg_u64(&args, "max_price").map(|p| p as u32),
            min_rating: arg_f64(&args, "min_rating").map(|r| r as f32),
        };
        let query = arg_str(&args, "query");

        match self
            .retriever
            .search(query.as_deref(), &filters, limit_from(&args))
            .await
        {
            Ok(results) => Ok(render_results(&results)),
            Err(e) => {
                tracing::error!("unified_search failed: {}", e);
                Ok(ToolResult::failure(format!(
                    "The restaurant index is unavailable right now: {}",
                    e
                )))
            }
        }
    }
}

pub struct PopularRestaurantsTool {
    retriever: Arc<HybridRetriever>,
}

impl PopularRestaurantsTool {
    pub fn new(retriever: Arc<HybridRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for PopularRestaurantsTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: names::POPULAR_RESTAURANTS.to_string(),
            description: "List highly rated restaurants, optionally filtered by city and cuisine."
                .to_string(),
            parameters: vec![
                ToolParameter::optional("city", "string", "City filter"),
                ToolParameter::optional("cuisine", "string", "Cuisine filter"),
                ToolParameter::optional("limit", "integer", "Maximum number of results"),
            ],
            requires_session: false,
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let city = arg_str(&args, "city");
        let cuisine = arg_str(&args, "cuisine");

        match self
            .retriever
            .popular(city.as_deref(), cuisine.as_deref(), limit_from(&args))
            .await
        {
            Ok(results) => Ok(render_results(&results)),
            Err(e) => {
                tracing::error!("popular_restaurants failed: {}", e);
                Ok(ToolResult::failure(format!(
                    "The restaurant index is unavailable right now: {}",
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::embedding::{Embedder, HashEmbedder};
    use crate::index::{InMemoryIndex, RestaurantIndex};
    use serde_json::json;

    async fn retriever_with_docs() -> Arc<HybridRetriever> {
        let index = Arc::new(InMemoryIndex::new());
        let embedder = Arc::new(HashEmbedder::new(64));
        for (id, cuisine, rating) in [("r1", "Italian", 4.5), ("r2", "Thai", 4.2)] {
            let mut doc = RestaurantDocument {
                id: id.to_string(),
                name: format!("Restaurant {}", id),
                cuisines: vec![cuisine.to_string()],
                city: "Delhi".to_string(),
                locality: "Khan Market".to_string(),
                address: "1 Main St".to_string(),
                coordinate: Coordinate { lat: 28.6, lon: 77.22 },
                rating,
                price_for_two: 1500,
                kind: "casual dining".to_string(),
                description: "Good food".to_string(),
                review_count: 100,
                embedding: vec![],
            };
            doc.embedding = embedder.embed(&doc.fingerprint_text()).await.unwrap();
            index.upsert(doc).await.unwrap();
        }
        Arc::new(HybridRetriever::new(index, embedder, true))
    }

    #[tokio::test]
    async fn test_unified_search_surfaces_restaurant_ids() {
        let tool = UnifiedSearchTool::new(retriever_with_docs().await);
        let result = tool
            .execute(json!({"query": "italian food", "cuisine": "Italian"}))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.surfaced_restaurants, vec!["r1".to_string()]);
        assert!(result.output.contains("Restaurant r1"));
    }

    #[tokio::test]
    async fn test_unified_search_empty_index_still_succeeds() {
        let retriever = Arc::new(HybridRetriever::new(
            Arc::new(InMemoryIndex::new()),
            Arc::new(HashEmbedder::new(64)),
            true,
        ));
        let tool = UnifiedSearchTool::new(retriever);
        let result = tool.execute(json!({"query": "anything"})).await.unwrap();

        assert!(result.success);
        assert!(result.surfaced_restaurants.is_empty());
    }

    #[tokio::test]
    async fn test_popular_filters_by_rating_floor() {
        let tool = PopularRestaurantsTool::new(retriever_with_docs().await);
        let result = tool.execute(json!({"city": "Delhi"})).await.unwrap();

        assert!(result.success);
        assert_eq!(result.surfaced_restaurants.len(), 2);
        // Highest rated first.
        assert_eq!(result.surfaced_restaurants[0], "r1");
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let tool = PopularRestaurantsTool::new(retriever_with_docs().await);
        let result = tool.execute(json!({"limit": 1})).await.unwrap();
        assert_eq!(result.surfaced_restaurants.len(), 1);
    }
}
