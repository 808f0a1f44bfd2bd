//! Restaurant detail lookup

use super::{arg_str, names, Tool, ToolMetadata, ToolParameter, ToolResult};
use crate::index::RestaurantIndex;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct RestaurantDetailTool {
    index: Arc<dyn RestaurantIndex>,
}

impl RestaurantDetailTool {
    pub fn new(index: Arc<dyn RestaurantIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for RestaurantDetailTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: names::RESTAURANT_DETAIL.to_string(),
            description: "Fetch full details for one restaurant by its id.".to_string(),
            parameters: vec![ToolParameter::required(
                "id",
                "string",
                "Restaurant id as returned by a search",
            )],
            requires_session: false,
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let id = match arg_str(&args, "id") {
            Some(id) => id,
            None => return Ok(ToolResult::failure("missing required argument 'id'")),
        };

        match self.index.get(&id).await {
            Ok(Some(doc)) => {
                let mut detail = doc.summary();
                detail["description"] = json!(doc.description);
                detail["reviewCount"] = json!(doc.review_count);
                Ok(ToolResult::success(detail.to_string())
                    .with_restaurants(vec![doc.id.clone()]))
            }
            Ok(None) => Ok(ToolResult::failure(format!("restaurant not found: {}", id))),
            Err(e) => {
                tracing::error!("restaurant_detail failed: {}", e);
                Ok(ToolResult::failure(format!(
                    "The restaurant index is unavailable right now: {}",
                    e
                )))
            }
        }
    }
}
