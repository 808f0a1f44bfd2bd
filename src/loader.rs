//! Seed data loading
//!
//! Reads a JSON array of restaurant records, computes each document's
//! embedding from its fingerprint text, and upserts into the index. Records
//! may omit the embedding field; it is always recomputed on load.

use crate::core::embedding::Embedder;
use crate::domain::restaurant::RestaurantDocument;
use crate::index::RestaurantIndex;
use anyhow::{Context, Result};
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;

pub async fn load_restaurants(
    path: &Path,
    index: Arc<dyn RestaurantIndex>,
    embedder: Arc<dyn Embedder>,
) -> Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let documents: Vec<RestaurantDocument> =
        serde_json::from_str(&raw).context("parsing seed file as a JSON array of restaurants")?;

    let fingerprints: Vec<String> = documents
        .iter()
        .map(|doc| doc.fingerprint_text())
        .collect();
    let embeddings = join_all(fingerprints.iter().map(|text| embedder.embed(text))).await;

    let mut loaded = 0;
    for (mut document, embedding) in documents.into_iter().zip(embeddings) {
        match embedding {
            Ok(vector) => {
                document.embedding = vector;
                index.upsert(document).await?;
                loaded += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping '{}': embedding failed: {}", document.id, e);
            }
        }
    }

    tracing::info!("Loaded {} restaurants from {}", loaded, path.display());
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::embedding::HashEmbedder;
    use crate::index::InMemoryIndex;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_seeds_index_with_embeddings() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "id": "r1",
                "name": "Trattoria",
                "cuisines": ["Italian"],
                "city": "Delhi",
                "locality": "Khan Market",
                "address": "12 Khan Market",
                "coordinate": {{"lat": 28.6, "lon": 77.22}},
                "rating": 4.4,
                "price_for_two": 1800,
                "kind": "casual dining",
                "description": "Handmade pasta",
                "review_count": 220
            }}]"#
        )
        .unwrap();

        let index = Arc::new(InMemoryIndex::new());
        let loaded = load_restaurants(
            file.path(),
            index.clone(),
            Arc::new(HashEmbedder::new(32)),
        )
        .await
        .unwrap();

        assert_eq!(loaded, 1);
        let doc = index.get("r1").await.unwrap().unwrap();
        assert_eq!(doc.embedding.len(), 32);
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = load_restaurants(
            file.path(),
            Arc::new(InMemoryIndex::new()),
            Arc::new(HashEmbedder::new(32)),
        )
        .await;
        assert!(result.is_err());
    }
}
