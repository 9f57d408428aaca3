//! Query-time retrieval: embed the question, search the store, assemble
//! ranked context records.

use std::sync::Arc;
use tracing::debug;

use crate::category::{CategoryFilter, PolicyCategory};
use crate::embeddings::Embedder;
use crate::stores::{PropertyFilter, StoredObject, VectorStore};
use crate::types::EngineError;

/// One retrieved passage with the metadata needed to cite it.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievedContext {
    pub text: String,
    pub source: String,
    pub page: u32,
    pub category: PolicyCategory,
    pub last_updated: String,
}

impl From<StoredObject> for RetrievedContext {
    fn from(object: StoredObject) -> Self {
        Self {
            text: object.properties.text,
            source: object.properties.source,
            page: object.properties.page,
            category: PolicyCategory::from_stored(&object.properties.policy_category),
            last_updated: object.properties.last_updated,
        }
    }
}

/// Embeds queries and runs filtered nearest-neighbor searches.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    collection: String,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
        }
    }

    /// Returns up to `limit` contexts, nearest first, in the store's native
    /// order. An empty result is not an error; it means no grounding exists
    /// and the caller must say so instead of guessing an answer.
    pub async fn query(
        &self,
        query_text: &str,
        filter: CategoryFilter,
        limit: usize,
    ) -> Result<Vec<RetrievedContext>, EngineError> {
        let vector = self.embedder.embed(query_text).await?;
        let property_filter = match filter {
            CategoryFilter::All => None,
            CategoryFilter::Only(category) => Some(PropertyFilter::CategoryEquals(
                category.as_str().to_string(),
            )),
        };

        let hits = self
            .store
            .search_near_vector(&self.collection, &vector, limit, property_filter.as_ref())
            .await?;
        debug!(query = query_text, hits = hits.len(), "retrieval complete");
        Ok(hits.into_iter().map(RetrievedContext::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::ChunkProperties;

    #[test]
    fn stored_objects_become_contexts() {
        let object = StoredObject {
            id: "id-1".into(),
            properties: ChunkProperties {
                text: "two weeks notice".into(),
                source: "termination.pdf".into(),
                page: 3,
                policy_category: "Termination".into(),
                last_updated: "2023-11-11".into(),
            },
        };
        let context = RetrievedContext::from(object);
        assert_eq!(context.category, PolicyCategory::Termination);
        assert_eq!(context.page, 3);
    }
}
