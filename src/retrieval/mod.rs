//! Grounding retrieval: query embedding + similarity search.
//!
//! The retriever is the only read path into the knowledge index at
//! conversation time. Callers treat an empty result as a valid, ungrounded
//! state — a retrieval miss is not an error.

pub mod embeddings;
pub mod index;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::EngineError;
pub use embeddings::{EmbeddingProvider, OpenAiEmbeddings};
pub use index::{KnowledgeIndex, PassageRecord, RetrievedPassage};

/// Retrieves grounding passages for a query string.
pub struct Retriever {
    index: Arc<KnowledgeIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    /// Optional metadata pre-filter applied before ranking.
    metadata_filter: Option<HashMap<String, Value>>,
}

impl Retriever {
    pub fn new(index: Arc<KnowledgeIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index,
            embedder,
            metadata_filter: None,
        }
    }

    /// Restrict retrieval to passages matching these metadata tags. The
    /// filter narrows the candidate set; it does not change how survivors
    /// are ordered.
    pub fn with_metadata_filter(mut self, filter: HashMap<String, Value>) -> Self {
        self.metadata_filter = Some(filter);
        self
    }

    /// Retrieve the top-k passages above the similarity threshold, ordered
    /// by descending similarity. Returns an empty list when nothing clears
    /// the threshold.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        threshold: f64,
    ) -> Result<Vec<RetrievedPassage>, EngineError> {
        if query.trim().is_empty() || self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.index.search(
            &query_embedding,
            top_k,
            threshold,
            self.metadata_filter.as_ref(),
        );

        if hits.is_empty() {
            log::debug!(
                "retrieval miss: nothing above threshold {} for query '{}'",
                threshold,
                query
            );
        } else {
            log::debug!(
                "retrieved {} passages, best similarity {:.4}",
                hits.len(),
                hits[0].score
            );
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::embeddings::testing::{hash_embed, FailingEmbeddings, HashEmbeddings};
    use super::*;

    fn seeded_index() -> Arc<KnowledgeIndex> {
        let index = KnowledgeIndex::new();
        for (id, content) in [
            ("a", "이별 후 미련이 남는 심리 상태"),
            ("b", "재회를 고민하는 사람들의 공통점"),
            ("c", "미련 없이 정리하는 방법"),
        ] {
            index.add(PassageRecord {
                id: id.to_string(),
                content: content.to_string(),
                embedding: hash_embed(content),
                metadata: HashMap::new(),
            });
        }
        Arc::new(index)
    }

    #[tokio::test]
    async fn test_retrieve_orders_by_similarity() {
        let retriever = Retriever::new(seeded_index(), Arc::new(HashEmbeddings));
        let hits = retriever
            .retrieve("이별 후 미련이 남는 심리 상태", 3, 0.1)
            .await
            .unwrap();

        assert!(!hits.is_empty());
        assert_eq!(hits[0].content, "이별 후 미련이 남는 심리 상태");
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for hit in &hits {
            assert!(hit.score >= 0.1);
        }
    }

    #[tokio::test]
    async fn test_retrieve_respects_top_k() {
        let retriever = Retriever::new(seeded_index(), Arc::new(HashEmbeddings));
        let hits = retriever.retrieve("미련", 1, 0.0).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_empty_query_is_empty_not_error() {
        let retriever = Retriever::new(seeded_index(), Arc::new(HashEmbeddings));
        assert!(retriever.retrieve("", 5, 0.1).await.unwrap().is_empty());
        assert!(retriever.retrieve("  ", 5, 0.1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_miss_is_empty_not_error() {
        let retriever = Retriever::new(seeded_index(), Arc::new(HashEmbeddings));
        let hits = retriever.retrieve("전혀 무관한 주제", 5, 0.9999).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_propagates_embedding_failure() {
        // The orchestrator degrades this to empty grounding; the retriever
        // itself reports the failure truthfully.
        let retriever = Retriever::new(seeded_index(), Arc::new(FailingEmbeddings));
        assert!(retriever.retrieve("미련", 5, 0.1).await.is_err());
    }
}
