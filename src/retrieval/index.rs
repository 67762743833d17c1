//! In-memory similarity index over reference passages.
//!
//! The index is built offline (from a directory of reference text files, via
//! [`KnowledgeIndex::ingest_dir`]) or loaded from its JSON serialization, and
//! is read-only at conversation time. Similarity is cosine over stored
//! vectors.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::future::try_join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::embeddings::EmbeddingProvider;
use crate::error::EngineError;

/// One stored reference passage with its embedding and metadata tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageRecord {
    /// Unique identifier of the passage.
    pub id: String,
    /// The passage text.
    pub content: String,
    /// Embedding vector computed at ingestion time.
    pub embedding: Vec<f32>,
    /// Metadata tags (e.g., `filename`, `type`, `source`).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// A scored retrieval hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// The passage text.
    pub content: String,
    /// Cosine similarity to the query, in [-1, 1] (practically [0, 1] for
    /// real embeddings).
    pub score: f64,
    /// Metadata tags carried from the record.
    pub metadata: HashMap<String, Value>,
}

/// Similarity-searchable store of reference passages.
#[derive(Debug, Default)]
pub struct KnowledgeIndex {
    passages: RwLock<Vec<PassageRecord>>,
}

impl KnowledgeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed passages.
    pub fn len(&self) -> usize {
        self.passages.read().len()
    }

    /// True when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.passages.read().is_empty()
    }

    /// Add a passage record.
    pub fn add(&self, record: PassageRecord) {
        self.passages.write().push(record);
    }

    /// Similarity search.
    ///
    /// Scores every passage against the query vector, keeps those at or
    /// above `threshold`, sorts descending, and truncates to `top_k`. An
    /// optional metadata pre-filter restricts the candidate set before
    /// ranking; it never changes the ordering of what survives.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: f64,
        metadata_filter: Option<&HashMap<String, Value>>,
    ) -> Vec<RetrievedPassage> {
        let passages = self.passages.read();

        let mut hits: Vec<RetrievedPassage> = passages
            .iter()
            .filter(|record| match metadata_filter {
                Some(filter) => filter
                    .iter()
                    .all(|(k, v)| record.metadata.get(k) == Some(v)),
                None => true,
            })
            .filter_map(|record| {
                let score = cosine_similarity(query, &record.embedding);
                if score >= threshold {
                    Some(RetrievedPassage {
                        content: record.content.clone(),
                        score,
                        metadata: record.metadata.clone(),
                    })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        hits
    }

    /// Load an index previously persisted with [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| EngineError::index(format!("read {}: {}", path.as_ref().display(), e)))?;
        let passages: Vec<PassageRecord> = serde_json::from_str(&raw)?;
        log::info!(
            "knowledge index loaded: {} passages from {}",
            passages.len(),
            path.as_ref().display()
        );
        Ok(Self {
            passages: RwLock::new(passages),
        })
    }

    /// Persist the index as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let passages = self.passages.read();
        let raw = serde_json::to_string(&*passages)?;
        std::fs::write(path.as_ref(), raw)
            .map_err(|e| EngineError::index(format!("write {}: {}", path.as_ref().display(), e)))?;
        Ok(())
    }

    /// Build the index from every `.txt` file in a directory, embedding the
    /// file contents concurrently. Each file becomes one passage tagged with
    /// its filename.
    pub async fn ingest_dir(
        &self,
        dir: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<usize, EngineError> {
        let dir = dir.as_ref();
        let mut documents: Vec<(String, String)> = Vec::new();

        for entry in std::fs::read_dir(dir)
            .map_err(|e| EngineError::index(format!("read dir {}: {}", dir.display(), e)))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();
            let content = std::fs::read_to_string(&path)?;
            documents.push((filename, content));
        }

        let embeddings = try_join_all(
            documents
                .iter()
                .map(|(_, content)| embedder.embed(content)),
        )
        .await?;

        let mut passages = self.passages.write();
        let base = passages.len();
        for (i, ((filename, content), embedding)) in
            documents.into_iter().zip(embeddings).enumerate()
        {
            let mut metadata = HashMap::new();
            metadata.insert("filename".to_string(), Value::from(filename));
            metadata.insert(
                "type".to_string(),
                Value::from("relationship_analysis"),
            );
            metadata.insert("source".to_string(), Value::from("chardb_text"));
            passages.push(PassageRecord {
                id: format!("doc_{}", base + i + 1),
                content,
                embedding,
                metadata,
            });
        }

        log::info!("knowledge index: ingested {} passages", passages.len());
        Ok(passages.len())
    }
}

/// Cosine similarity between two vectors. Mismatched or zero-norm vectors
/// score 0 rather than erroring, so one malformed record cannot poison a
/// search.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += *x as f64 * *y as f64;
        norm_a += *x as f64 * *x as f64;
        norm_b += *y as f64 * *y as f64;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::embeddings::testing::{hash_embed, HashEmbeddings};
    use std::io::Write;

    fn record(id: &str, content: &str, category: Option<&str>) -> PassageRecord {
        let mut metadata = HashMap::new();
        if let Some(category) = category {
            metadata.insert("category".to_string(), Value::from(category));
        }
        PassageRecord {
            id: id.to_string(),
            content: content.to_string(),
            embedding: hash_embed(content),
            metadata,
        }
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_ordering_and_truncation() {
        let index = KnowledgeIndex::new();
        index.add(record("a", "이별 후 미련이 남는 심리", None));
        index.add(record("b", "이별 후 미련", None));
        index.add(record("c", "오늘 점심 메뉴 추천 목록", None));

        let query = hash_embed("이별 후 미련");
        let hits = index.search(&query, 2, 0.1, None);

        assert!(hits.len() <= 2);
        assert!(!hits.is_empty());
        // Descending similarity, all at or above threshold.
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for hit in &hits {
            assert!(hit.score >= 0.1);
        }
        // Exact text match ranks first.
        assert_eq!(hits[0].content, "이별 후 미련");
    }

    #[test]
    fn test_search_empty_when_nothing_clears_threshold() {
        let index = KnowledgeIndex::new();
        index.add(record("a", "완전히 무관한 텍스트", None));

        let query = hash_embed("이별");
        let hits = index.search(&query, 5, 0.999, None);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_metadata_filter_restricts_without_reordering() {
        let index = KnowledgeIndex::new();
        index.add(record("a", "미련 분석 자료 하나", Some("analysis")));
        index.add(record("b", "미련 분석 자료 둘", Some("analysis")));
        index.add(record("c", "미련 분석 자료 셋", Some("smalltalk")));

        let query = hash_embed("미련 분석 자료");
        let mut filter = HashMap::new();
        filter.insert("category".to_string(), Value::from("analysis"));

        let filtered = index.search(&query, 5, 0.0, Some(&filter));
        assert_eq!(filtered.len(), 2);
        for pair in filtered.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }

        // Filtered results appear in the same relative order as unfiltered.
        let unfiltered = index.search(&query, 5, 0.0, None);
        let unfiltered_order: Vec<&str> = unfiltered
            .iter()
            .filter(|h| h.metadata.get("category") == Some(&Value::from("analysis")))
            .map(|h| h.content.as_str())
            .collect();
        let filtered_order: Vec<&str> =
            filtered.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(filtered_order, unfiltered_order);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let index = KnowledgeIndex::new();
        index.add(record("a", "이별 후 감정 정리", None));

        let file = tempfile::NamedTempFile::new().unwrap();
        index.save(file.path()).unwrap();

        let loaded = KnowledgeIndex::load(file.path()).unwrap();
        assert_eq!(loaded.len(), 1);

        let query = hash_embed("이별 후 감정 정리");
        let hits = loaded.search(&query, 1, 0.9, None);
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_dir() {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in [
            ("one.txt", "미련에 대한 참고 자료"),
            ("two.txt", "재회 심리 참고 자료"),
            ("skip.md", "무시되어야 하는 파일"),
        ] {
            let mut f = std::fs::File::create(dir.path().join(name)).unwrap();
            write!(f, "{}", content).unwrap();
        }

        let index = KnowledgeIndex::new();
        let count = index
            .ingest_dir(dir.path(), Arc::new(HashEmbeddings))
            .await
            .unwrap();
        assert_eq!(count, 2);

        let hits = index.search(&hash_embed("미련에 대한 참고 자료"), 5, 0.9, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].metadata.get("source"),
            Some(&Value::from("chardb_text"))
        );
    }
}
