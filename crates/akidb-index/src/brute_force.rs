//! Brute-force linear scan index implementation.
//!
//! This is a simple, correct baseline implementation that exhaustively
//! compares the query vector against all indexed vectors. It serves as:
//! - A viable option for small collections (< 10k vectors)
//! - The backing store [`crate::streaming::BruteForceStreamingSearcher`]
//!   pages results out of

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use akidb_core::{
    CoreError, CoreResult, DistanceMetric, DocumentId, SearchResult, VectorDocument, VectorIndex,
};

/// Brute-force linear scan index (baseline for correctness).
///
/// Time complexity: O(n·d) per search where n = number of documents, d = dimension
/// Space complexity: O(n·d)
///
/// # Example
///
/// ```
/// use akidb_core::{DistanceMetric, DocumentId, VectorDocument, VectorIndex};
/// use akidb_index::BruteForceIndex;
///
/// # #[tokio::main]
/// # async fn main() -> akidb_core::CoreResult<()> {
/// let index = BruteForceIndex::new(512, DistanceMetric::Cosine);
///
/// // Insert a document
/// let doc = VectorDocument::new(DocumentId::new(), vec![0.1; 512]);
/// index.insert(doc).await?;
///
/// // Search for nearest neighbors
/// let query = vec![0.1; 512];
/// let results = index.search(&query, 10, None).await?;
/// assert_eq!(results.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct BruteForceIndex {
    /// Vector dimension
    dim: usize,

    /// Distance metric
    metric: DistanceMetric,

    /// In-memory document storage
    documents: Arc<RwLock<HashMap<DocumentId, VectorDocument>>>,
}

impl BruteForceIndex {
    /// Creates a new brute-force index with the specified dimension and metric.
    ///
    /// # Example
    ///
    /// ```
    /// use akidb_core::DistanceMetric;
    /// use akidb_index::BruteForceIndex;
    ///
    /// let index = BruteForceIndex::new(512, DistanceMetric::Cosine);
    /// ```
    #[must_use]
    pub fn new(dim: usize, metric: DistanceMetric) -> Self {
        Self {
            dim,
            metric,
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the vector dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Returns the distance metric.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

#[async_trait]
impl VectorIndex for BruteForceIndex {
    async fn insert(&self, doc: VectorDocument) -> CoreResult<()> {
        if doc.vector.len() != self.dim {
            return Err(CoreError::invalid_state(format!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dim,
                doc.vector.len()
            )));
        }

        // BUG-5 FIX: Validate no NaN or Inf values
        for (i, &val) in doc.vector.iter().enumerate() {
            if !val.is_finite() {
                return Err(CoreError::invalid_state(format!(
                    "Vector contains invalid value at index {}: {}. \
                     Only finite numbers are allowed (no NaN or Infinity)",
                    i, val
                )));
            }
        }

        // BUG-9 FIX: For Cosine metric, reject zero vectors (undefined similarity)
        if matches!(self.metric, DistanceMetric::Cosine) {
            let norm_squared: f32 = doc.vector.iter().map(|x| x * x).sum();
            if norm_squared == 0.0 {
                return Err(CoreError::invalid_state(
                    "Cannot insert zero vector with Cosine similarity metric. \
                     Cosine similarity is mathematically undefined for zero vectors. \
                     Consider using L2 distance metric instead."
                        .to_string(),
                ));
            }
        }

        let mut docs = self.documents.write();

        // BUG-1 FIX: Reject duplicate inserts
        if docs.contains_key(&doc.doc_id) {
            return Err(CoreError::invalid_state(format!(
                "Document {} already exists",
                doc.doc_id
            )));
        }

        docs.insert(doc.doc_id, doc);
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        _ef_search: Option<usize>,
    ) -> CoreResult<Vec<SearchResult>> {
        let _timer = akidb_core::metrics::INDEX_SEARCH_DURATION
            .with_label_values(&["brute_force", self.metric.as_str()])
            .start_timer();

        if query.len() != self.dim {
            return Err(CoreError::invalid_state(format!(
                "Query dimension mismatch: expected {}, got {}",
                self.dim,
                query.len()
            )));
        }

        // BUG-8 FIX: Validate query contains no NaN/Inf
        for (i, &val) in query.iter().enumerate() {
            if !val.is_finite() {
                return Err(CoreError::invalid_state(format!(
                    "Query vector contains invalid value at index {}: {}. \
                     Only finite numbers are allowed (no NaN or Infinity)",
                    i, val
                )));
            }
        }

        let docs = self.documents.read();

        // Compute distances for all documents
        let mut results: Vec<_> = docs
            .values()
            .map(|doc| {
                let score = self.metric.compute(query, &doc.vector);
                let mut result = SearchResult::new(doc.doc_id, score);

                // BUG-2 FIX: Only set external_id/metadata if they exist (don't fabricate empty values)
                if let Some(ref ext_id) = doc.external_id {
                    result = result.with_external_id(ext_id.clone());
                }
                if let Some(ref meta) = doc.metadata {
                    result = result.with_metadata(meta.clone());
                }

                result
            })
            .collect();

        // BUG-6 FIX: Use total_cmp for deterministic NaN handling
        // Sort by score according to distance metric convention
        match self.metric {
            DistanceMetric::L2 => {
                // Lower is more similar (distance)
                results.sort_by(|a, b| a.score.total_cmp(&b.score));
            }
            DistanceMetric::Cosine | DistanceMetric::Dot => {
                // Higher is more similar (similarity)
                results.sort_by(|a, b| b.score.total_cmp(&a.score));
            }
        }

        // Return top-k
        results.truncate(k);
        Ok(results)
    }

    async fn delete(&self, doc_id: DocumentId) -> CoreResult<()> {
        let mut docs = self.documents.write();

        // BUG-3 FIX: Return error if document doesn't exist
        docs.remove(&doc_id)
            .ok_or_else(|| CoreError::not_found("Document", doc_id.to_string()))?;

        Ok(())
    }

    async fn get(&self, doc_id: DocumentId) -> CoreResult<Option<VectorDocument>> {
        let docs = self.documents.read();
        Ok(docs.get(&doc_id).cloned())
    }

    async fn count(&self) -> CoreResult<usize> {
        let docs = self.documents.read();
        Ok(docs.len())
    }

    async fn clear(&self) -> CoreResult<()> {
        let mut docs = self.documents.write();
        docs.clear();
        Ok(())
    }
}
