use async_trait::async_trait;

use crate::error::CoreResult;
use crate::ids::DocumentId;
use crate::vector::{SearchResult, VectorDocument};

/// Vector index trait for insert, search, and delete operations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts a vector document into the index.
    async fn insert(&self, doc: VectorDocument) -> CoreResult<()>;

    /// Inserts multiple documents in a batch.
    ///
    /// Default implementation calls `insert` for each document sequentially.
    /// Implementations may override for optimized bulk loading.
    async fn insert_batch(&self, docs: Vec<VectorDocument>) -> CoreResult<()> {
        for doc in docs {
            self.insert(doc).await?;
        }
        Ok(())
    }

    /// Searches for k nearest neighbors.
    ///
    /// Returns results sorted by score according to the distance metric:
    /// - Cosine/Dot: descending (higher is more similar)
    /// - L2: ascending (lower is more similar)
    ///
    /// # Parameters
    ///
    /// - `query`: Query vector (must match index dimension)
    /// - `k`: Number of nearest neighbors to return
    /// - `ef_search`: HNSW search parameter (optional, ignored by brute-force)
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: Option<usize>,
    ) -> CoreResult<Vec<SearchResult>>;

    /// Deletes a document by ID.
    ///
    /// HNSW implementations may use soft deletion with tombstone marking.
    async fn delete(&self, doc_id: DocumentId) -> CoreResult<()>;

    /// Retrieves a document by ID (for verification).
    async fn get(&self, doc_id: DocumentId) -> CoreResult<Option<VectorDocument>>;

    /// Returns the total number of documents in the index.
    async fn count(&self) -> CoreResult<usize>;

    /// Clears the entire index (for testing).
    async fn clear(&self) -> CoreResult<()>;
}
