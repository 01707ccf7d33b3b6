//! Streaming search contract consumed by the cross-shard coordinator.
//!
//! A [`StreamingSearcher`] exposes a one-shot index's top-k results as a
//! sequence of incrementally larger batches, so a caller fanning out across
//! many shards can stop pulling from a shard as soon as it has enough
//! evidence that shard cannot contribute a better candidate.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use akidb_core::{CoreError, DistanceMetric, DocumentId, VectorIndex};

/// Cooperative cancellation handle threaded through a round of shard fetches.
///
/// Cloning shares the same underlying token: cancelling any clone cancels
/// every clone and every `cancelled()` future waiting on it.
#[derive(Clone, Debug)]
pub struct SearchContext {
    token: CancellationToken,
}

impl SearchContext {
    /// Creates a fresh, not-yet-cancelled context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Requests cancellation of every task sharing this context.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` if [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context has been cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A single candidate returned by a shard, with a distance lower-is-better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Stable numeric identifier, derived from the shard's native document id.
    pub id: u64,
    /// Distance from the query vector; lower means more similar.
    pub distance: f32,
}

/// One round's worth of candidates pulled from a single shard.
///
/// Mirrors the wire shape a shard searcher hands back: parallel `ids`/
/// `distances` sequences plus bound metadata, zipped here into
/// [`Candidate`] pairs for convenient consumption.
#[derive(Debug, Clone)]
pub struct SearchBatch {
    candidates: Vec<Candidate>,
    /// Best (lowest) distance in this batch, if the batch is non-empty.
    pub min_score: Option<f32>,
    /// Optimistic lower bound on any future candidate this shard might still
    /// return. `None` means the shard makes no claim and must be treated as
    /// `+inf` by the coordinator.
    pub max_remaining_score: Option<f32>,
    /// `true` once the shard has no further candidates to offer.
    pub exhausted: bool,
}

impl SearchBatch {
    /// Builds a batch from parallel `ids`/`distances` sequences.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] (an `InvariantViolation` at the
    /// coordinator layer) if `ids` and `distances` differ in length, or if
    /// any distance is non-finite.
    pub fn new(
        ids: Vec<u64>,
        distances: Vec<f32>,
        min_score: Option<f32>,
        max_remaining_score: Option<f32>,
        exhausted: bool,
    ) -> Result<Self, CoreError> {
        if ids.len() != distances.len() {
            return Err(CoreError::invalid_state(format!(
                "batch ids/distances length mismatch: {} ids vs {} distances",
                ids.len(),
                distances.len()
            )));
        }
        let candidates: Vec<Candidate> = ids
            .into_iter()
            .zip(distances)
            .map(|(id, distance)| Candidate { id, distance })
            .collect();
        for c in &candidates {
            if !c.distance.is_finite() {
                return Err(CoreError::invalid_state(format!(
                    "candidate {} has non-finite distance {}",
                    c.id, c.distance
                )));
            }
        }
        Ok(Self {
            candidates,
            min_score,
            max_remaining_score,
            exhausted,
        })
    }

    /// Builds a batch directly from already-paired candidates.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if any distance is non-finite.
    pub fn from_candidates(
        candidates: Vec<Candidate>,
        max_remaining_score: Option<f32>,
        exhausted: bool,
    ) -> Result<Self, CoreError> {
        for c in &candidates {
            if !c.distance.is_finite() {
                return Err(CoreError::invalid_state(format!(
                    "candidate {} has non-finite distance {}",
                    c.id, c.distance
                )));
            }
        }
        let min_score = candidates
            .iter()
            .map(|c| c.distance)
            .min_by(f32::total_cmp);
        Ok(Self {
            candidates,
            min_score,
            max_remaining_score,
            exhausted,
        })
    }

    /// Returns the candidates carried by this batch, in emitted order.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Returns `true` if this batch carried no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Error produced by a shard while fetching a batch.
#[derive(Debug, thiserror::Error)]
#[error("shard fetch failed: {0}")]
pub struct FetchError(pub String);

/// Incremental top-k search contract implemented by a single shard.
///
/// Each call to [`next_batch`](Self::next_batch) must return candidates in
/// non-decreasing distance order relative to previously returned candidates
/// from the same searcher instance: once a searcher reports distance `d` it
/// must never later report a smaller distance than the smallest it has
/// already reported, since the coordinator relies on that monotonicity to
/// decide when a shard can no longer beat the current threshold. Once a
/// batch with `exhausted = true` has been returned, further calls are
/// undefined behavior — the coordinator never makes one.
#[async_trait]
pub trait StreamingSearcher: Send + Sync {
    /// Fetches up to `batch_size` further candidates.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the underlying shard failed to produce a
    /// batch, or if `ctx` was cancelled while waiting.
    async fn next_batch(
        &self,
        batch_size: usize,
        ctx: &SearchContext,
    ) -> Result<SearchBatch, FetchError>;

    /// Idempotent release of any per-shard resources. Called exactly once,
    /// during the coordinator's own `close()`.
    async fn close(&self) {}
}

fn hash_document_id(id: DocumentId) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

/// Adapts a one-shot [`VectorIndex`] into a [`StreamingSearcher`] by
/// requesting a strictly larger top-k on every round and yielding only the
/// newly uncovered tail.
pub struct BruteForceStreamingSearcher {
    index: Arc<dyn VectorIndex>,
    query: Vec<f32>,
    metric: DistanceMetric,
    cursor: parking_lot::Mutex<usize>,
}

impl BruteForceStreamingSearcher {
    /// Wraps `index`, searching it with `query` under `metric`.
    #[must_use]
    pub fn new(index: Arc<dyn VectorIndex>, query: Vec<f32>, metric: DistanceMetric) -> Self {
        Self {
            index,
            query,
            metric,
            cursor: parking_lot::Mutex::new(0),
        }
    }

    fn to_distance(&self, score: f32) -> f32 {
        match self.metric {
            // The index returns a similarity for these metrics; the
            // coordinator's heap expects lower-is-better distances.
            DistanceMetric::Cosine | DistanceMetric::Dot => -score,
            DistanceMetric::L2 => score,
        }
    }
}

#[async_trait]
impl StreamingSearcher for BruteForceStreamingSearcher {
    async fn next_batch(
        &self,
        batch_size: usize,
        _ctx: &SearchContext,
    ) -> Result<SearchBatch, FetchError> {
        let already_served = *self.cursor.lock();
        // Ask for one extra result beyond the batch so we can derive a
        // precise max_remaining_score bound from the next unseen candidate.
        let requested = already_served + batch_size + 1;

        let results = self
            .index
            .search(&self.query, requested, None)
            .await
            .map_err(|e| FetchError(e.to_string()))?;

        let total_available = results.len();
        let mut tail: Vec<Candidate> = results
            .iter()
            .skip(already_served)
            .take(batch_size)
            .map(|r| Candidate {
                id: hash_document_id(r.doc_id),
                distance: self.to_distance(r.score),
            })
            .collect();
        tail.truncate(batch_size);

        let served_after = already_served + tail.len();
        let exhausted = served_after >= total_available;
        let max_remaining_score = if exhausted {
            None
        } else {
            results
                .get(served_after)
                .map(|r| self.to_distance(r.score))
        };

        let mut cursor = self.cursor.lock();
        *cursor = served_after;
        drop(cursor);

        SearchBatch::from_candidates(tail, max_remaining_score, exhausted)
            .map_err(|e| FetchError(e.to_string()))
    }
}
