//! Cross-shard streaming k-nearest-neighbor search coordinator.
//!
//! Fans a top-k vector search out across a set of per-shard
//! [`StreamingSearcher`]s, merges their incremental batches into a bounded
//! global heap, and stops pulling further rounds once no non-exhausted
//! shard can possibly improve the current top-k.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use akidb_core::metrics::{
    COORDINATOR_ROUNDS, COORDINATOR_SHARD_FETCH_DURATION, COORDINATOR_TERMINATIONS,
};
use akidb_index::{Candidate, FetchError, SearchBatch, SearchContext, StreamingSearcher};
use tracing::Instrument;

use crate::heap::GlobalHeap;

/// Errors produced while coordinating a cross-shard search.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// A shard's `next_batch` returned an error during the given round.
    #[error("round {round}: shard {shard}: {source}")]
    ShardFetch {
        round: usize,
        shard: String,
        #[source]
        source: FetchError,
    },

    /// The caller's context was cancelled or deadlined.
    #[error("search cancelled")]
    Cancellation,

    /// A shard task panicked instead of returning a result.
    #[error("round {round}: shard {shard}: task did not complete: {message}")]
    TaskJoin {
        round: usize,
        shard: String,
        message: String,
    },

    /// Internal heap/threshold state was observed to be inconsistent.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result alias for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

struct ShardBound {
    max_remaining_score: f32,
    exhausted: bool,
}

struct ShardState {
    name: String,
    searcher: Arc<dyn StreamingSearcher>,
    bound: parking_lot::Mutex<ShardBound>,
}

struct CoordinatorState {
    heap: GlobalHeap,
    round: usize,
    total_results_fetched: usize,
}

/// Coordinates a streaming top-k search across registered shards.
///
/// Created with immutable `(k, batch_size, max_rounds)` configuration,
/// mutated by [`add_shard`](Self::add_shard) and [`search`](Self::search),
/// and released by [`close`](Self::close), which is idempotent and safe to
/// call on every exit path.
pub struct Coordinator {
    k: usize,
    batch_size: usize,
    max_rounds: usize,
    shards: parking_lot::Mutex<Vec<Arc<ShardState>>>,
    state: Arc<parking_lot::Mutex<CoordinatorState>>,
    closed: AtomicBool,
}

impl Coordinator {
    /// Creates a coordinator for a top-`k` search.
    ///
    /// `batch_size == 0` defaults to `min(10, k)`. `max_rounds == 0`
    /// defaults to `10`.
    ///
    /// # Panics
    ///
    /// Panics if `k == 0`.
    #[must_use]
    pub fn new(k: usize, batch_size: usize, max_rounds: usize) -> Self {
        assert!(k >= 1, "k must be at least 1");
        let batch_size = if batch_size == 0 {
            std::cmp::min(10, k)
        } else {
            batch_size
        };
        let max_rounds = if max_rounds == 0 { 10 } else { max_rounds };

        Self {
            k,
            batch_size,
            max_rounds,
            shards: parking_lot::Mutex::new(Vec::new()),
            state: Arc::new(parking_lot::Mutex::new(CoordinatorState {
                heap: GlobalHeap::new(k),
                round: 0,
                total_results_fetched: 0,
            })),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the effective batch size (after default resolution).
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the effective round ceiling (after default resolution).
    #[must_use]
    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Registers a shard searcher. Not safe to call concurrently with
    /// [`search`](Self::search).
    pub fn add_shard(&self, name: impl Into<String>, searcher: Arc<dyn StreamingSearcher>) {
        self.shards.lock().push(Arc::new(ShardState {
            name: name.into(),
            searcher,
            bound: parking_lot::Mutex::new(ShardBound {
                max_remaining_score: 0.0,
                exhausted: false,
            }),
        }));
    }

    /// Executes the round loop and returns the global top-k as two
    /// parallel, ascending-by-distance sequences.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Cancellation`] if `ctx` is cancelled,
    /// [`CoordinatorError::ShardFetch`] if a shard fails, or
    /// [`CoordinatorError::InvariantViolation`] if a shard's batch claims a
    /// `min_score` inconsistent with its own candidates.
    pub async fn search(&self, ctx: &SearchContext) -> CoordinatorResult<(Vec<u64>, Vec<f32>)> {
        let shard_count = self.shards.lock().len();
        let span = tracing::info_span!("coordinator_search", k = self.k, shard_count);

        async move {
            if shard_count == 0 {
                return Ok((Vec::new(), Vec::new()));
            }

            let mut termination_reason = "max_rounds";
            let mut rounds_run = 0usize;

            for round in 0..self.max_rounds {
                if ctx.is_cancelled() {
                    COORDINATOR_TERMINATIONS
                        .with_label_values(&["cancelled"])
                        .inc();
                    return Err(CoordinatorError::Cancellation);
                }

                self.fetch_round(round, ctx).await?;
                rounds_run = round + 1;

                if self.can_terminate() {
                    termination_reason = "early";
                    break;
                }
                if self.all_exhausted() {
                    termination_reason = "exhaustion";
                    break;
                }
            }

            COORDINATOR_ROUNDS
                .with_label_values(&[termination_reason])
                .observe(rounds_run as f64);
            COORDINATOR_TERMINATIONS
                .with_label_values(&[termination_reason])
                .inc();
            let total_results_fetched = self.state.lock().total_results_fetched;
            tracing::debug!(
                termination_reason,
                rounds_run,
                total_results_fetched,
                "search finished"
            );

            Ok(self.extract_top_k())
        }
        .instrument(span)
        .await
    }

    /// Releases every registered shard's resources. Idempotent: the
    /// underlying releases run exactly once even if called more than once.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let shards = self.shards.lock().clone();
        for shard in shards {
            shard.searcher.close().await;
        }
    }

    async fn fetch_round(&self, round: usize, ctx: &SearchContext) -> CoordinatorResult<()> {
        let active: Vec<Arc<ShardState>> = self
            .shards
            .lock()
            .iter()
            .filter(|s| !s.bound.lock().exhausted)
            .cloned()
            .collect();

        if active.is_empty() {
            return Ok(());
        }

        self.state.lock().round = round;

        let mut handles = Vec::with_capacity(active.len());
        for shard in &active {
            let shard = Arc::clone(shard);
            let ctx = ctx.clone();
            let state = Arc::clone(&self.state);
            let batch_size = self.batch_size;

            handles.push(tokio::spawn(async move {
                let started = Instant::now();
                let outcome = tokio::select! {
                    biased;
                    () = ctx.cancelled() => None,
                    result = shard.searcher.next_batch(batch_size, &ctx) => Some(result),
                };
                COORDINATOR_SHARD_FETCH_DURATION
                    .with_label_values(&[shard.name.as_str()])
                    .observe(started.elapsed().as_secs_f64());

                match outcome {
                    None => Err(RoundTaskError::Cancelled),
                    Some(Err(e)) => Err(RoundTaskError::Fetch(e)),
                    Some(Ok(batch)) => match validate_batch(&batch) {
                        Err(message) => Err(RoundTaskError::Invariant(message)),
                        Ok(()) => {
                            merge_batch(&shard, &state, &batch);
                            Ok(())
                        }
                    },
                }
            }));
        }

        let mut first_error = None;
        for (shard, handle) in active.iter().zip(handles) {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(RoundTaskError::Cancelled)) => {
                    first_error.get_or_insert(CoordinatorError::Cancellation);
                }
                Ok(Err(RoundTaskError::Fetch(source))) => {
                    first_error.get_or_insert(CoordinatorError::ShardFetch {
                        round,
                        shard: shard.name.clone(),
                        source,
                    });
                }
                Ok(Err(RoundTaskError::Invariant(message))) => {
                    first_error.get_or_insert(CoordinatorError::InvariantViolation(format!(
                        "round {round}: shard {}: {message}",
                        shard.name
                    )));
                }
                Err(join_err) => {
                    first_error.get_or_insert(CoordinatorError::TaskJoin {
                        round,
                        shard: shard.name.clone(),
                        message: join_err.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn can_terminate(&self) -> bool {
        let threshold = match self.state.lock().heap.threshold() {
            Some(t) => t,
            None => return false,
        };

        self.shards.lock().iter().all(|shard| {
            let bound = shard.bound.lock();
            bound.exhausted || bound.max_remaining_score > threshold
        })
    }

    fn all_exhausted(&self) -> bool {
        self.shards
            .lock()
            .iter()
            .all(|shard| shard.bound.lock().exhausted)
    }

    fn extract_top_k(&self) -> (Vec<u64>, Vec<f32>) {
        let mut state = self.state.lock();
        let drained = state.heap.drain_sorted();
        let ids = drained.iter().map(|c| c.id).collect();
        let distances = drained.iter().map(|c| c.distance).collect();
        (ids, distances)
    }
}

enum RoundTaskError {
    Cancelled,
    Fetch(FetchError),
    Invariant(String),
}

/// Re-checks a batch's internal consistency before it is merged into the
/// global heap. [`SearchBatch::from_candidates`] derives `min_score` from
/// the candidates it is given and so can never disagree with them, but
/// [`SearchBatch::new`] accepts a caller-supplied `min_score` that a buggy
/// shard searcher can claim without it matching the batch it actually
/// returned. Catching that here, rather than trusting it into the heap,
/// keeps a bad bound from silently corrupting the termination predicate.
fn validate_batch(batch: &SearchBatch) -> Result<(), String> {
    let Some(claimed) = batch.min_score else {
        return Ok(());
    };
    let actual = batch
        .candidates()
        .iter()
        .map(|c| c.distance)
        .min_by(f32::total_cmp);
    match actual {
        None => Err(format!(
            "batch claims min_score {claimed} but carries no candidates"
        )),
        Some(actual) if (actual - claimed).abs() > f32::EPSILON => Err(format!(
            "batch claims min_score {claimed} but minimum candidate distance is {actual}"
        )),
        Some(_) => Ok(()),
    }
}

/// Applies one shard's batch: updates its bound under its own lock, then
/// merges its candidates into the global heap under the coordinator lock.
/// The shard lock is always acquired before the coordinator lock, and
/// neither is held across an `.await`.
fn merge_batch(shard: &ShardState, state: &parking_lot::Mutex<CoordinatorState>, batch: &SearchBatch) {
    {
        let mut bound = shard.bound.lock();
        bound.exhausted = batch.exhausted;
        bound.max_remaining_score = batch.max_remaining_score.unwrap_or(f32::INFINITY);
    }

    let mut state = state.lock();
    for candidate in batch.candidates() {
        state.heap.insert(*candidate);
    }
    state.total_results_fetched += batch.candidates().len();

    tracing::debug!(
        shard = shard.name.as_str(),
        round = state.round,
        batch_size = batch.candidates().len(),
        exhausted = batch.exhausted,
        threshold = ?state.heap.threshold(),
        "merged shard batch"
    );
}
