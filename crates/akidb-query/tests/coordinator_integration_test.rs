//! Integration tests exercising the full coordinator round loop through
//! scripted shard searchers, the way a caller embedding the coordinator
//! would use it: only the public `Coordinator` API.

use std::sync::Arc;

use akidb_index::{Candidate, FetchError, SearchBatch, SearchContext, StreamingSearcher};
use akidb_query::Coordinator;
use async_trait::async_trait;

struct FixedSearcher {
    batches: parking_lot::Mutex<std::vec::IntoIter<(Vec<Candidate>, Option<f32>, bool)>>,
}

impl FixedSearcher {
    fn new(batches: Vec<(Vec<Candidate>, Option<f32>, bool)>) -> Arc<Self> {
        Arc::new(Self {
            batches: parking_lot::Mutex::new(batches.into_iter()),
        })
    }
}

#[async_trait]
impl StreamingSearcher for FixedSearcher {
    async fn next_batch(
        &self,
        _batch_size: usize,
        _ctx: &SearchContext,
    ) -> Result<SearchBatch, FetchError> {
        match self.batches.lock().next() {
            Some((candidates, max_remaining, exhausted)) => {
                SearchBatch::from_candidates(candidates, max_remaining, exhausted)
                    .map_err(|e| FetchError(e.to_string()))
            }
            None => SearchBatch::from_candidates(vec![], None, true)
                .map_err(|e| FetchError(e.to_string())),
        }
    }
}

fn cand(id: u64, distance: f32) -> Candidate {
    Candidate { id, distance }
}

#[tokio::test]
async fn full_round_loop_merges_three_shards_to_global_top_k() {
    let coordinator = Coordinator::new(4, 4, 10);

    let a = FixedSearcher::new(vec![(
        vec![cand(1, 0.05), cand(2, 0.15), cand(3, 0.9)],
        None,
        true,
    )]);
    let b = FixedSearcher::new(vec![(vec![cand(10, 0.1), cand(11, 0.95)], None, true)]);
    let c = FixedSearcher::new(vec![(vec![cand(20, 0.2)], None, true)]);

    coordinator.add_shard("a", a);
    coordinator.add_shard("b", b);
    coordinator.add_shard("c", c);

    let ctx = SearchContext::new();
    let (ids, distances) = coordinator.search(&ctx).await.unwrap();

    assert_eq!(ids, vec![1, 10, 2, 20]);
    assert_eq!(distances, vec![0.05, 0.1, 0.15, 0.2]);

    for i in 1..distances.len() {
        assert!(distances[i - 1] <= distances[i]);
    }

    coordinator.close().await;
}

#[tokio::test]
async fn no_early_termination_when_bound_does_not_clear_threshold() {
    let coordinator = Coordinator::new(3, 3, 10);

    let a = FixedSearcher::new(vec![(
        vec![cand(1, 0.1), cand(2, 0.2), cand(3, 0.3)],
        Some(0.5),
        false,
    )]);
    // Shard B's bound (0.2) does not clear the round-1 threshold (0.25),
    // so a second round is required before the shard can exhaust.
    let b = FixedSearcher::new(vec![
        (vec![cand(10, 0.25), cand(11, 0.5)], Some(0.2), false),
        (vec![], None, true),
    ]);
    let c = FixedSearcher::new(vec![(vec![], None, true)]);

    coordinator.add_shard("a", a);
    coordinator.add_shard("b", b);
    coordinator.add_shard("c", c);

    let ctx = SearchContext::new();
    let (ids, distances) = coordinator.search(&ctx).await.unwrap();

    assert_eq!(ids.len(), 3);
    assert_eq!(distances, vec![0.1, 0.2, 0.25]);
}

struct LyingSearcher;

#[async_trait]
impl StreamingSearcher for LyingSearcher {
    async fn next_batch(
        &self,
        _batch_size: usize,
        _ctx: &SearchContext,
    ) -> Result<SearchBatch, FetchError> {
        // Claims a min_score that doesn't match the candidate it returns.
        SearchBatch::new(vec![1, 2], vec![0.3, 0.4], Some(0.1), None, true)
            .map_err(|e| FetchError(e.to_string()))
    }
}

#[tokio::test]
async fn inconsistent_min_score_surfaces_as_invariant_violation() {
    let coordinator = Coordinator::new(3, 3, 10);
    coordinator.add_shard("a", Arc::new(LyingSearcher));

    let ctx = SearchContext::new();
    let result = coordinator.search(&ctx).await;

    assert!(matches!(
        result,
        Err(akidb_query::CoordinatorError::InvariantViolation(_))
    ));
}
