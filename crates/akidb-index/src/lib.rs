//! Vector indexing implementations for AkiDB's vector engine.
//!
//! This crate provides:
//! - `BruteForceIndex`: a simple linear scan, the correctness baseline and
//!   the backing store for [`streaming::BruteForceStreamingSearcher`]
//! - `streaming`: the incremental top-k search contract consumed by the
//!   cross-shard query coordinator

mod brute_force;
pub mod streaming;

pub use brute_force::BruteForceIndex;
pub use streaming::{
    BruteForceStreamingSearcher, Candidate, FetchError, SearchBatch, SearchContext,
    StreamingSearcher,
};
