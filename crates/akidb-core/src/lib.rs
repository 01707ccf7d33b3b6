//! Core domain types and traits for AkiDB's vector search engine.

pub mod collection;
pub mod error;
pub mod ids;
pub mod metrics;
pub mod traits;
pub mod vector;

pub use collection::DistanceMetric;
pub use error::{CoreError, CoreResult};
pub use ids::DocumentId;
pub use traits::VectorIndex;
pub use vector::{SearchResult, VectorDocument};
