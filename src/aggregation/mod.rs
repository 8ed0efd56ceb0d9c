//! Aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! get_similar(product_id)
//!     → similar-ids lookup (cache → breaker → network)
//!     → error? propagate unchanged
//!     → fan out detail lookups, sliding window of max_concurrency
//!     → each result lands in its list position; failures leave a gap
//!     → gaps removed → ordered Vec<Product>
//! ```
//!
//! # Design Decisions
//! - The concurrency bound is per call, not shared across requests
//! - Completion order never affects result order
//! - Dropping the returned future abandons every in-flight detail fetch

pub mod service;

pub use service::SimilarProductsService;
