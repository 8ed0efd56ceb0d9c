//! Result caching subsystem.
//!
//! # Data Flow
//! ```text
//! fetch(id)
//!     → layer.rs (fresh entry in store? return it)
//!     → miss: inner lookup (breaker → network)
//!     → success only: store.rs put(id, value)
//! ```
//!
//! # Design Decisions
//! - One cache per dependency, owned by startup and shared by Arc
//! - Lazy expiry on read plus a periodic background purge
//! - Earliest-inserted eviction keeps behaviour deterministic
//! - Concurrent misses for the same key may each reach upstream

pub mod layer;
pub mod store;
pub mod sweeper;

pub use layer::CachedLookup;
pub use store::{CacheSnapshot, ResultCache};
pub use sweeper::run_sweeper;
