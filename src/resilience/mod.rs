//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an upstream dependency:
//!     → guarded.rs (ask the breaker; fail fast with CallNotPermitted when open)
//!     → timeouts.rs (enforce the per-call response timeout)
//!     → circuit_breaker.rs (record success / failure / ignored outcome)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - No retries inside a single aggregation call
//! - Circuit breaker prevents hammering a failing dependency
//! - All resilience logic composes as Lookup decorators

pub mod circuit_breaker;
pub mod guarded;
pub mod timeouts;

pub use circuit_breaker::{Admission, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use guarded::BreakerLookup;
pub use timeouts::with_timeout;
