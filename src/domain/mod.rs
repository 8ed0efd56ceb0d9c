//! Domain subsystem.
//!
//! # Data Flow
//! ```text
//! upstream payload
//!     → product.rs (validated, immutable Product)
//!     → ports.rs (Lookup contract seen by the orchestrator)
//!     → error.rs (UpstreamError taxonomy shared by every layer)
//! ```
//!
//! # Design Decisions
//! - Products are validated once at construction and never mutated
//! - The two upstreams are identified by a closed `Dependency` enum
//! - Not-found is a domain outcome, not a dependency failure

pub mod error;
pub mod ports;
pub mod product;

pub use error::{Dependency, UpstreamError, UpstreamResult};
pub use ports::{DetailLookup, IdsLookup, Lookup};
pub use product::{Product, ProductError};
