//! Upstream dependency clients.
//!
//! # Data Flow
//! ```text
//! Lookup::fetch(id)
//!     → client.rs (build URL, GET, deadline)
//!     → status mapping (404 → NotFound, other non-2xx → Unexpected)
//!     → JSON decode → domain value
//! ```
//!
//! # Design Decisions
//! - Both services share one reqwest connection pool
//! - The response timeout covers send and body decode together
//! - Product detail accepts `availability` or `available`

pub mod client;

pub use client::{ClientSetupError, HttpProductDetailLookup, HttpSimilarIdsLookup, UpstreamHttp};
