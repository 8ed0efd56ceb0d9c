//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every upstream call with the configured response timeout
//! - Cancel the call cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out root lookups surface as 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use crate::domain::{Dependency, UpstreamError, UpstreamResult};

/// Run `call` with a deadline, mapping expiry to `UpstreamError::Timeout`.
pub async fn with_timeout<T, F>(dependency: Dependency, timeout: Duration, call: F) -> UpstreamResult<T>
where
    F: Future<Output = UpstreamResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                dependency = %dependency,
                timeout_ms = timeout.as_millis() as u64,
                "Upstream call timed out"
            );
            Err(UpstreamError::Timeout { dependency, timeout })
        }
    }
}
