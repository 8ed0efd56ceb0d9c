//! Upstream dependency identity and error taxonomy.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One of the two upstream services the aggregator depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// Ranked similar-identifier service.
    SimilarIds,
    /// Product detail service.
    ProductDetail,
}

impl Dependency {
    /// Stable name used in logs, metrics and status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dependency::SimilarIds => "similar-ids",
            Dependency::ProductDetail => "product-detail",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by an upstream lookup (or by the layers wrapping it).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UpstreamError {
    /// The requested product does not exist upstream.
    #[error("product {0} not found")]
    NotFound(String),

    /// The dependency's circuit breaker rejected the call.
    #[error("call to {0} not permitted: circuit breaker is open")]
    CallNotPermitted(Dependency),

    /// The call did not complete within the response timeout.
    #[error("call to {dependency} timed out after {}ms", timeout.as_millis())]
    Timeout {
        dependency: Dependency,
        timeout: Duration,
    },

    /// Connection-level failure.
    #[error("transport error calling {dependency}: {message}")]
    Transport {
        dependency: Dependency,
        message: String,
    },

    /// Anything else: bad status, undecodable or invalid payload.
    #[error("unexpected error from {dependency}: {message}")]
    Unexpected {
        dependency: Dependency,
        message: String,
    },
}

impl UpstreamError {
    /// Whether this outcome counts against the dependency's health.
    ///
    /// Not-found is an expected per-identifier answer and a rejected call
    /// never reached the network, so neither is a failure.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            UpstreamError::Timeout { .. }
                | UpstreamError::Transport { .. }
                | UpstreamError::Unexpected { .. }
        )
    }

    /// Short label for metrics and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::NotFound(_) => "not_found",
            UpstreamError::CallNotPermitted(_) => "call_not_permitted",
            UpstreamError::Timeout { .. } => "timeout",
            UpstreamError::Transport { .. } => "transport",
            UpstreamError::Unexpected { .. } => "unexpected",
        }
    }
}

/// Result type for upstream lookups.
pub type UpstreamResult<T> = Result<T, UpstreamError>;
