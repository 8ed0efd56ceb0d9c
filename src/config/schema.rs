//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the aggregator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the similarity aggregator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream service location and response timeout.
    pub upstream: UpstreamConfig,

    /// Fan-out settings for detail lookups.
    pub aggregation: AggregationConfig,

    /// Resilience settings for the similar-ids dependency.
    pub similar_ids: DependencyConfig,

    /// Resilience settings for the product-detail dependency.
    pub product_detail: DependencyConfig,

    /// Inbound timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Upstream service configuration shared by both dependencies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream product API.
    pub base_url: String,

    /// Response timeout applied to every upstream call, in milliseconds.
    pub timeout_ms: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            timeout_ms: 3000,
        }
    }
}

/// Detail fan-out configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Maximum in-flight detail lookups per aggregation call.
    pub max_concurrency: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self { max_concurrency: 10 }
    }
}

/// Per-dependency resilience configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DependencyConfig {
    pub circuit_breaker: CircuitBreakerConfig,
    pub cache: CacheConfig,
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Number of most recent outcomes kept in the sliding window.
    pub sliding_window_size: usize,

    /// Outcomes required before the failure rate is evaluated.
    pub minimum_number_of_calls: usize,

    /// Failure rate (percent) at or above which the breaker opens.
    pub failure_rate_threshold: f64,

    /// Time spent open before trial calls are admitted, in milliseconds.
    pub wait_duration_in_open_state_ms: u64,

    /// Trial calls admitted while half-open.
    pub permitted_calls_in_half_open_state: usize,
}

impl CircuitBreakerConfig {
    pub fn wait_duration(&self) -> Duration {
        Duration::from_millis(self.wait_duration_in_open_state_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            sliding_window_size: 4,
            minimum_number_of_calls: 2,
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state_ms: 10_000,
            permitted_calls_in_half_open_state: 1,
        }
    }
}

/// Result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable caching for this dependency.
    pub enabled: bool,

    /// Entry freshness window in seconds.
    pub ttl_secs: u64,

    /// Maximum number of cached entries.
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 60,
            max_entries: 1000,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall inbound request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
