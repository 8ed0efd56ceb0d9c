//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds within bounds)
//! - Check addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AggregatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::{AggregatorConfig, CacheConfig, CircuitBreakerConfig};

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &AggregatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("upstream.base_url", e.to_string())),
    }

    if config.upstream.timeout_ms == 0 {
        errors.push(ValidationError::new("upstream.timeout_ms", "must be greater than 0"));
    }

    if config.aggregation.max_concurrency == 0 {
        errors.push(ValidationError::new(
            "aggregation.max_concurrency",
            "must be at least 1",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    validate_breaker("similar_ids.circuit_breaker", &config.similar_ids.circuit_breaker, &mut errors);
    validate_breaker(
        "product_detail.circuit_breaker",
        &config.product_detail.circuit_breaker,
        &mut errors,
    );
    validate_cache("similar_ids.cache", &config.similar_ids.cache, &mut errors);
    validate_cache("product_detail.cache", &config.product_detail.cache, &mut errors);

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected 'pretty' or 'json', got '{}'", other),
        )),
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_breaker(prefix: &str, breaker: &CircuitBreakerConfig, errors: &mut Vec<ValidationError>) {
    if breaker.sliding_window_size == 0 {
        errors.push(ValidationError::new(
            format!("{}.sliding_window_size", prefix),
            "must be at least 1",
        ));
    }
    if breaker.minimum_number_of_calls == 0 {
        errors.push(ValidationError::new(
            format!("{}.minimum_number_of_calls", prefix),
            "must be at least 1",
        ));
    }
    if !(breaker.failure_rate_threshold > 0.0 && breaker.failure_rate_threshold <= 100.0) {
        errors.push(ValidationError::new(
            format!("{}.failure_rate_threshold", prefix),
            "must be within (0, 100]",
        ));
    }
    if breaker.wait_duration_in_open_state_ms == 0 {
        errors.push(ValidationError::new(
            format!("{}.wait_duration_in_open_state_ms", prefix),
            "must be greater than 0",
        ));
    }
    if breaker.permitted_calls_in_half_open_state == 0 {
        errors.push(ValidationError::new(
            format!("{}.permitted_calls_in_half_open_state", prefix),
            "must be at least 1",
        ));
    }
}

fn validate_cache(prefix: &str, cache: &CacheConfig, errors: &mut Vec<ValidationError>) {
    if !cache.enabled {
        return;
    }
    if cache.ttl_secs == 0 {
        errors.push(ValidationError::new(format!("{}.ttl_secs", prefix), "must be greater than 0"));
    }
    if cache.max_entries == 0 {
        errors.push(ValidationError::new(format!("{}.max_entries", prefix), "must be at least 1"));
    }
}
