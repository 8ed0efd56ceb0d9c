//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AggregatorConfig (validated, immutable)
//!     → handed to lifecycle::startup to build every subsystem
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Each upstream dependency gets its own breaker and cache section

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AggregatorConfig;
pub use schema::{
    AggregationConfig, CacheConfig, CircuitBreakerConfig, DependencyConfig, ListenerConfig,
    ObservabilityConfig, TimeoutConfig, UpstreamConfig,
};
