//! Similar-products aggregation service library.

pub mod admin;
pub mod aggregation;
pub mod cache;
pub mod config;
pub mod domain;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod upstream;

pub use aggregation::SimilarProductsService;
pub use config::schema::AggregatorConfig;
pub use domain::{Lookup, Product, UpstreamError};
pub use http::HttpServer;
pub use lifecycle::{Components, Shutdown};
