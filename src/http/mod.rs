//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (correlation ID, request span)
//!     → aggregation service
//!     → response.rs (product JSON or mapped error status)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeCorrelationId, X_CORRELATION_ID};
pub use response::{ApiError, ProductResponse};
pub use server::{AppState, HttpServer};
