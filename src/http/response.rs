//! Response shaping.
//!
//! # Responsibilities
//! - Serialize products in the public wire shape
//! - Map propagated upstream errors to HTTP status codes
//!
//! # Design Decisions
//! - Not found → 404, open breaker → 503, timeout → 504, anything else → 500
//! - Error bodies are `{"error": "..."}` JSON

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use crate::domain::{Product, UpstreamError};

/// Public JSON shape of a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub available: bool,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id().to_string(),
            name: product.name().to_string(),
            price: product.price(),
            available: product.available(),
        }
    }
}

/// An error leaving the HTTP boundary.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<UpstreamError> for ApiError {
    fn from(error: UpstreamError) -> Self {
        let status = match &error {
            UpstreamError::NotFound(_) => StatusCode::NOT_FOUND,
            UpstreamError::CallNotPermitted(_) => StatusCode::SERVICE_UNAVAILABLE,
            UpstreamError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            UpstreamError::Transport { .. } | UpstreamError::Unexpected { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::NOT_FOUND {
            tracing::info!(error = %error, "Product not found");
        } else {
            tracing::error!(error = %error, kind = error.kind(), status = status.as_u16(), "Request failed");
        }

        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
