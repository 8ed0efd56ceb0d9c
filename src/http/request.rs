//! Request correlation.
//!
//! # Responsibilities
//! - Generate a short correlation ID for requests that arrive without one
//! - Attach the ID to the request span so every log line carries it
//!
//! # Design Decisions
//! - An inbound `X-Correlation-Id` is kept as-is and echoed back
//! - A blank inbound header counts as absent
//! - Generated IDs are the first 8 hex chars of a UUID v4

use axum::extract::Request as AxumRequest;
use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

pub const X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

const CORRELATION_ID_LEN: usize = 8;

/// Generates correlation IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeCorrelationId;

impl MakeRequestId for MakeCorrelationId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = new_correlation_id();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Strip a blank `X-Correlation-Id` so `SetRequestIdLayer` generates one.
pub async fn discard_blank_correlation_id(mut request: AxumRequest) -> AxumRequest {
    let blank = request
        .headers()
        .get(&X_CORRELATION_ID)
        .is_some_and(|v| v.as_bytes().iter().all(u8::is_ascii_whitespace));
    if blank {
        request.headers_mut().remove(&X_CORRELATION_ID);
    }
    request
}

pub fn new_correlation_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(CORRELATION_ID_LEN);
    id
}

/// The request's correlation ID, or `-` when absent or not valid text.
pub fn correlation_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(&X_CORRELATION_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

/// Span for `TraceLayer`, tagged with the correlation ID.
pub fn make_request_span<B>(request: &Request<B>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        correlation_id = %correlation_id(request),
    )
}
