//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the product and admin handlers
//! - Wire up middleware (correlation ID, tracing, request timeout)
//! - Serve on a bound listener until shutdown is broadcast

use axum::{
    body::Body,
    extract::{Path, State},
    middleware,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::AggregatorConfig;
use crate::http::request::{
    discard_blank_correlation_id, make_request_span, MakeCorrelationId, X_CORRELATION_ID,
};
use crate::http::response::{ApiError, ProductResponse};
use crate::lifecycle::{Components, StartupError};
use crate::observability::metrics;

const SIMILAR_ROUTE: &str = "/product/{product_id}/similar";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub components: Arc<Components>,
}

/// HTTP server for the aggregator.
pub struct HttpServer {
    router: Router,
    config: AggregatorConfig,
    components: Arc<Components>,
}

impl HttpServer {
    /// Create a server with components backed by the configured upstream.
    pub fn new(config: AggregatorConfig) -> Result<Self, StartupError> {
        let components = Arc::new(Components::build(&config)?);
        Ok(Self::with_components(config, components))
    }

    /// Create a server around already-assembled components.
    pub fn with_components(config: AggregatorConfig, components: Arc<Components>) -> Self {
        let state = AppState {
            components: components.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            components,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AggregatorConfig, state: AppState) -> Router {
        Router::new()
            .route(SIMILAR_ROUTE, get(similar_products))
            .with_state(state.clone())
            .merge(setup_admin_router(state))
            .layer(
                ServiceBuilder::new()
                    .layer(middleware::map_request(discard_blank_correlation_id))
                    .layer(SetRequestIdLayer::new(X_CORRELATION_ID, MakeCorrelationId))
                    .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
                    .layer(PropagateRequestIdLayer::new(X_CORRELATION_ID))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn components(&self) -> &Arc<Components> {
        &self.components
    }
}

/// `GET /product/{product_id}/similar`
async fn similar_products(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let start = Instant::now();

    match state.components.service.get_similar(&product_id).await {
        Ok(products) => {
            metrics::record_request(SIMILAR_ROUTE, 200, start);
            tracing::info!(
                product_id = %product_id,
                returned = products.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Similar products served"
            );
            Ok(Json(products.iter().map(ProductResponse::from).collect()))
        }
        Err(e) => {
            let error = ApiError::from(e);
            metrics::record_request(SIMILAR_ROUTE, error.status().as_u16(), start);
            Err(error)
        }
    }
}
