//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use similarity_aggregator::config::AggregatorConfig;
use similarity_aggregator::{Components, HttpServer, Shutdown};

/// A canned upstream reply.
#[derive(Debug, Clone)]
pub struct Stub {
    pub status: u16,
    pub body: Value,
    pub delay: Duration,
}

impl Stub {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Value::Null,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub fn ids(list: &[&str]) -> Stub {
    Stub::ok(json!(list))
}

pub fn product(id: &str, price: f64) -> Stub {
    Stub::ok(json!({
        "id": id,
        "name": format!("Product {}", id),
        "price": price,
        "availability": true,
    }))
}

#[derive(Default)]
struct MockState {
    similar: RwLock<HashMap<String, Stub>>,
    details: RwLock<HashMap<String, Stub>>,
    similar_hits: AtomicUsize,
    detail_hits: RwLock<HashMap<String, usize>>,
}

/// Programmable stand-in for both upstream services. Unknown ids answer 404.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let router = Router::new()
            .route("/product/{id}/similarids", get(similar_ids))
            .route("/product/{id}", get(product_detail))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_similar(&self, id: &str, stub: Stub) -> &Self {
        self.state.similar.write().insert(id.to_string(), stub);
        self
    }

    pub fn set_detail(&self, id: &str, stub: Stub) -> &Self {
        self.state.details.write().insert(id.to_string(), stub);
        self
    }

    pub fn similar_hits(&self) -> usize {
        self.state.similar_hits.load(Ordering::SeqCst)
    }

    pub fn detail_hits(&self, id: &str) -> usize {
        self.state.detail_hits.read().get(id).copied().unwrap_or(0)
    }

    pub fn total_detail_hits(&self) -> usize {
        self.state.detail_hits.read().values().sum()
    }
}

async fn similar_ids(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    state.similar_hits.fetch_add(1, Ordering::SeqCst);
    let stub = state.similar.read().get(&id).cloned();
    reply(stub).await
}

async fn product_detail(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    *state.detail_hits.write().entry(id.clone()).or_insert(0) += 1;
    let stub = state.details.read().get(&id).cloned();
    reply(stub).await
}

async fn reply(stub: Option<Stub>) -> Response {
    let Some(stub) = stub else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }
    let status = StatusCode::from_u16(stub.status).unwrap();
    (status, Json(stub.body)).into_response()
}

/// A running aggregator wired to a mock upstream.
pub struct TestAggregator {
    pub addr: SocketAddr,
    pub components: Arc<Components>,
    pub shutdown: Shutdown,
}

impl TestAggregator {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestAggregator {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Default test configuration pointing at `upstream`.
pub fn test_config(upstream: &MockUpstream) -> AggregatorConfig {
    let mut config = AggregatorConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.base_url = upstream.base_url();
    config.upstream.timeout_ms = 500;
    config
}

pub async fn start_aggregator(config: AggregatorConfig) -> TestAggregator {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).unwrap();
    let components = server.components().clone();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    TestAggregator {
        addr,
        components,
        shutdown,
    }
}
