//! Network clients for the similar-ids and product-detail services.

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;
use crate::domain::{Dependency, Lookup, Product, UpstreamError, UpstreamResult};
use crate::observability::metrics;
use crate::resilience::with_timeout;

/// Failures while building the upstream client.
#[derive(Debug, Error)]
pub enum ClientSetupError {
    #[error("invalid upstream base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("upstream base url cannot carry a path: {0}")]
    NotABase(String),
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Shared HTTP transport: one connection pool, one base URL, one deadline.
#[derive(Debug, Clone)]
pub struct UpstreamHttp {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl UpstreamHttp {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ClientSetupError> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientSetupError::NotABase(config.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("similarity-aggregator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, dependency: Dependency, segments: &[&str]) -> UpstreamResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Unexpected {
                dependency,
                message: format!("base url {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON document, bounded by the response timeout.
    async fn get_json<T>(
        &self,
        dependency: Dependency,
        id: &str,
        segments: &[&str],
    ) -> UpstreamResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(dependency, segments)?;
        let target = url.to_string();
        let start = Instant::now();

        let result = with_timeout(dependency, self.timeout, self.exchange(dependency, id, url)).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::record_upstream_call(dependency.as_str(), outcome, start);
        tracing::debug!(
            dependency = %dependency,
            method = "GET",
            url = %target,
            outcome,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upstream call finished"
        );

        result
    }

    async fn exchange<T>(&self, dependency: Dependency, id: &str, url: Url) -> UpstreamResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(dependency, e))?;

        let status = response.status();
        tracing::trace!(dependency = %dependency, id, status = status.as_u16(), "Upstream responded");
        if status == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(UpstreamError::Unexpected {
                dependency,
                message: format!("upstream responded with status {}", status.as_u16()),
            });
        }

        response.json::<T>().await.map_err(|e| UpstreamError::Unexpected {
            dependency,
            message: format!("undecodable response body: {}", e),
        })
    }

    fn classify(&self, dependency: Dependency, error: reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            UpstreamError::Timeout {
                dependency,
                timeout: self.timeout,
            }
        } else if error.is_decode() {
            UpstreamError::Unexpected {
                dependency,
                message: error.to_string(),
            }
        } else {
            UpstreamError::Transport {
                dependency,
                message: error.to_string(),
            }
        }
    }
}

/// An identifier as the similar-ids service may encode it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Product detail document as served upstream.
#[derive(Debug, Deserialize)]
struct ProductDetailResponse {
    id: String,
    name: String,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    #[serde(alias = "available")]
    availability: bool,
}

impl ProductDetailResponse {
    fn into_product(self, dependency: Dependency) -> UpstreamResult<Product> {
        Product::new(self.id, self.name, self.price, self.availability).map_err(|e| {
            UpstreamError::Unexpected {
                dependency,
                message: format!("invalid product payload: {}", e),
            }
        })
    }
}

/// `GET {base}/product/{id}/similarids`
#[derive(Debug, Clone)]
pub struct HttpSimilarIdsLookup {
    http: Arc<UpstreamHttp>,
}

impl HttpSimilarIdsLookup {
    pub fn new(http: Arc<UpstreamHttp>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Lookup for HttpSimilarIdsLookup {
    type Value = Vec<String>;

    async fn fetch(&self, id: &str) -> UpstreamResult<Vec<String>> {
        let raw: Vec<RawId> = self
            .http
            .get_json(Dependency::SimilarIds, id, &["product", id, "similarids"])
            .await?;
        Ok(raw.into_iter().map(String::from).collect())
    }
}

/// `GET {base}/product/{id}`
#[derive(Debug, Clone)]
pub struct HttpProductDetailLookup {
    http: Arc<UpstreamHttp>,
}

impl HttpProductDetailLookup {
    pub fn new(http: Arc<UpstreamHttp>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Lookup for HttpProductDetailLookup {
    type Value = Product;

    async fn fetch(&self, id: &str) -> UpstreamResult<Product> {
        let response: ProductDetailResponse = self
            .http
            .get_json(Dependency::ProductDetail, id, &["product", id])
            .await?;
        response.into_product(Dependency::ProductDetail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode as AxumStatus, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::net::SocketAddr;

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn http(addr: SocketAddr, timeout_ms: u64) -> Arc<UpstreamHttp> {
        let config = UpstreamConfig {
            base_url: format!("http://{}", addr),
            timeout_ms,
        };
        Arc::new(UpstreamHttp::new(&config).unwrap())
    }

    fn mock_router() -> Router {
        Router::new()
            .route(
                "/product/{id}/similarids",
                get(|Path(id): Path<String>| async move {
                    match id.as_str() {
                        "1" => (AxumStatus::OK, Json(json!(["2", "3", "4"]))),
                        "numeric" => (AxumStatus::OK, Json(json!([2, 3]))),
                        "broken" => (AxumStatus::INTERNAL_SERVER_ERROR, Json(Value::Null)),
                        _ => (AxumStatus::NOT_FOUND, Json(Value::Null)),
                    }
                }),
            )
            .route(
                "/product/{id}",
                get(|Path(id): Path<String>| async move {
                    match id.as_str() {
                        "2" => (
                            AxumStatus::OK,
                            Json(json!({"id": "2", "name": "Dress", "price": 19.99, "availability": true})),
                        ),
                        "legacy" => (
                            AxumStatus::OK,
                            Json(json!({"id": "legacy", "name": "Boots", "price": 39.5, "available": false})),
                        ),
                        "nameless" => (
                            AxumStatus::OK,
                            Json(json!({"id": "nameless", "name": "", "price": 1.0, "availability": true})),
                        ),
                        "garbled" => (AxumStatus::OK, Json(json!({"unexpected": true}))),
                        "a b" => (
                            AxumStatus::OK,
                            Json(json!({"id": "a b", "name": "Spaced", "price": 1, "availability": true})),
                        ),
                        "slow" => {
                            tokio::time::sleep(Duration::from_secs(2)).await;
                            (AxumStatus::OK, Json(Value::Null))
                        }
                        _ => (AxumStatus::NOT_FOUND, Json(Value::Null)),
                    }
                }),
            )
    }

    #[tokio::test]
    async fn test_fetch_similar_ids() {
        let addr = serve(mock_router()).await;
        let lookup = HttpSimilarIdsLookup::new(http(addr, 1000));

        assert_eq!(lookup.fetch("1").await.unwrap(), vec!["2", "3", "4"]);
        assert_eq!(lookup.fetch("numeric").await.unwrap(), vec!["2", "3"]);
    }

    #[tokio::test]
    async fn test_similar_ids_not_found() {
        let addr = serve(mock_router()).await;
        let lookup = HttpSimilarIdsLookup::new(http(addr, 1000));

        assert_eq!(
            lookup.fetch("missing").await,
            Err(UpstreamError::NotFound("missing".into()))
        );
    }

    #[tokio::test]
    async fn test_server_error_is_unexpected() {
        let addr = serve(mock_router()).await;
        let lookup = HttpSimilarIdsLookup::new(http(addr, 1000));

        let err = lookup.fetch("broken").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unexpected { .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_fetch_product_detail() {
        let addr = serve(mock_router()).await;
        let lookup = HttpProductDetailLookup::new(http(addr, 1000));

        let product = lookup.fetch("2").await.unwrap();
        assert_eq!(product.id(), "2");
        assert_eq!(product.name(), "Dress");
        assert_eq!(product.price(), Decimal::new(1999, 2));
        assert!(product.available());
    }

    #[tokio::test]
    async fn test_available_field_alias() {
        let addr = serve(mock_router()).await;
        let lookup = HttpProductDetailLookup::new(http(addr, 1000));

        let product = lookup.fetch("legacy").await.unwrap();
        assert!(!product.available());
    }

    #[tokio::test]
    async fn test_invalid_payloads_are_unexpected() {
        let addr = serve(mock_router()).await;
        let lookup = HttpProductDetailLookup::new(http(addr, 1000));

        assert!(matches!(
            lookup.fetch("nameless").await,
            Err(UpstreamError::Unexpected { .. })
        ));
        assert!(matches!(
            lookup.fetch("garbled").await,
            Err(UpstreamError::Unexpected { .. })
        ));
    }

    #[tokio::test]
    async fn test_path_segment_encoded() {
        let addr = serve(mock_router()).await;
        let lookup = HttpProductDetailLookup::new(http(addr, 1000));

        assert_eq!(lookup.fetch("a b").await.unwrap().name(), "Spaced");
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let addr = serve(mock_router()).await;
        let lookup = HttpProductDetailLookup::new(http(addr, 100));

        let err = lookup.fetch("slow").await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Timeout {
                dependency: Dependency::ProductDetail,
                timeout: Duration::from_millis(100),
            }
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let lookup = HttpSimilarIdsLookup::new(http(addr, 1000));
        assert!(matches!(
            lookup.fetch("1").await,
            Err(UpstreamError::Transport { .. })
        ));
    }

    #[test]
    fn test_rejects_non_base_url() {
        let config = UpstreamConfig {
            base_url: "mailto:ops@example.com".into(),
            timeout_ms: 1000,
        };
        assert!(matches!(
            UpstreamHttp::new(&config),
            Err(ClientSetupError::NotABase(_))
        ));
    }
}
