//! Startup orchestration.
//!
//! # Responsibilities
//! - Construct one breaker and (optionally) one cache per dependency
//! - Compose each upstream client as cache(breaker(network))
//! - Start background cache sweepers
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Every shared instance is built here and handed out by Arc

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::aggregation::SimilarProductsService;
use crate::cache::{run_sweeper, CacheSnapshot, CachedLookup, ResultCache};
use crate::config::{AggregatorConfig, CacheConfig, ConfigError};
use crate::domain::{Dependency, Lookup, Product};
use crate::lifecycle::Shutdown;
use crate::resilience::{BreakerLookup, BreakerSnapshot, CircuitBreaker};
use crate::upstream::{ClientSetupError, HttpProductDetailLookup, HttpSimilarIdsLookup, UpstreamHttp};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientSetupError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metrics address {0}")]
    MetricsAddress(String),
}

/// Resilience state of both dependencies, for the admin endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ResilienceStatus {
    pub circuit_breakers: Vec<BreakerSnapshot>,
    pub caches: Vec<CacheSnapshot>,
}

/// Everything the request path needs, wired once at startup.
pub struct Components {
    pub service: SimilarProductsService,
    pub similar_ids_breaker: Arc<CircuitBreaker>,
    pub product_detail_breaker: Arc<CircuitBreaker>,
    pub similar_ids_cache: Option<Arc<ResultCache<Vec<String>>>>,
    pub product_detail_cache: Option<Arc<ResultCache<Product>>>,
}

impl Components {
    /// Build components backed by the real HTTP clients.
    pub fn build(config: &AggregatorConfig) -> Result<Self, StartupError> {
        let http = Arc::new(UpstreamHttp::new(&config.upstream)?);

        tracing::info!(
            base_url = %http.base_url(),
            timeout_ms = config.upstream.timeout_ms,
            "Upstream client ready"
        );

        Ok(Self::assemble(
            HttpSimilarIdsLookup::new(http.clone()),
            HttpProductDetailLookup::new(http),
            config,
        ))
    }

    /// Wrap arbitrary raw lookups in breakers and caches.
    pub fn assemble<I, D>(similar_ids: I, product_detail: D, config: &AggregatorConfig) -> Self
    where
        I: Lookup<Value = Vec<String>> + 'static,
        D: Lookup<Value = Product> + 'static,
    {
        let similar_ids_breaker = Arc::new(CircuitBreaker::new(
            Dependency::SimilarIds,
            config.similar_ids.circuit_breaker.clone(),
        ));
        let product_detail_breaker = Arc::new(CircuitBreaker::new(
            Dependency::ProductDetail,
            config.product_detail.circuit_breaker.clone(),
        ));

        let (ids_lookup, similar_ids_cache) = guard(
            similar_ids,
            similar_ids_breaker.clone(),
            &config.similar_ids.cache,
        );
        let (detail_lookup, product_detail_cache) = guard(
            product_detail,
            product_detail_breaker.clone(),
            &config.product_detail.cache,
        );

        let service = SimilarProductsService::new(ids_lookup, detail_lookup, &config.aggregation);

        Self {
            service,
            similar_ids_breaker,
            product_detail_breaker,
            similar_ids_cache,
            product_detail_cache,
        }
    }

    pub fn resilience_status(&self) -> ResilienceStatus {
        let caches = [
            self.similar_ids_cache.as_ref().map(|c| c.snapshot()),
            self.product_detail_cache.as_ref().map(|c| c.snapshot()),
        ];

        ResilienceStatus {
            circuit_breakers: vec![
                self.similar_ids_breaker.snapshot(),
                self.product_detail_breaker.snapshot(),
            ],
            caches: caches.into_iter().flatten().collect(),
        }
    }

    /// Spawn one expiry sweeper per enabled cache.
    pub fn spawn_cache_sweepers(&self, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        if let Some(cache) = &self.similar_ids_cache {
            handles.push(tokio::spawn(run_sweeper(cache.clone(), shutdown.subscribe())));
        }
        if let Some(cache) = &self.product_detail_cache {
            handles.push(tokio::spawn(run_sweeper(cache.clone(), shutdown.subscribe())));
        }
        handles
    }
}

type Guarded<V> = (Arc<dyn Lookup<Value = V>>, Option<Arc<ResultCache<V>>>);

fn guard<L>(raw: L, breaker: Arc<CircuitBreaker>, cache_config: &CacheConfig) -> Guarded<L::Value>
where
    L: Lookup + 'static,
    L::Value: Clone + Sync,
{
    let name = breaker.dependency().as_str();
    let guarded = BreakerLookup::new(raw, breaker);

    if !cache_config.enabled {
        tracing::info!(dependency = name, "Cache disabled");
        return (Arc::new(guarded), None);
    }

    let cache = Arc::new(ResultCache::from_config(name, cache_config));
    tracing::info!(
        dependency = name,
        ttl_secs = cache_config.ttl_secs,
        max_entries = cache_config.max_entries,
        "Cache enabled"
    );
    (Arc::new(CachedLookup::new(guarded, cache.clone())), Some(cache))
}
