//! Similar-products aggregation.

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;

use crate::config::AggregationConfig;
use crate::domain::{DetailLookup, IdsLookup, Product, UpstreamError, UpstreamResult};
use crate::observability::metrics;

/// Resolves a product's ranked similar ids into hydrated products.
///
/// Both collaborators arrive already wrapped in their cache and breaker
/// layers; the service only sees the `Lookup` contract.
#[derive(Clone)]
pub struct SimilarProductsService {
    similar_ids: Arc<IdsLookup>,
    product_detail: Arc<DetailLookup>,
    max_concurrency: usize,
}

impl SimilarProductsService {
    pub fn new(
        similar_ids: Arc<IdsLookup>,
        product_detail: Arc<DetailLookup>,
        config: &AggregationConfig,
    ) -> Self {
        Self {
            similar_ids,
            product_detail,
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Fetch the products similar to `product_id`, in relevance order.
    ///
    /// Fails only when the similar-ids lookup fails; that error is returned
    /// unchanged. Individual detail failures drop the item from the result.
    /// At most `max_concurrency` detail fetches are in flight at once, and
    /// they start in list order as earlier ones finish.
    pub async fn get_similar(&self, product_id: &str) -> UpstreamResult<Vec<Product>> {
        let ids = self.similar_ids.fetch(product_id).await?;

        tracing::debug!(
            product_id,
            similar_count = ids.len(),
            "Resolved similar ids"
        );

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let requested = ids.len();
        let mut slots: Vec<Option<Product>> = vec![None; requested];

        let mut completed = stream::iter(ids.into_iter().enumerate())
            .map(|(position, id)| async move { (position, self.fetch_or_skip(&id).await) })
            .buffer_unordered(self.max_concurrency);

        while let Some((position, product)) = completed.next().await {
            slots[position] = product;
        }

        let products: Vec<Product> = slots.into_iter().flatten().collect();

        tracing::debug!(
            product_id,
            requested,
            returned = products.len(),
            "Aggregated similar products"
        );

        Ok(products)
    }

    /// Fetch one detail, turning any failure into a skipped slot.
    async fn fetch_or_skip(&self, id: &str) -> Option<Product> {
        match self.product_detail.fetch(id).await {
            Ok(product) => Some(product),
            Err(error) => {
                log_skipped(id, &error);
                metrics::record_skipped_item(error.kind());
                None
            }
        }
    }
}

fn log_skipped(id: &str, error: &UpstreamError) {
    match error {
        UpstreamError::NotFound(_) => {
            tracing::debug!(id, "Similar product not found, skipping");
        }
        _ => {
            tracing::warn!(id, error = %error, kind = error.kind(), "Similar product lookup failed, skipping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dependency, Lookup};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedIds(UpstreamResult<Vec<String>>);

    #[async_trait]
    impl Lookup for FixedIds {
        type Value = Vec<String>;

        async fn fetch(&self, _id: &str) -> UpstreamResult<Vec<String>> {
            self.0.clone()
        }
    }

    #[derive(Clone)]
    enum Reply {
        Found,
        Missing,
        Failing,
    }

    /// Detail double with per-id delay and reply, recording start order and
    /// peak concurrency.
    #[derive(Default)]
    struct ScriptedDetails {
        script: HashMap<String, (Duration, Reply)>,
        started: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedDetails {
        fn with(mut self, id: &str, delay_ms: u64, reply: Reply) -> Self {
            self.script
                .insert(id.to_string(), (Duration::from_millis(delay_ms), reply));
            self
        }

        fn calls(&self) -> usize {
            self.started.lock().len()
        }
    }

    #[async_trait]
    impl Lookup for ScriptedDetails {
        type Value = Product;

        async fn fetch(&self, id: &str) -> UpstreamResult<Product> {
            self.started.lock().push(id.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let (delay, reply) = self
                .script
                .get(id)
                .cloned()
                .unwrap_or((Duration::from_millis(10), Reply::Found));
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match reply {
                Reply::Found => Ok(product(id)),
                Reply::Missing => Err(UpstreamError::NotFound(id.to_string())),
                Reply::Failing => Err(UpstreamError::Transport {
                    dependency: Dependency::ProductDetail,
                    message: "connection reset".into(),
                }),
            }
        }
    }

    fn product(id: &str) -> Product {
        Product::new(id, format!("Product {}", id), Decimal::new(1999, 2), true).unwrap()
    }

    fn ids(list: &[&str]) -> UpstreamResult<Vec<String>> {
        Ok(list.iter().map(|s| s.to_string()).collect())
    }

    fn service(
        similar: UpstreamResult<Vec<String>>,
        details: Arc<ScriptedDetails>,
    ) -> SimilarProductsService {
        SimilarProductsService::new(
            Arc::new(FixedIds(similar)),
            details,
            &AggregationConfig::default(),
        )
    }

    fn returned_ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_follows_list_order_not_completion_order() {
        let details = Arc::new(
            ScriptedDetails::default()
                .with("2", 300, Reply::Found)
                .with("3", 200, Reply::Found)
                .with("4", 100, Reply::Found),
        );
        let products = service(ids(&["2", "3", "4"]), details)
            .get_similar("1")
            .await
            .unwrap();

        assert_eq!(returned_ids(&products), vec!["2", "3", "4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_items_are_dropped() {
        let details = Arc::new(
            ScriptedDetails::default()
                .with("3", 10, Reply::Missing)
                .with("5", 10, Reply::Failing),
        );
        let products = service(ids(&["2", "3", "4", "5", "6"]), details)
            .get_similar("1")
            .await
            .unwrap();

        assert_eq!(returned_ids(&products), vec!["2", "4", "6"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_example() {
        let details = Arc::new(ScriptedDetails::default().with("3", 10, Reply::Missing));
        let products = service(ids(&["2", "3"]), details)
            .get_similar("1")
            .await
            .unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id(), "2");
        assert_eq!(products[0].name(), "Product 2");
        assert_eq!(products[0].price(), Decimal::new(1999, 2));
        assert!(products[0].available());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_items_failing_yields_empty() {
        let details = Arc::new(
            ScriptedDetails::default()
                .with("2", 10, Reply::Failing)
                .with("3", 10, Reply::Missing),
        );
        let products = service(ids(&["2", "3"]), details)
            .get_similar("1")
            .await
            .unwrap();

        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn test_root_not_found_propagates_without_detail_calls() {
        let details = Arc::new(ScriptedDetails::default());
        let result = service(Err(UpstreamError::NotFound("1".into())), details.clone())
            .get_similar("1")
            .await;

        assert_eq!(result, Err(UpstreamError::NotFound("1".into())));
        assert_eq!(details.calls(), 0);
    }

    #[tokio::test]
    async fn test_root_errors_propagate_unchanged() {
        let errors = vec![
            UpstreamError::CallNotPermitted(Dependency::SimilarIds),
            UpstreamError::Timeout {
                dependency: Dependency::SimilarIds,
                timeout: Duration::from_secs(3),
            },
            UpstreamError::Unexpected {
                dependency: Dependency::SimilarIds,
                message: "status 500".into(),
            },
        ];

        for error in errors {
            let details = Arc::new(ScriptedDetails::default());
            let result = service(Err(error.clone()), details.clone())
                .get_similar("1")
                .await;
            assert_eq!(result, Err(error));
            assert_eq!(details.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_empty_list_issues_no_detail_calls() {
        let details = Arc::new(ScriptedDetails::default());
        let products = service(ids(&[]), details.clone())
            .get_similar("1")
            .await
            .unwrap();

        assert!(products.is_empty());
        assert_eq!(details.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_preserved() {
        let details = Arc::new(ScriptedDetails::default());
        let products = service(ids(&["2", "3", "2"]), details)
            .get_similar("1")
            .await
            .unwrap();

        assert_eq!(returned_ids(&products), vec!["2", "3", "2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_bounded_at_ten() {
        let list: Vec<String> = (0..25).map(|i| i.to_string()).collect();
        let details = Arc::new(ScriptedDetails::default());
        let products = service(Ok(list.clone()), details.clone())
            .get_similar("root")
            .await
            .unwrap();

        assert_eq!(products.len(), 25);
        assert_eq!(details.peak.load(Ordering::SeqCst), 10);
        assert_eq!(details.calls(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_start_in_list_order() {
        let list: Vec<String> = (0..25).map(|i| i.to_string()).collect();
        let mut scripted = ScriptedDetails::default();
        for (i, id) in list.iter().enumerate() {
            scripted = scripted.with(id, 10 + (i as u64 * 7) % 50, Reply::Found);
        }
        let details = Arc::new(scripted);
        service(Ok(list.clone()), details.clone())
            .get_similar("root")
            .await
            .unwrap();

        assert_eq!(*details.started.lock(), list);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_item_does_not_hold_back_later_starts() {
        // "0" takes far longer than the rest; the other slots keep cycling.
        let list: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let details = Arc::new(ScriptedDetails::default().with("0", 10_000, Reply::Found));
        let svc = service(Ok(list.clone()), details.clone());

        let handle = tokio::spawn(async move { svc.get_similar("root").await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(details.calls(), 20);
        assert!(!handle.is_finished());

        let products = handle.await.unwrap().unwrap();
        assert_eq!(products.len(), 20);
        assert_eq!(products[0].id(), "0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_concurrency_limit() {
        let list: Vec<String> = (0..8).map(|i| i.to_string()).collect();
        let details = Arc::new(ScriptedDetails::default());
        let svc = SimilarProductsService::new(
            Arc::new(FixedIds(Ok(list))),
            details.clone(),
            &AggregationConfig { max_concurrency: 3 },
        );

        assert_eq!(svc.get_similar("root").await.unwrap().len(), 8);
        assert_eq!(details.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_abandons_in_flight_fetches() {
        let list: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        let mut scripted = ScriptedDetails::default();
        for id in &list {
            scripted = scripted.with(id, 60_000, Reply::Found);
        }
        let details = Arc::new(scripted);
        let svc = service(Ok(list), details.clone());

        let result = tokio::time::timeout(Duration::from_millis(50), svc.get_similar("root")).await;

        assert!(result.is_err());
        assert_eq!(details.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aggregation_runs_on_spawned_task() {
        let details = Arc::new(ScriptedDetails::default().with("3", 10, Reply::Missing));
        let svc = service(ids(&["2", "3", "4"]), details);

        let handle = tokio::spawn(async move { svc.get_similar("1").await });
        let products = handle.await.unwrap().unwrap();

        assert_eq!(returned_ids(&products), vec!["2", "4"]);
    }
}
