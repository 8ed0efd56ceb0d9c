//! Collaborator contracts consumed by the orchestrator.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::error::UpstreamResult;
use crate::domain::product::Product;

/// A single asynchronous keyed lookup against an upstream dependency.
///
/// Raw network clients, the circuit breaker layer and the cache layer all
/// implement this, so they compose as `cache(breaker(network))`.
#[async_trait]
pub trait Lookup: Send + Sync {
    type Value: Send + 'static;

    async fn fetch(&self, id: &str) -> UpstreamResult<Self::Value>;
}

/// Ranked similar-identifier lookup.
pub type IdsLookup = dyn Lookup<Value = Vec<String>>;

/// Product detail lookup.
pub type DetailLookup = dyn Lookup<Value = Product>;

#[async_trait]
impl<L> Lookup for Arc<L>
where
    L: Lookup + ?Sized,
{
    type Value = L::Value;

    async fn fetch(&self, id: &str) -> UpstreamResult<Self::Value> {
        (**self).fetch(id).await
    }
}
