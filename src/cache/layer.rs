//! Cache layer around a lookup.

use async_trait::async_trait;
use std::sync::Arc;

use crate::cache::store::ResultCache;
use crate::domain::{Lookup, UpstreamResult};

/// Serves fresh cached values and stores successful results of `inner`.
///
/// Errors (including not-found) are never cached.
pub struct CachedLookup<L>
where
    L: Lookup,
{
    inner: L,
    cache: Arc<ResultCache<L::Value>>,
}

impl<L> CachedLookup<L>
where
    L: Lookup,
    L::Value: Clone,
{
    pub fn new(inner: L, cache: Arc<ResultCache<L::Value>>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<ResultCache<L::Value>> {
        &self.cache
    }
}

#[async_trait]
impl<L> Lookup for CachedLookup<L>
where
    L: Lookup,
    L::Value: Clone + Sync,
{
    type Value = L::Value;

    async fn fetch(&self, id: &str) -> UpstreamResult<Self::Value> {
        if let Some(value) = self.cache.get(id) {
            tracing::debug!(cache = self.cache.name(), id, "Cache hit");
            return Ok(value);
        }

        let value = self.inner.fetch(id).await?;
        self.cache.put(id, value.clone());
        Ok(value)
    }
}
