//! Periodic purge of expired cache entries.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time;

use crate::cache::store::ResultCache;

/// Purge `cache` once per TTL until shutdown is signalled.
pub async fn run_sweeper<V>(cache: Arc<ResultCache<V>>, mut shutdown: broadcast::Receiver<()>)
where
    V: Clone + Send + Sync + 'static,
{
    let period = cache.ttl();
    if period.is_zero() {
        return;
    }

    tracing::debug!(cache = cache.name(), period_secs = period.as_secs(), "Cache sweeper starting");

    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(cache = cache.name(), removed, "Purged expired entries");
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!(cache = cache.name(), "Cache sweeper stopping");
                break;
            }
        }
    }
}
