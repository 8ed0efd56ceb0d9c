//! Circuit breaker layer around a lookup.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{Lookup, UpstreamError, UpstreamResult};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{Admission, CircuitBreaker};

/// Wraps a lookup so every call is admitted and classified by a breaker.
pub struct BreakerLookup<L> {
    inner: L,
    breaker: Arc<CircuitBreaker>,
}

impl<L> BreakerLookup<L> {
    pub fn new(inner: L, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

#[async_trait]
impl<L> Lookup for BreakerLookup<L>
where
    L: Lookup,
{
    type Value = L::Value;

    async fn fetch(&self, id: &str) -> UpstreamResult<Self::Value> {
        let dependency = self.breaker.dependency();

        let Some(admission) = self.breaker.try_acquire() else {
            tracing::debug!(dependency = %dependency, id, "Call rejected by open circuit");
            metrics::record_breaker_rejection(dependency.as_str());
            return Err(UpstreamError::CallNotPermitted(dependency));
        };

        let permit = CallPermit::new(&self.breaker, admission);
        let result = self.inner.fetch(id).await;
        match &result {
            Ok(_) => permit.success(),
            Err(e) if e.is_dependency_failure() => permit.failure(),
            Err(_) => permit.ignore(),
        }
        result
    }
}

/// An admitted call that has not reported its outcome yet.
///
/// Dropping it unreported (the call was cancelled) releases the slot as an
/// ignored outcome, so a cancelled trial call cannot wedge half-open.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    reported: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, admission: Admission) -> Self {
        Self {
            breaker,
            admission,
            reported: false,
        }
    }

    fn success(mut self) {
        self.reported = true;
        self.breaker.report_success(self.admission);
    }

    fn failure(mut self) {
        self.reported = true;
        self.breaker.report_failure(self.admission);
    }

    fn ignore(mut self) {
        self.reported = true;
        self.breaker.report_ignored(self.admission);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.reported {
            self.breaker.report_ignored(self.admission);
        }
    }
}
