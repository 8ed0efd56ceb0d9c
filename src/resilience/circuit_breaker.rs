//! Circuit breaker for upstream dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: trial calls probe whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure rate >= threshold over the sliding window
//!                (evaluated once minimum_number_of_calls outcomes are buffered)
//! Open → Half-Open: wait duration elapsed, checked on the next allow()
//! Half-Open → Closed: permitted trial calls all succeed (window reset)
//! Half-Open → Open: any trial call fails (wait timer restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, constructed at startup and shared by Arc
//! - Count-based sliding window of the last N outcomes
//! - Ignored outcomes (not-found) never touch the window
//! - All state behind a single mutex so check-and-transition is atomic
//! - Every transition starts a new generation; outcomes of calls admitted in
//!   an earlier generation are discarded

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::domain::Dependency;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

/// Outcome of a single call, as recorded in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
}

/// Ticket for an admitted call, tied to the breaker state it was admitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    generation: u64,
}

/// Point-in-time view of a breaker, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub dependency: &'static str,
    pub state: CircuitState,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    /// Failure rate in percent, absent until the window holds enough calls.
    pub failure_rate: Option<f64>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    generation: u64,
    window: VecDeque<Outcome>,
    opened_at: Option<Instant>,
    half_open_admitted: usize,
    half_open_successes: usize,
}

/// A thread-safe, count-based circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    dependency: Dependency,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker for the given dependency.
    pub fn new(dependency: Dependency, config: CircuitBreakerConfig) -> Self {
        let window_size = config.sliding_window_size.max(1);
        metrics::record_breaker_state(dependency.as_str(), CircuitState::Closed);
        Self {
            dependency,
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                generation: 0,
                window: VecDeque::with_capacity(window_size),
                opened_at: None,
                half_open_admitted: 0,
                half_open_successes: 0,
            }),
        }
    }

    pub fn dependency(&self) -> Dependency {
        self.dependency
    }

    /// Check whether a call may proceed.
    ///
    /// Performs the time-based Open → Half-Open transition. In Half-Open each
    /// `true` consumes one trial slot, which the caller must give back through
    /// `on_success`, `on_failure` or `on_ignored`.
    pub fn allow(&self) -> bool {
        self.try_acquire().is_some()
    }

    /// Like `allow`, but returns an admission to report the outcome against.
    ///
    /// Reports made through `report_*` only count while the breaker is still
    /// in the state the call was admitted in.
    pub fn try_acquire(&self) -> Option<Admission> {
        let mut inner = self.inner.lock();

        if inner.state == CircuitState::Open {
            let elapsed = inner
                .opened_at
                .map(|at| at.elapsed() >= self.config.wait_duration())
                .unwrap_or(true);
            if elapsed {
                self.transition(&mut inner, CircuitState::HalfOpen);
            }
        }

        let admitted = match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.half_open_admitted < self.config.permitted_calls_in_half_open_state {
                    inner.half_open_admitted += 1;
                    true
                } else {
                    false
                }
            }
        };

        admitted.then_some(Admission {
            generation: inner.generation,
        })
    }

    /// Report a successful call.
    pub fn on_success(&self) {
        self.record(None, Outcome::Success);
    }

    /// Report a failed call.
    pub fn on_failure(&self) {
        self.record(None, Outcome::Failure);
    }

    /// Report a call whose outcome says nothing about dependency health.
    ///
    /// Releases the trial slot when half-open; otherwise a no-op.
    pub fn on_ignored(&self) {
        self.release(None);
    }

    pub fn report_success(&self, admission: Admission) {
        self.record(Some(admission), Outcome::Success);
    }

    pub fn report_failure(&self, admission: Admission) {
        self.record(Some(admission), Outcome::Failure);
    }

    pub fn report_ignored(&self, admission: Admission) {
        self.release(Some(admission));
    }

    /// Current state, without applying time-based transitions.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Snapshot of state and window statistics.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        let failed_calls = failures(&inner.window);
        BreakerSnapshot {
            dependency: self.dependency.as_str(),
            state: inner.state,
            buffered_calls: inner.window.len(),
            failed_calls,
            failure_rate: self.failure_rate(&inner.window),
        }
    }

    /// Force the breaker closed with an empty window.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, CircuitState::Closed);
    }

    /// Force the breaker open, starting the wait timer now.
    pub fn transition_to_open(&self) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, CircuitState::Open);
    }

    /// Force the breaker half-open.
    pub fn transition_to_half_open(&self) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, CircuitState::HalfOpen);
    }

    fn release(&self, admitted: Option<Admission>) {
        let mut inner = self.inner.lock();
        if is_stale(&inner, admitted) {
            return;
        }
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_admitted = inner.half_open_admitted.saturating_sub(1);
        }
    }

    fn record(&self, admitted: Option<Admission>, outcome: Outcome) {
        let mut inner = self.inner.lock();

        if is_stale(&inner, admitted) {
            tracing::debug!(
                dependency = %self.dependency,
                outcome = ?outcome,
                "Discarding outcome of a call admitted before the last state change"
            );
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                let capacity = self.config.sliding_window_size.max(1);
                if inner.window.len() == capacity {
                    inner.window.pop_front();
                }
                inner.window.push_back(outcome);

                if let Some(rate) = self.failure_rate(&inner.window) {
                    if rate >= self.config.failure_rate_threshold {
                        tracing::warn!(
                            dependency = %self.dependency,
                            failure_rate = rate,
                            threshold = self.config.failure_rate_threshold,
                            "Failure rate threshold reached"
                        );
                        self.transition(&mut inner, CircuitState::Open);
                    }
                }
            }
            CircuitState::HalfOpen => match outcome {
                Outcome::Failure => {
                    tracing::warn!(dependency = %self.dependency, "Trial call failed");
                    self.transition(&mut inner, CircuitState::Open);
                }
                Outcome::Success => {
                    inner.half_open_successes += 1;
                    if inner.half_open_successes >= self.config.permitted_calls_in_half_open_state {
                        self.transition(&mut inner, CircuitState::Closed);
                    }
                }
            },
            CircuitState::Open => {
                tracing::debug!(
                    dependency = %self.dependency,
                    outcome = ?outcome,
                    "Discarding outcome reported while open"
                );
            }
        }
    }

    fn failure_rate(&self, window: &VecDeque<Outcome>) -> Option<f64> {
        let required = self
            .config
            .minimum_number_of_calls
            .min(self.config.sliding_window_size)
            .max(1);
        if window.len() < required {
            return None;
        }
        Some(failures(window) as f64 * 100.0 / window.len() as f64)
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;

        inner.state = to;
        inner.generation = inner.generation.wrapping_add(1);
        inner.half_open_admitted = 0;
        inner.half_open_successes = 0;
        match to {
            CircuitState::Closed => {
                inner.window.clear();
                inner.opened_at = None;
            }
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {}
        }

        if from != to {
            tracing::info!(
                dependency = %self.dependency,
                from = from.as_str(),
                to = to.as_str(),
                "Circuit breaker state change"
            );
        }
        metrics::record_breaker_state(self.dependency.as_str(), to);
    }
}

fn is_stale(inner: &BreakerInner, admitted: Option<Admission>) -> bool {
    admitted.is_some_and(|a| a.generation != inner.generation)
}

fn failures(window: &VecDeque<Outcome>) -> usize {
    window.iter().filter(|o| **o == Outcome::Failure).count()
}
