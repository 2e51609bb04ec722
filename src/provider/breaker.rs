//! Circuit breaker for the upstream provider.
//!
//! Classic three-state breaker evaluated over a count-based sliding window
//! of call outcomes. Closed admits everything and trips once the window
//! holds enough calls with a failure rate at or above the threshold; Open
//! fails fast until the wait window elapses; HalfOpen admits a fixed probe
//! quota — one probe failure reopens, a full quota of successes closes.
//!
//! State is owned by the client that created the breaker; there is no
//! process-global registry. Lock scope is a few comparisons, never held
//! across an await.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Breaker thresholds.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Sliding window size, in call outcomes.
    pub window: usize,
    /// Failure percentage that trips the breaker.
    pub failure_rate_threshold_pct: u8,
    /// Minimum outcomes in the window before the rate is evaluated.
    pub min_calls: usize,
    /// How long an open breaker waits before admitting probes.
    pub open_wait: Duration,
    /// Probe calls admitted in the half-open state.
    pub half_open_probes: u32,
}

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    /// Recent outcomes, `true` = failure. Bounded to the window size.
    outcomes: VecDeque<bool>,
    opened_at: Option<Instant>,
    probes_admitted: u32,
    probe_successes: u32,
}

/// Count-based sliding-window circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
    transitions: AtomicU64,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub fn new(name: &'static str, config: BreakerConfig) -> Self {
        tracing::info!(
            component = name,
            window = config.window,
            threshold_pct = config.failure_rate_threshold_pct,
            min_calls = config.min_calls,
            open_wait_ms = config.open_wait.as_millis() as u64,
            "circuit breaker initialized"
        );
        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                outcomes: VecDeque::new(),
                opened_at: None,
                probes_admitted: 0,
                probe_successes: 0,
            }),
            transitions: AtomicU64::new(0),
        }
    }

    /// Asks permission for one call, handling the Open → HalfOpen
    /// transition when the wait window has elapsed. Returns `false` when
    /// the caller must fail fast.
    pub fn try_acquire(&self) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return true;
        };
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.open_wait);
                if elapsed {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.probes_admitted = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.probes_admitted < self.config.half_open_probes {
                    inner.probes_admitted += 1;
                    true
                } else if inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.open_wait)
                {
                    // The probe quota was consumed by calls whose outcome
                    // never came back (cancelled mid-flight). Admit a fresh
                    // quota instead of staying wedged half-open.
                    inner.opened_at = Some(Instant::now());
                    inner.probes_admitted = 1;
                    inner.probe_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Records a successful call.
    pub fn record_success(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        match inner.state {
            CircuitState::Closed => self.push_outcome(&mut inner, false),
            CircuitState::HalfOpen => {
                inner.probe_successes += 1;
                if inner.probe_successes >= self.config.half_open_probes {
                    self.transition(&mut inner, CircuitState::Closed);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed call.
    pub fn record_failure(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        match inner.state {
            CircuitState::Closed => {
                self.push_outcome(&mut inner, true);
                if self.should_trip(&inner) {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            // One probe failure reopens immediately.
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open),
            CircuitState::Open => {}
        }
    }

    /// Current state, for health reporting.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(CircuitState::Open)
    }

    /// Total state transitions since startup.
    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }

    fn push_outcome(&self, inner: &mut BreakerInner, failed: bool) {
        inner.outcomes.push_back(failed);
        while inner.outcomes.len() > self.config.window {
            inner.outcomes.pop_front();
        }
    }

    fn should_trip(&self, inner: &BreakerInner) -> bool {
        let total = inner.outcomes.len();
        if total < self.config.min_calls {
            return false;
        }
        let failures = inner.outcomes.iter().filter(|failed| **failed).count();
        failures * 100 >= usize::from(self.config.failure_rate_threshold_pct) * total
    }

    fn transition(&self, inner: &mut BreakerInner, next: CircuitState) {
        let prev = inner.state;
        if prev == next {
            return;
        }
        inner.state = next;
        self.transitions.fetch_add(1, Ordering::Relaxed);
        match next {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                inner.probes_admitted = 0;
                inner.probe_successes = 0;
                tracing::warn!(
                    component = self.name,
                    wait_ms = self.config.open_wait.as_millis() as u64,
                    "circuit breaker opened, failing fast"
                );
            }
            CircuitState::HalfOpen => {
                // Reused as the half-open entry time for probe re-admission.
                inner.opened_at = Some(Instant::now());
                inner.probes_admitted = 0;
                inner.probe_successes = 0;
                tracing::info!(
                    component = self.name,
                    probes = self.config.half_open_probes,
                    "circuit breaker half-open, testing recovery"
                );
            }
            CircuitState::Closed => {
                inner.outcomes.clear();
                inner.opened_at = None;
                tracing::info!(component = self.name, "circuit breaker closed, recovered");
            }
        }
    }
}
