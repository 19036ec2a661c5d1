//! Circuit breaker for provider throttling.
//!
//! Free-tier price APIs answer over-quota requests with a throttling notice
//! instead of data. After `failure_threshold` consecutive failures the breaker
//! opens and refuses requests until the cooldown has elapsed.

use crate::config::SourceConfig;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests are allowed.
    Closed,
    /// Requests are refused until cooldown expires.
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Threshold and cooldown from the `[source]` config section.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(
            Duration::from_secs(config.breaker_cooldown_secs),
            config.breaker_failure_threshold,
        )
    }

    /// One-minute cooldown after 3 consecutive failures, matching the
    /// per-minute quota window of the daily endpoint.
    pub fn default_provider() -> Self {
        Self::from_config(&SourceConfig::default())
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is two plain fields; a panic mid-update cannot leave it torn.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } if tripped_at.elapsed() >= self.cooldown => {
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                true
            }
            BreakerState::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold {
            inner.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
        }
    }

    /// Open immediately, regardless of the failure count.
    pub fn trip(&self) {
        self.lock().state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
    }

    /// Remaining cooldown time (zero if closed).
    pub fn remaining_cooldown(&self) -> Duration {
        match self.lock().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => self.cooldown.saturating_sub(tripped_at.elapsed()),
        }
    }
}
