//! Reconnection policy and the reconnect delay timer.
//!
//! The policy is plain data: a linear backoff (`base_delay * attempt`)
//! bounded by an attempt ceiling. The timer holds at most one pending
//! reconnect and can be cancelled at any time.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, Sleep};

use cw_core::config::ReconnectConfig;

/// What to do after the transport closed while the widget is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Reconnect after `delay`; `attempt` is the new attempt counter.
    Retry { attempt: u32, delay: Duration },
    /// The ceiling is exhausted; the session closes.
    GiveUp,
}

/// Bounded linear reconnection policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay unit multiplied by the attempt number.
    pub base_delay: Duration,
    /// Maximum number of reconnection attempts.
    pub max_attempts: u32,
    /// Jitter factor (0.0 to 1.0) added on top of each delay.
    pub jitter_factor: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_attempts: config.max_attempts,
            jitter_factor: sanitize_jitter(config.jitter_factor),
        }
    }
}

impl ReconnectPolicy {
    /// Decide the next step given the attempts made so far.
    pub fn decide(&self, attempts_so_far: u32) -> ReconnectDecision {
        if attempts_so_far >= self.max_attempts {
            return ReconnectDecision::GiveUp;
        }
        let attempt = attempts_so_far + 1;
        ReconnectDecision::Retry {
            attempt,
            delay: self.delay_for(attempt),
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    ///
    /// Sequence with the defaults: 3s, 6s, 9s, 12s, 15s. Jitter only ever
    /// adds to the linear value, so the delays keep growing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let linear = self.base_delay.saturating_mul(attempt);
        let factor = sanitize_jitter(self.jitter_factor);
        if factor == 0.0 {
            return linear;
        }
        let jitter = Duration::try_from_secs_f64(linear.as_secs_f64() * rand::random::<f64>() * factor)
            .unwrap_or(Duration::MAX);
        linear.saturating_add(jitter)
    }
}

/// Jitter factor within 0.0..=1.0; NaN and infinities mean no jitter.
fn sanitize_jitter(factor: f64) -> f64 {
    if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// At most one pending reconnect.
#[derive(Debug, Default)]
pub struct ReconnectTimer {
    pending: Option<Pin<Box<Sleep>>>,
}

impl ReconnectTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a reconnect, replacing any pending one.
    pub fn schedule(&mut self, delay: Duration) {
        self.pending = Some(Box::pin(sleep(delay)));
    }

    /// Drop the pending reconnect, if any.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolve when the pending reconnect is due.
    ///
    /// Never resolves while nothing is scheduled. Cancel-safe.
    pub async fn fired(&mut self) {
        match self.pending.as_mut() {
            Some(delay) => {
                delay.as_mut().await;
                self.pending = None;
            }
            None => pending::<()>().await,
        }
    }
}
