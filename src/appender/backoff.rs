//! Exponential backoff state machine used by the dispatcher.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::config::BackoffPolicy;

/// Tracks consecutive connection failures and produces jittered delays.
///
/// The base delay doubles on every failure up to the policy cap and returns
/// to the minimum after any successful connect. Jitter spreads the actual
/// sleep across `[base, 2 * base]` so simultaneously failing instances do not
/// reconnect in lockstep.
pub(crate) struct BackoffState {
    policy: BackoffPolicy,
    current: Duration,
    rng: StdRng,
}

impl BackoffState {
    /// Create a new state machine from the supplied policy.
    pub(crate) fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.min,
            rng: StdRng::from_entropy(),
            policy,
        }
    }

    /// Reset the delay to the policy minimum after a successful connect.
    pub(crate) fn reset(&mut self) {
        self.current = self.policy.min;
    }

    /// Advance the state after a failure, returning the new base delay.
    pub(crate) fn next_delay(&mut self) -> Duration {
        self.current = self.current.saturating_mul(2).min(self.policy.max);
        self.current
    }

    /// Add uniform jitter on top of `base`.
    pub(crate) fn jitter(&mut self, base: Duration) -> Duration {
        let base_ms = base.as_millis().min(u128::from(u64::MAX)) as u64;
        base + Duration::from_millis(self.rng.gen_range(0..=base_ms))
    }
}
