//! Per-provider consecutive-failure gate.
//!
//! A provider is available exactly when `open_until_ms` is not in the
//! future. Any success closes the breaker immediately and unconditionally;
//! there is no half-open probe state. Once the cooldown elapses the provider
//! is simply available again, and a renewed failure streak reopens it.

use crate::clock::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct BreakerState {
    pub failures: u32,
    /// Zero means closed.
    pub open_until_ms: u64,
}

pub struct BreakerRegistry {
    failure_threshold: u32,
    cooldown_ms: u64,
    states: BTreeMap<String, BreakerState>,
    clock: Arc<dyn Clock>,
}

impl BreakerRegistry {
    pub fn new(failure_threshold: u32, cooldown_ms: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown_ms,
            states: BTreeMap::new(),
            clock,
        }
    }

    /// Providers never observed are available by default.
    pub fn is_available(&self, provider: &str) -> bool {
        match self.states.get(provider) {
            Some(s) => self.clock.now_ms() >= s.open_until_ms,
            None => true,
        }
    }

    pub fn record_success(&mut self, provider: &str) {
        let s = self.states.entry(provider.to_string()).or_default();
        s.failures = 0;
        s.open_until_ms = 0;
    }

    pub fn record_failure(&mut self, provider: &str) {
        let now = self.clock.now_ms();
        let threshold = self.failure_threshold;
        let cooldown = self.cooldown_ms;
        let s = self.states.entry(provider.to_string()).or_default();
        s.failures = s.failures.saturating_add(1);
        // The counter is not reset on opening; it keeps growing until a
        // success closes the breaker.
        if s.failures >= threshold {
            s.open_until_ms = now.saturating_add(cooldown);
        }
    }

    pub fn state(&self, provider: &str) -> BreakerState {
        self.states.get(provider).copied().unwrap_or_default()
    }
}
