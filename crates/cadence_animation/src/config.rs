//! Controller configuration

use crate::strategy::Strategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default tick period, roughly one display refresh at 60 Hz
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;

/// Construction options for an [`AnimController`](crate::AnimController)
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Tick period in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub strategy: Strategy,
    /// Keep terminated effects queued instead of sweeping them each tick.
    /// Always on for [`Strategy::Loop`].
    #[serde(default)]
    pub suppress_cleanup: bool,
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            strategy: Strategy::default(),
            suppress_cleanup: false,
        }
    }
}

impl ControllerConfig {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    /// Builder: set the tick period in milliseconds
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Builder: set the strategy
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder: keep terminated effects queued
    pub fn with_suppress_cleanup(mut self, suppress: bool) -> Self {
        self.suppress_cleanup = suppress;
        self
    }

    /// Tick period in milliseconds, never zero
    pub fn effective_tick_interval_ms(&self) -> u64 {
        if self.tick_interval_ms == 0 {
            tracing::warn!(
                fallback = DEFAULT_TICK_INTERVAL_MS,
                "tick interval of 0 ms is not usable"
            );
            return DEFAULT_TICK_INTERVAL_MS;
        }
        self.tick_interval_ms
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.effective_tick_interval_ms())
    }

    /// Whether the controller sweeps terminated effects after each tick
    pub fn effective_suppress_cleanup(&self) -> bool {
        self.suppress_cleanup || self.strategy.requires_retention()
    }
}
