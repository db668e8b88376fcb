//! Reconnection strategies.
//!
//! The connection manager asks its policy how long to wait before each retry.
//! `attempt` counts the retries already made since the last successful
//! connection, so it starts at 0 after every success.

use std::fmt::Debug;
use std::time::Duration;

use shared::types::client_config::ReconnectConfig;

pub trait ReconnectPolicy: Send + Sync + Debug {
    /// Delay before the next retry, or `None` to give up.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Retry a bounded number of times with the same delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl FixedDelay {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for FixedDelay {
    fn from(cfg: &ReconnectConfig) -> Self {
        Self::new(cfg.max_attempts, cfg.delay())
    }
}

impl ReconnectPolicy for FixedDelay {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then_some(self.delay)
    }
}

/// Never retry. Useful for one-shot tools and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl ReconnectPolicy for NoRetry {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        None
    }
}
