use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

/// Inclusive bounds, in whole seconds, for one polite pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PauseRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl PauseRange {
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        PauseRange { min_secs, max_secs }
    }
}

#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self, range: PauseRange);
}

/// Sleeps a random number of seconds within the range.
pub struct RandomThrottle;

impl RandomThrottle {
    pub fn pick(range: PauseRange) -> Duration {
        let (lo, hi) = if range.min_secs <= range.max_secs {
            (range.min_secs, range.max_secs)
        } else {
            (range.max_secs, range.min_secs)
        };
        Duration::from_secs(rand::thread_rng().gen_range(lo..=hi))
    }
}

#[async_trait]
impl Throttle for RandomThrottle {
    async fn pause(&self, range: PauseRange) {
        let wait = Self::pick(range);
        debug!("Sleeping {}s", wait.as_secs());
        tokio::time::sleep(wait).await;
    }
}

/// Never waits.
#[cfg(test)]
pub struct NoThrottle;

#[cfg(test)]
#[async_trait]
impl Throttle for NoThrottle {
    async fn pause(&self, _range: PauseRange) {}
}
