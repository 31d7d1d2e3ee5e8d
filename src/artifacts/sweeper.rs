//! Expiry Sweeper
//!
//! Background task that periodically evicts expired artifacts from the
//! registry. It shares the registry handle with the request handlers and
//! goes through the same lock for every mutation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::registry::ArtifactRegistry;

pub struct Sweeper {
    registry: ArtifactRegistry,
    interval: Duration,
}

impl Sweeper {
    pub fn new(registry: ArtifactRegistry, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Run one sweep as of `now`. Returns the number of evictions.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        self.registry.evict_expired(now).await
    }

    /// Start the background loop. Abort the handle to stop it.
    pub fn start(self) -> JoinHandle<()> {
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            "Starting artifact expiry sweeper"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                self.sweep_once(Utc::now()).await;
            }
        })
    }
}
