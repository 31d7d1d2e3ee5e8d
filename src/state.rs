//! Application state management

use std::sync::Arc;

use crate::artifacts::{ArtifactRegistry, ExpiryPolicy, Sweeper};
use crate::config::Config;
use crate::rate_limit::RateLimiter;
use crate::split::RangeExtractor;
use crate::storage::ScratchStorage;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    storage: ScratchStorage,
    registry: ArtifactRegistry,
    rate_limiter: RateLimiter,
    extractor: RangeExtractor,
}

impl AppState {
    /// Build every component from the configuration.
    ///
    /// Does not touch the filesystem; call [`ScratchStorage::prepare`] before
    /// serving requests.
    pub fn new(config: Config) -> Self {
        let storage = ScratchStorage::new(&config.storage);
        let registry = ArtifactRegistry::new(ExpiryPolicy::from_config(&config.lifecycle));
        let rate_limiter = RateLimiter::new(config.lifecycle.rate_limit_window);
        let extractor = RangeExtractor::new(config.split.range_policy)
            .with_timeout(config.split.extract_timeout);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                registry,
                rate_limiter,
                extractor,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn storage(&self) -> &ScratchStorage {
        &self.inner.storage
    }

    /// Get the artifact registry
    pub fn registry(&self) -> &ArtifactRegistry {
        &self.inner.registry
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    pub fn extractor(&self) -> &RangeExtractor {
        &self.inner.extractor
    }

    /// A sweeper over this state's registry, using the configured interval
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(
            self.inner.registry.clone(),
            self.inner.config.lifecycle.sweep_interval,
        )
    }

    /// Delete every remaining artifact.
    ///
    /// Called after the server stops so no temporary file outlives the
    /// process.
    pub async fn shutdown(&self) -> usize {
        tracing::info!("Shutting down application state...");
        self.inner.registry.purge().await
    }
}
