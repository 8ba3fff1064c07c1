//! The catalog read boundary, with retry on transient errors.
//!
//! Everything else in the crate is a pure computation over in-memory
//! rasters; only catalog reads go through here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::catalog::{AssetCatalog, AssetFilter, CollectionKind};
use crate::config::TcorrConfig;
use crate::error::Result;
use crate::types::TcorrAsset;

/// Bounded retry with quadratic backoff: the delay after attempt `n` is
/// `n² × base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 9,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &TcorrConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            base_delay: config.retry_base_delay(),
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_mul(attempt))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or
    /// runs out of attempts.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    debug!(
                        what,
                        error = %e,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(what, error = %e, attempts = attempt, "Giving up after retries");
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Catalog access through a retry policy.
#[derive(Clone)]
pub struct Evaluator {
    catalog: Arc<dyn AssetCatalog>,
    retry: RetryPolicy,
}

impl Evaluator {
    pub fn new(catalog: Arc<dyn AssetCatalog>, retry: RetryPolicy) -> Self {
        Self { catalog, retry }
    }

    pub fn catalog(&self) -> &Arc<dyn AssetCatalog> {
        &self.catalog
    }

    /// Query a collection, retrying transient failures.
    pub async fn query(&self, collection: CollectionKind, filter: &AssetFilter) -> Result<Vec<TcorrAsset>> {
        let what = format!("query {}", collection);
        self.retry
            .run(&what, || self.catalog.query(collection, filter))
            .await
    }

    /// First asset of a collection matching `filter`, if any.
    pub async fn first(&self, collection: CollectionKind, filter: &AssetFilter) -> Result<Option<TcorrAsset>> {
        Ok(self.query(collection, filter).await?.into_iter().next())
    }
}
