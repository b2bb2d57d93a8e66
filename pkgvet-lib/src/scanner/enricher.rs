//! Package enrichment against the insights API.

use crate::insights::{ApiOutcome, Client, InsightCache, Throttler};
use crate::models::{Insight, Package, PackageId};
use core::time::Duration;
use rand::Rng;
use std::sync::Arc;

const LOG_TARGET: &str = "  enricher";

/// Retry attempts for transient failures (including the original request).
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between retries.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Upper bound of the random jitter added to each backoff delay.
const RETRY_JITTER_MS: u64 = 250;

/// Pause applied on 429 responses that carry no `Retry-After` header.
const DEFAULT_RATE_LIMIT_PAUSE: Duration = Duration::from_secs(5);

/// Attaches insights to packages, with caching, retry, and rate control.
///
/// Enrichment never fails the scan: any terminal failure leaves the package
/// without an insight and the pipeline proceeds.
pub struct Enricher {
    client: Client,
    cache: InsightCache,
    throttler: Arc<Throttler>,
}

impl Enricher {
    #[must_use]
    pub fn new(client: Client, max_concurrency: usize, requests_per_second: u32) -> Self {
        Self {
            client,
            cache: InsightCache::new(),
            throttler: Throttler::new(max_concurrency, requests_per_second),
        }
    }

    /// The throttler that gates outbound requests; the scanner acquires a
    /// permit from it per package before dispatching a worker.
    #[must_use]
    pub fn throttler(&self) -> &Arc<Throttler> {
        &self.throttler
    }

    /// Enrich one package, consulting the per-run cache first.
    ///
    /// Concurrent enrichments of the same `(ecosystem, name, version)`
    /// coalesce into one outbound fetch; whatever it resolves to is reused
    /// for the rest of the run.
    pub async fn enrich(&self, package: Package) -> Package {
        let id = package.id().clone();
        let insight = self.cache.get_or_fetch(&id, || self.fetch_with_retry(id.clone())).await;
        package.enriched(insight)
    }

    /// One fetch sequence for a package identity, applying the failure
    /// policy: transient errors retry with backoff, 404 resolves to "no
    /// insight", other client errors are soft failures, and 429 pauses the
    /// shared throttler for the server-requested duration.
    async fn fetch_with_retry(&self, id: PackageId) -> Option<Arc<Insight>> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.client.fetch_insight(&id).await {
                ApiOutcome::Success(insight) => {
                    log::debug!(target: LOG_TARGET, "enriched {id}");
                    return Some(Arc::new(insight));
                }

                ApiOutcome::NoInsight => {
                    log::debug!(target: LOG_TARGET, "no insight available for {id}");
                    return None;
                }

                ApiOutcome::Failed(e) => {
                    log::warn!(target: LOG_TARGET, "enrichment failed for {id}: {e:#}");
                    return None;
                }

                ApiOutcome::RateLimited(retry_after) => {
                    if attempt >= MAX_ATTEMPTS {
                        log::warn!(target: LOG_TARGET, "giving up on {id}: still rate limited after {attempt} attempts");
                        return None;
                    }

                    let pause = retry_after.map_or(DEFAULT_RATE_LIMIT_PAUSE, Duration::from_secs);
                    log::info!(target: LOG_TARGET, "rate limited; pausing enrichment for {}s", pause.as_secs());
                    let _ = self.throttler.pause_for(pause);
                    tokio::time::sleep(pause).await;
                }

                ApiOutcome::Retryable(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        log::warn!(target: LOG_TARGET, "giving up on {id} after {attempt} attempts: {e:#}");
                        return None;
                    }

                    let delay = backoff_delay(attempt);
                    log::debug!(target: LOG_TARGET, "retrying {id} in {}ms: {e:#}", delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Exponential backoff with jitter: `base * 2^(attempt-1) + rand(0..jitter)`.
fn backoff_delay(attempt: u32) -> Duration {
    let exponential = RETRY_BASE_DELAY * 2_u32.saturating_pow(attempt.saturating_sub(1));
    let jitter = rand::thread_rng().gen_range(0..RETRY_JITTER_MS);
    exponential + Duration::from_millis(jitter)
}
