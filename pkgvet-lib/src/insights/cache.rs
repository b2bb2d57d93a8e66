use crate::models::{Insight, PackageId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

const LOG_TARGET: &str = "insights";

/// Per-run cache of enrichment outcomes, keyed by package identity.
///
/// The cache is single-flight: concurrent lookups for the same key share one
/// fetch, and later lookups return the cached outcome without touching the
/// network. `None` is a valid cached outcome, meaning "no insight available"
/// (404 or a non-fatal enrichment failure); it is cached like any other so a
/// key never triggers a second fetch within a run.
#[derive(Debug, Default)]
pub struct InsightCache {
    entries: Mutex<HashMap<PackageId, Arc<OnceCell<Option<Arc<Insight>>>>>>,
}

impl InsightCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys that have been looked up.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock not poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached outcome for `id`, running `fetch` to produce it if
    /// this is the first lookup. Concurrent callers for the same key wait on
    /// the first caller's fetch.
    pub async fn get_or_fetch<F, Fut>(&self, id: &PackageId, fetch: F) -> Option<Arc<Insight>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<Arc<Insight>>>,
    {
        let cell = {
            let mut entries = self.entries.lock().expect("lock not poisoned");
            Arc::clone(entries.entry(id.clone()).or_default())
        };

        if let Some(cached) = cell.get() {
            log::debug!(target: LOG_TARGET, "cache hit for {id}");
            return cached.clone();
        }

        cell.get_or_init(fetch).await.clone()
    }
}
