//! The pipeline driver.

use super::{CancelToken, Enricher, VerdictTracker};
use crate::Result;
use crate::analyzers::{Analyzer, AnalyzerContext, FilterMatchEvent, FinishContext};
use crate::models::{Manifest, Package};
use crate::readers::{PackageReader, ReaderControl};
use crate::reporters::{Reporter, ScanSummary};
use ohno::{IntoAppError, app_err};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const LOG_TARGET: &str = "   scanner";

/// Default bound on concurrent enrichment workers.
pub(crate) const DEFAULT_CONCURRENCY: usize = 10;

/// What a completed (or drained-after-cancel) scan produced.
#[derive(Debug, Clone, Copy)]
pub struct ScanOutcome {
    /// Packages that reached the analyzer chain.
    pub package_count: usize,

    /// Filter-match events delivered to reporters.
    pub match_count: usize,

    /// Whether the scan was cancelled.
    pub cancelled: bool,
}

/// Assembles a [`Scanner`] from its stages.
pub struct ScannerBuilder {
    readers: Vec<Box<dyn PackageReader + Send>>,
    enricher: Option<Arc<Enricher>>,
    analyzers: Vec<Box<dyn Analyzer>>,
    reporters: Vec<Box<dyn Reporter>>,
    verdict: VerdictTracker,
    cancel: CancelToken,
    concurrency: usize,
}

impl Default for ScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScannerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            enricher: None,
            analyzers: Vec::new(),
            reporters: Vec::new(),
            verdict: VerdictTracker::new(),
            cancel: CancelToken::new(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn reader(mut self, reader: impl PackageReader + Send + 'static) -> Self {
        self.readers.push(Box::new(reader));
        self
    }

    #[must_use]
    pub fn enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(Arc::new(enricher));
        self
    }

    #[must_use]
    pub fn analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzers.push(Box::new(analyzer));
        self
    }

    #[must_use]
    pub fn reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    #[must_use]
    pub fn verdict(mut self, verdict: VerdictTracker) -> Self {
        self.verdict = verdict;
        self
    }

    #[must_use]
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn build(self) -> Scanner {
        Scanner {
            readers: self.readers,
            enricher: self.enricher,
            analyzers: self.analyzers,
            reporters: self.reporters,
            verdict: self.verdict,
            cancel: self.cancel,
            concurrency: self.concurrency,
        }
    }
}

/// Drives packages from readers through enrichment, analysis, and reporting.
pub struct Scanner {
    readers: Vec<Box<dyn PackageReader + Send>>,
    enricher: Option<Arc<Enricher>>,
    analyzers: Vec<Box<dyn Analyzer>>,
    reporters: Vec<Box<dyn Reporter>>,
    verdict: VerdictTracker,
    cancel: CancelToken,
    concurrency: usize,
}

impl Scanner {
    #[must_use]
    pub fn builder() -> ScannerBuilder {
        ScannerBuilder::new()
    }

    /// Run the pipeline to completion (or drained cancellation).
    ///
    /// # Errors
    /// Returns the first fatal error from a reader, analyzer, or reporter.
    /// Enrichment failures are not fatal. Policy matches are not errors;
    /// they land in the shared verdict instead.
    pub async fn run(mut self) -> Result<ScanOutcome> {
        let channel_capacity = self.concurrency * 2;

        // Stage 1: readers on a blocking task.
        let (raw_tx, raw_rx) = mpsc::channel::<(Manifest, Package)>(channel_capacity);
        let mut readers = core::mem::take(&mut self.readers);
        let reader_cancel = self.cancel.clone();
        let reader_task = tokio::task::spawn_blocking(move || -> Result<()> {
            for reader in &mut readers {
                log::debug!(target: LOG_TARGET, "running reader '{}'", reader.name());
                reader.enumerate(&mut |manifest, package| {
                    if reader_cancel.is_cancelled() {
                        return Ok(ReaderControl::Stop);
                    }
                    if raw_tx.blocking_send((manifest.clone(), package)).is_err() {
                        // The pipeline shut down underneath us.
                        return Ok(ReaderControl::Stop);
                    }
                    Ok(ReaderControl::Continue)
                })?;
            }
            Ok(())
        });

        // Stage 2: enrichment fan-out, bounded by throttler permits.
        let (enriched_tx, mut enriched_rx) = mpsc::channel::<(Manifest, Package)>(channel_capacity);
        let enricher = self.enricher.clone();
        let worker_cancel = self.cancel.clone();
        let dispatch_task = tokio::spawn(async move {
            let mut raw_rx = raw_rx;
            let mut workers = JoinSet::new();

            while let Some((manifest, package)) = raw_rx.recv().await {
                match &enricher {
                    Some(enricher) => {
                        let permit = enricher.throttler().acquire().await;
                        let enricher = Arc::clone(enricher);
                        let tx = enriched_tx.clone();
                        let cancel = worker_cancel.clone();
                        let _abort = workers.spawn(async move {
                            let package = if cancel.is_cancelled() {
                                package // abandon the lookup, keep the package
                            } else {
                                enricher.enrich(package).await
                            };
                            drop(permit);
                            let _ = tx.send((manifest, package)).await;
                        });

                        // Reap completed workers so the set stays small.
                        while workers.try_join_next().is_some() {}
                    }
                    None => {
                        if enriched_tx.send((manifest, package)).await.is_err() {
                            break;
                        }
                    }
                }
            }

            while workers.join_next().await.is_some() {}
        });

        // Stage 3: the analyzer/reporter chain, single consumer.
        let mut package_count = 0;
        let mut match_count = 0;
        let mut events: Vec<FilterMatchEvent> = Vec::new();

        while let Some((manifest, package)) = enriched_rx.recv().await {
            package_count += 1;
            events.clear();

            for analyzer in &mut self.analyzers {
                let mut ctx = AnalyzerContext::new(&mut events, &self.verdict, self.cancel.is_cancelled());
                if let Err(e) = analyzer.on_package(&manifest, &package, &mut ctx) {
                    self.cancel.cancel();
                    return Err(app_err!("analyzer '{}' failed: {e:#}", analyzer.name()));
                }
            }

            for reporter in &mut self.reporters {
                if let Err(e) = reporter.on_package(&manifest, &package) {
                    self.cancel.cancel();
                    return Err(app_err!("reporter '{}' failed: {e:#}", reporter.name()));
                }
            }

            for event in &events {
                for reporter in &mut self.reporters {
                    if let Err(e) = reporter.on_filter_match(&manifest, &package, event) {
                        self.cancel.cancel();
                        return Err(app_err!("reporter '{}' failed: {e:#}", reporter.name()));
                    }
                }
            }

            match_count += events.len();
        }

        reader_task.await.into_app_err("reader task panicked")??;
        dispatch_task.await.into_app_err("enrichment task panicked")?;

        // Stage 4: finish callbacks, exactly once, analyzers first.
        let cancelled = self.cancel.is_cancelled();
        let finish = FinishContext { cancelled };
        for analyzer in &mut self.analyzers {
            if let Err(e) = analyzer.on_finish(&finish) {
                return Err(app_err!("analyzer '{}' failed at finish: {e:#}", analyzer.name()));
            }
        }

        let summary = ScanSummary { cancelled };
        for reporter in &mut self.reporters {
            if let Err(e) = reporter.on_finish(&summary) {
                return Err(app_err!("reporter '{}' failed at finish: {e:#}", reporter.name()));
            }
        }

        log::info!(
            target: LOG_TARGET,
            "scan complete: {package_count} package(s), {match_count} match(es){}",
            if cancelled { ", cancelled" } else { "" }
        );

        Ok(ScanOutcome {
            package_count,
            match_count,
            cancelled,
        })
    }
}
