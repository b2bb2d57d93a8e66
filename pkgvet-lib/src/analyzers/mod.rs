//! Per-package analysis stages
//!
//! Analyzers sit between enrichment and reporting: the scanner delivers
//! every enriched package to every analyzer in registration order, then one
//! final `on_finish` after the stream is exhausted.
//!
//! # Implementation Model
//!
//! Analyzers communicate with the reporter fan-out through the
//! [`AnalyzerContext`]: a matched filter becomes a [`FilterMatchEvent`]
//! that the scanner forwards to every reporter, and fail-on-match analyzers
//! record into the shared verdict through the same context. Matches covered
//! by an unexpired exception are logged and suppressed before either of
//! those happens.
//!
//! A fatal error returned by an analyzer aborts the scan; recoverable
//! conditions (evaluation errors under `ignore_errors`, suppressions) are
//! logged and the chain proceeds.

mod exceptions_generator;
mod filter;
mod suite;

pub use exceptions_generator::ExceptionsGenerator;
pub use filter::FilterAnalyzer;
pub use suite::SuiteAnalyzer;

use crate::Result;
use crate::models::{Manifest, Package};
use crate::policy::{CheckKind, Severity};
use crate::scanner::VerdictTracker;

/// A policy decision produced by an analyzer for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterMatchEvent {
    /// Name of the analyzer that produced the event.
    pub analyzer: String,

    /// Name of the filter that fired.
    pub filter_name: String,

    /// The filter's expression text.
    pub expression: String,

    /// Severity tag, present for suite filters.
    pub severity: Option<Severity>,

    /// Check kind tag, present for suite filters.
    pub check: Option<CheckKind>,
}

/// Context handed to analyzers for each package.
pub struct AnalyzerContext<'a> {
    events: &'a mut Vec<FilterMatchEvent>,
    verdict: &'a VerdictTracker,
    cancelled: bool,
}

impl<'a> AnalyzerContext<'a> {
    #[must_use]
    pub fn new(events: &'a mut Vec<FilterMatchEvent>, verdict: &'a VerdictTracker, cancelled: bool) -> Self {
        Self { events, verdict, cancelled }
    }

    /// Emit a filter-match event into the reporter stream.
    pub fn emit_match(&mut self, event: FilterMatchEvent) {
        self.events.push(event);
    }

    /// Record that a fail-on-match filter fired.
    pub fn record_policy_failure(&self) {
        self.verdict.record_failure();
    }

    #[must_use]
    pub const fn cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Context handed to analyzers exactly once, after the package stream ends.
#[derive(Debug, Clone, Copy)]
pub struct FinishContext {
    /// Whether the scan was cancelled; packages already enqueued were still
    /// drained through the chain.
    pub cancelled: bool,
}

/// A stage in the analyzer chain.
///
/// `on_package` is invoked once per enriched package, in registration order;
/// `on_finish` exactly once afterwards. Analyzer state is private to the
/// analyzer and only touched from the analyzer task.
pub trait Analyzer {
    fn name(&self) -> &str;

    fn on_package(&mut self, manifest: &Manifest, package: &Package, ctx: &mut AnalyzerContext<'_>) -> Result<()>;

    fn on_finish(&mut self, ctx: &FinishContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}
