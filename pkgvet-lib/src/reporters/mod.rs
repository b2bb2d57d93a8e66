//! Report generation for scan results
//!
//! Reporters consume the event stream produced by the scan pipeline:
//! `on_package` for every enriched package, `on_filter_match` for every
//! policy decision, and a single `on_finish` once the stream is exhausted.
//!
//! # Implementation Model
//!
//! Reporters accumulate state while events arrive and render on finish; the
//! file-producing reporters (markdown, JSON dump) write nothing until
//! `on_finish`, so a cancelled scan never leaves partial reports behind.
//! Rendering is separated from I/O: each reporter renders into a
//! `fmt::Write`, which is what the tests exercise.

mod console;
mod jsondump;
mod markdown;
mod summary;

pub use console::ConsoleReporter;
pub use jsondump::JsonDumpReporter;
pub use markdown::MarkdownReporter;
pub use summary::SummaryReporter;

use crate::Result;
use crate::analyzers::FilterMatchEvent;
use crate::models::{Manifest, Package};

/// Terminal state handed to every reporter exactly once.
#[derive(Debug, Clone, Copy)]
pub struct ScanSummary {
    /// Whether the scan was cancelled before the readers finished.
    pub cancelled: bool,
}

/// A consumer of scan events.
///
/// Events for one package arrive in a deterministic order (`on_package`,
/// then that package's `on_filter_match` events); ordering across packages
/// follows enrichment completion order.
pub trait Reporter {
    fn name(&self) -> &str;

    fn on_package(&mut self, manifest: &Manifest, package: &Package) -> Result<()>;

    fn on_filter_match(&mut self, manifest: &Manifest, package: &Package, event: &FilterMatchEvent) -> Result<()>;

    fn on_finish(&mut self, summary: &ScanSummary) -> Result<()>;
}
