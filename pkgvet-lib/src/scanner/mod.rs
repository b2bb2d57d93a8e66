//! The scan pipeline driver
//!
//! The scanner wires readers, the enricher, analyzers, and reporters into a
//! linear pipeline with fan-in at the source and fan-out at the sink:
//!
//! ```text
//! readers ──► package stream ──► enricher ──► analyzers ──► reporters
//!             (blocking task)    (bounded     (single consumer task)
//!                                 parallel)
//! ```
//!
//! # Implementation Model
//!
//! Readers run on a blocking task and feed a bounded channel; an enrichment
//! dispatcher fans packages out to at most N concurrent workers (throttler
//! permits), which deliver enriched packages into a second bounded channel
//! consumed by the analyzer/reporter chain. Channel capacities are 2·N, so
//! backpressure propagates from a slow sink all the way to the readers.
//!
//! Per-package event order is deterministic: every analyzer in registration
//! order, then every reporter. Across packages, arrival order at the sink
//! equals enrichment completion order, not reader emission order; the
//! analyzer chain is stateless with respect to arrival order by contract.
//! `on_finish` is delivered exactly once, after the stream is fully drained.

mod cancel;
mod driver;
mod enricher;
mod verdict;

pub use cancel::CancelToken;
pub use driver::{ScanOutcome, Scanner, ScannerBuilder};
pub use enricher::Enricher;
pub use verdict::{EXIT_ERROR, EXIT_OK, EXIT_POLICY_VIOLATION, VerdictTracker};
