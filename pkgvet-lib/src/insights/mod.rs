//! Access to the package insights API
//!
//! This module owns everything between the scan pipeline and the external
//! insights service: the HTTP [`Client`] with response classification, the
//! [`Throttler`] that bounds concurrency and request rate, and the
//! per-run [`InsightCache`] that deduplicates lookups.
//!
//! # Implementation Model
//!
//! One package lookup is a single GET against the versioned insights
//! endpoint. The client classifies each response into an [`ApiOutcome`] and
//! leaves the retry decision to the enricher, which owns the shared
//! throttler and therefore can pause all outbound traffic when the service
//! asks for it (`Retry-After` on 429).
//!
//! The cache is keyed by package identity and is single-flight: concurrent
//! lookups for the same `(ecosystem, name, version)` coalesce into one
//! outbound call, and terminal outcomes (including "no insight available")
//! are remembered for the remainder of the run.

mod cache;
mod client;
mod throttler;

pub use cache::InsightCache;
pub use client::{ApiOutcome, Client};
pub use throttler::Throttler;
