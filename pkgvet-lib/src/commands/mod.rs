//! Command-line interface and orchestration for pkgvet
//!
//! This module implements the CLI commands and coordinates the rest of the
//! library to perform end-to-end dependency scanning, policy evaluation, and
//! reporting. It handles argument parsing, configuration management, and the
//! high-level workflows.
//!
//! # Implementation Model
//!
//! The module is organized around two commands:
//!
//! - **scan**: Discover manifests (directory walk or explicit lockfiles),
//!   enrich every package against the insights API, evaluate filters, and
//!   generate reports
//! - **query**: Replay a JSON dump from a previous scan and re-evaluate
//!   filters against it without touching the network; can also generate
//!   exception records for matching packages
//!
//! The `run` function parses command-line arguments using clap and routes to
//! the appropriate command handler. Each command follows the same pattern:
//!
//! 1. Parse arguments and load configuration (`pkgvet.toml` + CLI overrides)
//! 2. Assemble the scanner: readers, enricher, analyzers, reporters
//! 3. Run the pipeline and translate the verdict into an exit code
//!
//! The `common` module provides shared functionality: logging setup, color
//! mode handling, the shared policy/report flag groups, and pipeline
//! assembly helpers.

mod common;
mod config;
mod host;
mod query;
mod run;
mod scan;

#[cfg(debug_assertions)]
pub use config::Config;

pub use common::{ColorMode, CommonArgs, FilterArgs, LogLevel, ReportArgs};
pub use host::Host;
pub use query::{QueryArgs, process_query};
pub use run::run;
pub use scan::{ScanArgs, process_scan};
