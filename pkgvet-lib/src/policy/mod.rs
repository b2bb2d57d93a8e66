//! Expression-based policy evaluation using CEL
//!
//! This module implements the policy engine that decides whether packages
//! match user-defined filters. It uses the CEL (Common Expression Language)
//! to provide a safe, sandboxed evaluation environment with no side effects
//! and bounded cost.
//!
//! # Implementation Model
//!
//! Each package is projected into a [`FilterFact`], a stable, read-only
//! structure whose field names are part of the external contract (users
//! reference them in expressions). The [`Evaluator`] holds compiled
//! programs; expressions are compiled once when registered and validated to
//! return booleans at evaluation time.
//!
//! For each package the evaluator:
//! - Builds a CEL context binding `pkg`, `vulns`, `projects`, `scorecard`,
//!   `licenses`, and `_` (the root containing all five)
//! - Runs programs in registration order
//! - Reports the first match ([`Evaluator::evaluate`]) or every match
//!   ([`Evaluator::evaluate_all`], used by filter suites)
//!
//! The CEL context is created once per package and reused for all programs.
//!
//! Filter suites ([`FilterSuite`]) are YAML files grouping filters with a
//! severity and a check kind; exception files ([`ExceptionStore`]) suppress
//! matches for specific packages until an expiry date.

mod evaluator;
mod exceptions;
mod fact;
mod suite;

pub use evaluator::{CompiledFilter, Evaluator, MAX_FILTERS};
pub use exceptions::{ExceptionRecord, ExceptionStore, ExceptionsFile, default_expiry, write_exceptions};
pub use fact::{FilterFact, PkgFact, ProjectFact, ScorecardFact, VulnFact, VulnsFact};
pub use suite::{CheckKind, FilterSpec, FilterSuite, Severity};
