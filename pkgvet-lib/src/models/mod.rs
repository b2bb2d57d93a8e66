//! Canonical entities for discovered packages
//!
//! This module defines the in-memory model shared by every pipeline stage:
//! the [`Manifest`] a package was discovered in, the [`PackageId`] identity,
//! the [`Package`] itself, and the [`Insight`] enrichment payload attached
//! to it by the insights service.
//!
//! # Implementation Model
//!
//! A [`Package`] is created by a reader, enriched at most once, and never
//! mutated after it enters the analyzer chain. Identity is the
//! `(ecosystem, name, version)` triple carried by [`PackageId`]; the same
//! identity may occur in several manifests, in which case each occurrence is
//! reported individually but enriched only once.
//!
//! All [`Insight`] fields are optional on the wire and resolve to their
//! empty form when missing, so downstream stages never deal with partially
//! constructed payloads.

mod ecosystem;
mod insight;
mod manifest;
mod package;

pub use ecosystem::Ecosystem;
pub use insight::{Insight, ProjectHost, RiskLevel, Scorecard, SeverityEntry, SeverityScheme, SourceProject, Vulnerability};
pub use manifest::{Manifest, ManifestKind};
pub use package::{Package, PackageId};
