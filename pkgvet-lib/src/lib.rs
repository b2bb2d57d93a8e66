//! Core library for pkgvet
//!
//! This library consolidates all functionality for the pkgvet tool, which
//! scans the third-party packages declared in a code repository, enriches
//! them with security metadata, and evaluates user-defined policies.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`models`]: Canonical package, manifest, and insight entities
//! - [`readers`]: Manifest discovery and package enumeration
//! - [`insights`]: Insights API client, caching, and rate control
//! - [`scanner`]: The scan pipeline driver
//! - [`analyzers`]: Per-package analysis stages
//! - [`policy`]: Expression-based policy evaluation
//! - [`reporters`]: Report generation

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

macro_rules! declare_modules {
    ($($mod:ident),+ $(,)?) => {
        $(
            #[cfg(debug_assertions)]
            pub mod $mod;
            #[cfg(not(debug_assertions))]
            mod $mod;
        )+
    };
}

declare_modules!(analyzers, commands, insights, models, policy, readers, reporters, scanner);

pub use crate::commands::{Host, run};
pub use crate::scanner::{EXIT_ERROR, EXIT_OK, EXIT_POLICY_VIOLATION};
