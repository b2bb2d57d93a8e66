//! Exception records that suppress policy matches until an expiry date.

use crate::Result;
use crate::models::{Ecosystem, PackageId};
use camino::Utf8Path;
use chrono::{Days, NaiveDate};
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs;

const LOG_TARGET: &str = "exceptions";

/// How far in the future generated exceptions expire by default.
const DEFAULT_EXPIRY_DAYS: u64 = 90;

/// The default expiry for generated exception records: today + 90 days.
///
/// Evaluated once per invocation by the command layer.
#[must_use]
pub fn default_expiry(today: NaiveDate) -> NaiveDate {
    today.checked_add_days(Days::new(DEFAULT_EXPIRY_DAYS)).unwrap_or(NaiveDate::MAX)
}

/// One persisted exception: a package identity plus an expiry date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExceptionRecord {
    pub ecosystem: Ecosystem,
    pub name: String,

    /// Exact version string, or `"*"` to cover every version.
    pub version: String,

    pub expires: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ExceptionRecord {
    /// Whether this record covers the given package on the given day.
    #[must_use]
    pub fn covers(&self, id: &PackageId, today: NaiveDate) -> bool {
        if today > self.expires {
            return false;
        }

        self.ecosystem == id.ecosystem() && self.name == id.name() && (self.version == "*" || self.version == id.version())
    }
}

/// The on-disk exceptions document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExceptionsFile {
    pub exceptions: Vec<ExceptionRecord>,
}

/// An in-memory set of exceptions consulted before recording matches.
#[derive(Debug, Clone, Default)]
pub struct ExceptionStore {
    records: Vec<ExceptionRecord>,
}

impl ExceptionStore {
    /// Load exceptions from a YAML file.
    ///
    /// Entries that are already expired are kept (so [`ExceptionStore::covers`]
    /// stays a pure date check) but reported with a warning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Utf8Path>, today: NaiveDate) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading exceptions file '{path}'"))?;
        let file: ExceptionsFile = serde_yaml::from_str(&text).into_app_err_with(|| format!("parsing exceptions file '{path}'"))?;

        for record in &file.exceptions {
            if today > record.expires {
                log::warn!(
                    target: LOG_TARGET,
                    "exception for {}@{} ({}) expired on {}",
                    record.name,
                    record.version,
                    record.ecosystem,
                    record.expires
                );
            }
        }

        log::info!(target: LOG_TARGET, "loaded {} exception(s) from '{path}'", file.exceptions.len());
        Ok(Self { records: file.exceptions })
    }

    #[must_use]
    pub fn from_records(records: Vec<ExceptionRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether any unexpired record covers the package.
    #[must_use]
    pub fn covers(&self, id: &PackageId, today: NaiveDate) -> bool {
        self.records.iter().any(|record| record.covers(id, today))
    }
}

/// Write an exceptions document covering the given package identities.
///
/// Identities are deduplicated and sorted so the output is deterministic.
///
/// # Errors
/// Returns an error if the file cannot be serialized or written.
pub fn write_exceptions(path: impl AsRef<Utf8Path>, ids: impl IntoIterator<Item = PackageId>, expires: NaiveDate) -> Result<usize> {
    let path = path.as_ref();

    let mut ids: Vec<PackageId> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();

    let file = ExceptionsFile {
        exceptions: ids
            .into_iter()
            .map(|id| ExceptionRecord {
                ecosystem: id.ecosystem(),
                name: id.name().to_string(),
                version: id.version().to_string(),
                expires,
                reason: None,
            })
            .collect(),
    };

    let text = serde_yaml::to_string(&file).into_app_err("serializing exceptions")?;
    fs::write(path, text).into_app_err_with(|| format!("writing exceptions file '{path}'"))?;

    Ok(file.exceptions.len())
}
