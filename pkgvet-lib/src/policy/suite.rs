//! Filter suites: named collections of severity-tagged filters loaded from YAML.

use super::evaluator::Evaluator;
use crate::Result;
use camino::Utf8Path;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs;
use strum::{Display, EnumIter, EnumString};

/// Severity tag attached to a suite filter.
///
/// Ordered so that the per-package suite verdict can be computed as the
/// maximum severity among fired filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// The kind of risk a suite filter checks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    License,
    Vulnerability,
    Popularity,
    Malware,
    Other,
}

/// One filter entry in a suite file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub severity: Severity,
    pub check: CheckKind,
    pub expression: String,
}

/// An ordered collection of severity-tagged filters.
///
/// All expressions are compiled when the suite is turned into an evaluator;
/// any compile error fails the whole suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSuite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub filters: Vec<FilterSpec>,
}

impl FilterSuite {
    /// Load a suite from a YAML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading filter suite '{path}'"))?;
        let suite: Self = serde_yaml::from_str(&text).into_app_err_with(|| format!("parsing filter suite '{path}'"))?;
        Ok(suite)
    }

    /// Compile every filter in order into an evaluator.
    ///
    /// # Errors
    /// Returns the first compile error, or the filter-limit error for
    /// oversized suites.
    pub fn compile(&self, ignore_errors: bool) -> Result<Evaluator> {
        let name = self.name.clone().unwrap_or_else(|| "filter-suite".to_string());
        let mut evaluator = Evaluator::new(name, ignore_errors);

        for filter in &self.filters {
            evaluator.add_tagged_filter(&filter.name, &filter.expression, Some(filter.severity), Some(filter.check))?;
        }

        Ok(evaluator)
    }
}
