//! Markdown reporter: writes a report document on finish.

use super::{Reporter, ScanSummary};
use crate::Result;
use crate::analyzers::FilterMatchEvent;
use crate::models::{Manifest, Package};
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use core::fmt::Write;
use ohno::IntoAppError;
use std::collections::BTreeMap;
use std::fs;

const LOG_TARGET: &str = " reporters";

/// Writes a markdown report file when the scan finishes.
///
/// Nothing is written before `on_finish`, so a cancelled or aborted scan
/// leaves no partial report behind.
pub struct MarkdownReporter {
    output: Utf8PathBuf,
    generated_at: DateTime<Utc>,
    packages_by_manifest: BTreeMap<String, Vec<String>>,
    matches: Vec<MatchRow>,
}

struct MatchRow {
    package: String,
    filter_name: String,
    severity: String,
    check: String,
}

impl MarkdownReporter {
    #[must_use]
    pub fn new(output: impl Into<Utf8PathBuf>, generated_at: DateTime<Utc>) -> Self {
        Self {
            output: output.into(),
            generated_at,
            packages_by_manifest: BTreeMap::new(),
            matches: Vec::new(),
        }
    }

    /// Render the report document.
    pub fn render<W: Write>(&self, cancelled: bool, writer: &mut W) -> Result<()> {
        writeln!(writer, "# Dependency Scan Report")?;
        writeln!(writer)?;
        writeln!(writer, "Generated at {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(writer)?;

        if cancelled {
            writeln!(writer, "> **Note**: the scan was cancelled; this report covers drained packages only.")?;
            writeln!(writer)?;
        }

        writeln!(writer, "## Manifests")?;
        writeln!(writer)?;
        writeln!(writer, "| Manifest | Packages |")?;
        writeln!(writer, "|---|---|")?;
        for (manifest, packages) in &self.packages_by_manifest {
            writeln!(writer, "| {manifest} | {} |", packages.len())?;
        }
        writeln!(writer)?;

        writeln!(writer, "## Policy Matches")?;
        writeln!(writer)?;
        if self.matches.is_empty() {
            writeln!(writer, "No policy matches.")?;
        } else {
            writeln!(writer, "| Package | Filter | Severity | Check |")?;
            writeln!(writer, "|---|---|---|---|")?;
            for row in &self.matches {
                writeln!(writer, "| {} | {} | {} | {} |", row.package, row.filter_name, row.severity, row.check)?;
            }
        }

        Ok(())
    }
}

impl Reporter for MarkdownReporter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn on_package(&mut self, manifest: &Manifest, package: &Package) -> Result<()> {
        self.packages_by_manifest
            .entry(manifest.to_string())
            .or_default()
            .push(package.id().to_string());
        Ok(())
    }

    fn on_filter_match(&mut self, _manifest: &Manifest, package: &Package, event: &FilterMatchEvent) -> Result<()> {
        self.matches.push(MatchRow {
            package: package.id().to_string(),
            filter_name: event.filter_name.clone(),
            severity: event.severity.map_or_else(|| "-".to_string(), |s| s.to_string()),
            check: event.check.map_or_else(|| "-".to_string(), |c| c.to_string()),
        });
        Ok(())
    }

    fn on_finish(&mut self, summary: &ScanSummary) -> Result<()> {
        let mut document = String::new();
        self.render(summary.cancelled, &mut document)?;

        fs::write(&self.output, document).into_app_err_with(|| format!("writing markdown report '{}'", self.output))?;
        log::info!(target: LOG_TARGET, "wrote markdown report to '{}'", self.output);
        Ok(())
    }
}
