//! Summary reporter: an aggregate risk table.

use super::{Reporter, ScanSummary};
use crate::Result;
use crate::analyzers::FilterMatchEvent;
use crate::models::{Manifest, Package, RiskLevel};
use crate::policy::Severity;
use core::fmt::Write;
use owo_colors::OwoColorize;
use std::collections::BTreeMap;
use std::collections::HashSet;
use strum::IntoEnumIterator;

/// Source projects with fewer stars than this count as a popularity signal.
const LOW_POPULARITY_STARS: i32 = 100;

/// License identifiers (by prefix) that warrant a second look in most
/// commercial settings.
const LICENSE_CONCERN_PREFIXES: &[&str] = &["GPL-", "AGPL-", "LGPL-", "SSPL-"];

/// Aggregates risk categories across the whole scan and prints a table on
/// finish.
pub struct SummaryReporter {
    use_colors: bool,
    manifests: HashSet<String>,
    packages: usize,
    with_critical_vulns: usize,
    with_any_vulns: usize,
    low_popularity: usize,
    license_concerns: usize,
    unmaintained: usize,
    matches_by_severity: BTreeMap<Option<Severity>, usize>,
}

impl SummaryReporter {
    #[must_use]
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            manifests: HashSet::new(),
            packages: 0,
            with_critical_vulns: 0,
            with_any_vulns: 0,
            low_popularity: 0,
            license_concerns: 0,
            unmaintained: 0,
            matches_by_severity: BTreeMap::new(),
        }
    }

    /// Render the aggregate table.
    pub fn render<W: Write>(&self, writer: &mut W) -> Result<()> {
        let heading = "Scan Summary";
        if self.use_colors {
            writeln!(writer, "{}", heading.bold())?;
        } else {
            writeln!(writer, "{heading}")?;
        }

        writeln!(writer, "  manifests scanned            : {}", self.manifests.len())?;
        writeln!(writer, "  packages scanned             : {}", self.packages)?;
        writeln!(writer, "  with critical vulnerabilities: {}", self.with_critical_vulns)?;
        writeln!(writer, "  with any known vulnerability : {}", self.with_any_vulns)?;
        writeln!(writer, "  low-popularity source project: {}", self.low_popularity)?;
        writeln!(writer, "  license concerns             : {}", self.license_concerns)?;
        writeln!(writer, "  unmaintained signal          : {}", self.unmaintained)?;

        let total_matches: usize = self.matches_by_severity.values().sum();
        if total_matches > 0 {
            writeln!(writer, "  policy matches               : {total_matches}")?;
            for severity in Severity::iter().rev() {
                if let Some(count) = self.matches_by_severity.get(&Some(severity)) {
                    writeln!(writer, "    {severity:<8} : {count}")?;
                }
            }
            if let Some(count) = self.matches_by_severity.get(&None) {
                writeln!(writer, "    untagged : {count}")?;
            }
        }

        Ok(())
    }
}

impl Reporter for SummaryReporter {
    fn name(&self) -> &str {
        "summary"
    }

    fn on_package(&mut self, manifest: &Manifest, package: &Package) -> Result<()> {
        let _ = self.manifests.insert(manifest.to_string());
        self.packages += 1;

        let Some(insight) = package.insight() else {
            return Ok(());
        };

        if !insight.vulnerabilities.is_empty() {
            self.with_any_vulns += 1;
        }

        if insight.vulnerabilities.iter().any(|v| v.risk() == RiskLevel::Critical) {
            self.with_critical_vulns += 1;
        }

        if !insight.projects.is_empty() && insight.projects.iter().all(|p| p.stars < LOW_POPULARITY_STARS) {
            self.low_popularity += 1;
        }

        if insight
            .licenses
            .iter()
            .any(|license| LICENSE_CONCERN_PREFIXES.iter().any(|prefix| license.starts_with(prefix)))
        {
            self.license_concerns += 1;
        }

        if let Some(scorecard) = &insight.scorecard
            && scorecard.checks.get("Maintained").is_some_and(|score| *score <= 0.0)
        {
            self.unmaintained += 1;
        }

        Ok(())
    }

    fn on_filter_match(&mut self, _manifest: &Manifest, _package: &Package, event: &FilterMatchEvent) -> Result<()> {
        *self.matches_by_severity.entry(event.severity).or_insert(0) += 1;
        Ok(())
    }

    fn on_finish(&mut self, _summary: &ScanSummary) -> Result<()> {
        let mut output = String::new();
        self.render(&mut output)?;
        eprint!("{output}");
        Ok(())
    }
}
