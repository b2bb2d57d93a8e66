//! Console reporter: a human-readable scan summary on stderr.

use super::{Reporter, ScanSummary};
use crate::Result;
use crate::analyzers::FilterMatchEvent;
use crate::models::{Manifest, Package};
use crate::policy::Severity;
use core::fmt::Write;
use owo_colors::OwoColorize;
use std::collections::BTreeMap;

/// Streams a short human summary of manifests, package counts, and matches
/// to stderr when the scan finishes.
pub struct ConsoleReporter {
    use_colors: bool,
    packages_by_manifest: BTreeMap<String, usize>,
    match_lines: Vec<MatchLine>,
}

struct MatchLine {
    package: String,
    filter_name: String,
    severity: Option<Severity>,
}

impl ConsoleReporter {
    #[must_use]
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            packages_by_manifest: BTreeMap::new(),
            match_lines: Vec::new(),
        }
    }

    /// Render the accumulated state.
    pub fn render<W: Write>(&self, cancelled: bool, writer: &mut W) -> Result<()> {
        let total: usize = self.packages_by_manifest.values().sum();
        writeln!(writer, "Scanned {total} package(s) across {} manifest(s)", self.packages_by_manifest.len())?;

        for (manifest, count) in &self.packages_by_manifest {
            writeln!(writer, "  {manifest}: {count} package(s)")?;
        }

        if self.match_lines.is_empty() {
            writeln!(writer, "No policy matches")?;
        } else {
            writeln!(writer, "{} policy match(es):", self.match_lines.len())?;
            for line in &self.match_lines {
                let tag = line.severity.map_or_else(|| "match".to_string(), |s| s.to_string());
                let tag = if self.use_colors { colorize_severity(&tag, line.severity) } else { tag };
                writeln!(writer, "  [{tag}] {} matched '{}'", line.package, line.filter_name)?;
            }
        }

        if cancelled {
            writeln!(writer, "Scan was cancelled; results cover drained packages only")?;
        }

        Ok(())
    }
}

fn colorize_severity(tag: &str, severity: Option<Severity>) -> String {
    match severity {
        Some(Severity::Critical | Severity::High) => tag.red().bold().to_string(),
        Some(Severity::Medium) => tag.yellow().to_string(),
        Some(Severity::Low | Severity::Info) => tag.green().to_string(),
        None => tag.bold().to_string(),
    }
}

impl Reporter for ConsoleReporter {
    fn name(&self) -> &str {
        "console"
    }

    fn on_package(&mut self, manifest: &Manifest, _package: &Package) -> Result<()> {
        *self.packages_by_manifest.entry(manifest.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn on_filter_match(&mut self, _manifest: &Manifest, package: &Package, event: &FilterMatchEvent) -> Result<()> {
        self.match_lines.push(MatchLine {
            package: package.id().to_string(),
            filter_name: event.filter_name.clone(),
            severity: event.severity,
        });
        Ok(())
    }

    fn on_finish(&mut self, summary: &ScanSummary) -> Result<()> {
        let mut output = String::new();
        self.render(summary.cancelled, &mut output)?;
        eprint!("{output}");
        Ok(())
    }
}
