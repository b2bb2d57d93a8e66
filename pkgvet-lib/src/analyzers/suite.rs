//! Filter-suite analyzer.

use super::{Analyzer, AnalyzerContext, FilterMatchEvent};
use crate::Result;
use crate::models::{Manifest, Package};
use crate::policy::{Evaluator, ExceptionStore, FilterFact, FilterSuite, Severity};
use chrono::NaiveDate;
use std::sync::Arc;

const LOG_TARGET: &str = " analyzers";

/// Evaluates every filter of a suite against every package.
///
/// All expressions are compiled at construction (any compile error fails the
/// analyzer). One event is emitted per (package, fired filter), carrying the
/// filter's severity and check kind; the per-package suite verdict is the
/// maximum severity among fired filters.
pub struct SuiteAnalyzer {
    name: String,
    evaluator: Evaluator,
    fail_on_match: bool,
    exceptions: Option<Arc<ExceptionStore>>,
    today: NaiveDate,
    match_count: usize,
}

impl SuiteAnalyzer {
    /// Compile `suite` into an analyzer.
    ///
    /// # Errors
    /// Returns the first expression compile error.
    pub fn new(
        suite: &FilterSuite,
        fail_on_match: bool,
        ignore_errors: bool,
        exceptions: Option<Arc<ExceptionStore>>,
        today: NaiveDate,
    ) -> Result<Self> {
        let evaluator = suite.compile(ignore_errors)?;

        Ok(Self {
            name: suite.name.clone().unwrap_or_else(|| "filter-suite".to_string()),
            evaluator,
            fail_on_match,
            exceptions,
            today,
            match_count: 0,
        })
    }

    #[must_use]
    pub const fn match_count(&self) -> usize {
        self.match_count
    }
}

impl Analyzer for SuiteAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_package(&mut self, _manifest: &Manifest, package: &Package, ctx: &mut AnalyzerContext<'_>) -> Result<()> {
        let fact = FilterFact::project(package);

        let fired = self.evaluator.evaluate_all(&fact)?;
        if fired.is_empty() {
            return Ok(());
        }

        if let Some(exceptions) = &self.exceptions
            && exceptions.covers(package.id(), self.today)
        {
            log::info!(target: LOG_TARGET, "suppressed {} match(es) for {} (exception on file)", fired.len(), package.id());
            return Ok(());
        }

        let verdict: Option<Severity> = fired.iter().filter_map(|f| f.severity()).max();
        log::debug!(
            target: LOG_TARGET,
            "{} fired {} filter(s) for {}, verdict {}",
            self.name,
            fired.len(),
            package.id(),
            verdict.map_or_else(|| "none".to_string(), |s| s.to_string())
        );

        for filter in fired {
            self.match_count += 1;
            ctx.emit_match(FilterMatchEvent {
                analyzer: self.name.clone(),
                filter_name: filter.name().to_string(),
                expression: filter.expression().to_string(),
                severity: filter.severity(),
                check: filter.check(),
            });
        }

        if self.fail_on_match {
            ctx.record_policy_failure();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ecosystem, Insight, ManifestKind, PackageId, ProjectHost, RiskLevel, SeverityEntry, SeverityScheme, SourceProject, Vulnerability};
    use crate::policy::{CheckKind, ExceptionRecord, FilterSpec};
    use crate::scanner::VerdictTracker;

    fn suite() -> FilterSuite {
        FilterSuite {
            name: Some("oss-risk".to_string()),
            description: None,
            filters: vec![
                FilterSpec {
                    name: "critical-vulns".to_string(),
                    description: None,
                    severity: Severity::Critical,
                    check: CheckKind::Vulnerability,
                    expression: "vulns.critical.exists(v, true)".to_string(),
                },
                FilterSpec {
                    name: "busy-tracker".to_string(),
                    description: None,
                    severity: Severity::Low,
                    check: CheckKind::Popularity,
                    expression: "projects.exists(p, p.issues > 100)".to_string(),
                },
            ],
        }
    }

    fn package_matching_both() -> Package {
        Package::with_insight(
            PackageId::new(Ecosystem::Npm, "left-pad", "1.3.0"),
            Arc::new(Insight {
                vulnerabilities: vec![Vulnerability {
                    id: "GHSA-crit".to_string(),
                    aliases: vec![],
                    severities: vec![SeverityEntry {
                        scheme: SeverityScheme::CvssV3,
                        risk: RiskLevel::Critical,
                    }],
                }],
                projects: vec![SourceProject {
                    name: "left-pad/left-pad".to_string(),
                    host: ProjectHost::Github,
                    stars: 5,
                    forks: 1,
                    issues: 250,
                }],
                ..Insight::default()
            }),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn run_analyzer(analyzer: &mut SuiteAnalyzer, package: &Package) -> (Vec<FilterMatchEvent>, VerdictTracker) {
        let verdict = VerdictTracker::new();
        let mut events = Vec::new();
        let mut ctx = AnalyzerContext::new(&mut events, &verdict, false);
        analyzer
            .on_package(&Manifest::new(ManifestKind::PackageLockJson, "package-lock.json"), package, &mut ctx)
            .unwrap();
        (events, verdict)
    }

    #[test]
    fn test_one_event_per_fired_filter() {
        let mut analyzer = SuiteAnalyzer::new(&suite(), false, false, None, today()).unwrap();

        let (events, _) = run_analyzer(&mut analyzer, &package_matching_both());

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].filter_name, "critical-vulns");
        assert_eq!(events[0].severity, Some(Severity::Critical));
        assert_eq!(events[0].check, Some(CheckKind::Vulnerability));
        assert_eq!(events[1].filter_name, "busy-tracker");
        assert_eq!(events[1].severity, Some(Severity::Low));
        assert_eq!(analyzer.match_count(), 2);
    }

    #[test]
    fn test_max_severity_is_suite_verdict() {
        let mut analyzer = SuiteAnalyzer::new(&suite(), false, false, None, today()).unwrap();
        let (events, _) = run_analyzer(&mut analyzer, &package_matching_both());

        let max = events.iter().filter_map(|e| e.severity).max();
        assert_eq!(max, Some(Severity::Critical));
    }

    #[test]
    fn test_adding_filter_is_monotonic_in_severity() {
        let base = suite();
        let mut extended = suite();
        extended.filters.push(FilterSpec {
            name: "gpl".to_string(),
            description: None,
            severity: Severity::Medium,
            check: CheckKind::License,
            expression: "licenses.exists(l, l == 'GPL-3.0')".to_string(),
        });

        let package = package_matching_both();

        let mut base_analyzer = SuiteAnalyzer::new(&base, false, false, None, today()).unwrap();
        let (base_events, _) = run_analyzer(&mut base_analyzer, &package);
        let base_max = base_events.iter().filter_map(|e| e.severity).max();

        let mut ext_analyzer = SuiteAnalyzer::new(&extended, false, false, None, today()).unwrap();
        let (ext_events, _) = run_analyzer(&mut ext_analyzer, &package);
        let ext_max = ext_events.iter().filter_map(|e| e.severity).max();

        assert!(ext_max >= base_max);
    }

    #[test]
    fn test_fail_on_match_flips_verdict() {
        let mut analyzer = SuiteAnalyzer::new(&suite(), true, false, None, today()).unwrap();
        let (_, verdict) = run_analyzer(&mut analyzer, &package_matching_both());
        assert!(verdict.is_failed());
    }

    #[test]
    fn test_exception_suppresses_all_matches() {
        let exceptions = Arc::new(ExceptionStore::from_records(vec![ExceptionRecord {
            ecosystem: Ecosystem::Npm,
            name: "left-pad".to_string(),
            version: "*".to_string(),
            expires: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            reason: None,
        }]));

        let mut analyzer = SuiteAnalyzer::new(&suite(), true, false, Some(exceptions), today()).unwrap();
        let (events, verdict) = run_analyzer(&mut analyzer, &package_matching_both());

        assert!(events.is_empty());
        assert!(!verdict.is_failed());
    }

    #[test]
    fn test_compile_error_fails_construction() {
        let mut bad = suite();
        bad.filters[0].expression = "vulns.critical.exists(".to_string();

        let result = SuiteAnalyzer::new(&bad, false, false, None, today());
        assert!(result.is_err());
    }

    #[test]
    fn test_unenriched_package_fires_nothing() {
        let mut analyzer = SuiteAnalyzer::new(&suite(), true, false, None, today()).unwrap();
        let package = Package::new(PackageId::new(Ecosystem::Npm, "left-pad", "1.3.0"));

        let (events, verdict) = run_analyzer(&mut analyzer, &package);
        assert!(events.is_empty());
        assert!(!verdict.is_failed());
    }
}
