//! End-to-end pipeline scenarios: real lockfiles on disk, a mocked insights
//! API, filters, suites, and exceptions.

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use core::time::Duration;
use pkgvet_lib::Result;
use pkgvet_lib::analyzers::{FilterAnalyzer, FilterMatchEvent, SuiteAnalyzer};
use pkgvet_lib::insights::Client;
use pkgvet_lib::models::{Manifest, Package};
use pkgvet_lib::policy::{ExceptionRecord, ExceptionStore, FilterSuite, Severity};
use pkgvet_lib::reporters::{Reporter, ScanSummary};
use pkgvet_lib::readers::{DirectoryReader, LockfileReader};
use pkgvet_lib::scanner::{EXIT_OK, EXIT_POLICY_VIOLATION, Enricher, Scanner, VerdictTracker};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Captures every filter-match event for assertions.
#[derive(Clone, Default)]
struct CollectingReporter {
    matches: Arc<Mutex<Vec<FilterMatchEvent>>>,
    packages: Arc<Mutex<Vec<String>>>,
}

impl Reporter for CollectingReporter {
    fn name(&self) -> &str {
        "collect"
    }

    fn on_package(&mut self, _manifest: &Manifest, package: &Package) -> Result<()> {
        self.packages.lock().unwrap().push(package.id().to_string());
        Ok(())
    }

    fn on_filter_match(&mut self, _manifest: &Manifest, _package: &Package, event: &FilterMatchEvent) -> Result<()> {
        self.matches.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn on_finish(&mut self, _summary: &ScanSummary) -> Result<()> {
        Ok(())
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

async fn enricher_for(server: &MockServer) -> Enricher {
    let client = Client::new(&server.uri(), Some("test-key"), Duration::from_secs(5)).unwrap();
    Enricher::new(client, 4, 0)
}

fn write_manifest(dir: &tempfile::TempDir, name: &str, contents: &str) -> Utf8PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    Utf8PathBuf::try_from(path).unwrap()
}

/// Scenario A: a requirements.txt with django 2.0.0 whose insight reports one
/// critical vulnerability; a critical-vuln filter with fail-on-match yields
/// one match and exit code 2.
#[tokio::test]
async fn critical_vulnerability_fails_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/insights/v1/pypi/django/2.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "vulnerabilities": [{
                "id": "GHSA-2019-12345",
                "aliases": ["CVE-2019-12345"],
                "severities": [{"type": "CVSSv3", "risk": "CRITICAL"}]
            }]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let lockfile = write_manifest(&dir, "requirements.txt", "django==2.0.0\n");

    let collector = CollectingReporter::default();
    let matches = Arc::clone(&collector.matches);
    let verdict = VerdictTracker::new();

    let scanner = Scanner::builder()
        .reader(LockfileReader::new(vec![lockfile]))
        .enricher(enricher_for(&server).await)
        .analyzer(FilterAnalyzer::new("vulns.critical.exists(v, true)", true, false, None, today()).unwrap())
        .reporter(collector)
        .verdict(verdict.clone())
        .build();

    let outcome = scanner.run().await.unwrap();

    assert_eq!(outcome.package_count, 1);
    assert_eq!(outcome.match_count, 1);
    assert_eq!(matches.lock().unwrap().len(), 1);
    assert_eq!(verdict.exit_code(), EXIT_POLICY_VIOLATION);
}

/// Scenario B: a package-lock.json whose single package is GPL licensed; a
/// license filter matches it.
#[tokio::test]
async fn license_filter_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/insights/v1/npm/copyleft-lib/3.1.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "licenses": ["GPL-3.0"]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let lockfile = write_manifest(
        &dir,
        "package-lock.json",
        r#"{"lockfileVersion": 3, "packages": {"": {}, "node_modules/copyleft-lib": {"version": "3.1.4"}}}"#,
    );

    let collector = CollectingReporter::default();
    let matches = Arc::clone(&collector.matches);

    let scanner = Scanner::builder()
        .reader(LockfileReader::new(vec![lockfile]))
        .enricher(enricher_for(&server).await)
        .analyzer(FilterAnalyzer::new("licenses.exists(l, l == 'GPL-3.0')", false, false, None, today()).unwrap())
        .reporter(collector)
        .build();

    let outcome = scanner.run().await.unwrap();

    assert_eq!(outcome.match_count, 1);
    assert_eq!(matches.lock().unwrap().len(), 1);
}

/// Scenario C: a suite whose critical and low filters both fire for the same
/// package; two events, max severity critical.
#[tokio::test]
async fn suite_reports_every_fired_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "vulnerabilities": [{
                "id": "GHSA-x",
                "aliases": [],
                "severities": [{"type": "CVSSv3", "risk": "CRITICAL"}]
            }],
            "projects": [{"name": "a/b", "type": "GITHUB", "stars": 4, "forks": 1, "issues": 500}]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let lockfile = write_manifest(&dir, "requirements.txt", "risky==1.0.0\n");

    let suite: FilterSuite = serde_yaml::from_str(
        "\
name: oss-risk
filters:
  - name: critical-vulns
    severity: critical
    check: vulnerability
    expression: vulns.critical.exists(v, true)
  - name: busy-tracker
    severity: low
    check: popularity
    expression: projects.exists(p, p.issues > 100)
",
    )
    .unwrap();

    let collector = CollectingReporter::default();
    let matches = Arc::clone(&collector.matches);

    let scanner = Scanner::builder()
        .reader(LockfileReader::new(vec![lockfile]))
        .enricher(enricher_for(&server).await)
        .analyzer(SuiteAnalyzer::new(&suite, false, false, None, today()).unwrap())
        .reporter(collector)
        .build();

    let outcome = scanner.run().await.unwrap();
    assert_eq!(outcome.match_count, 2);

    let matches = matches.lock().unwrap();
    let names: Vec<_> = matches.iter().map(|m| m.filter_name.as_str()).collect();
    assert_eq!(names, vec!["critical-vulns", "busy-tracker"]);

    let max_severity = matches.iter().filter_map(|m| m.severity).max();
    assert_eq!(max_severity, Some(Severity::Critical));
}

/// Scenario D: the insights service has no data (404 everywhere). Filters on
/// `pkg.*` still fire; filters on `vulns.*` never do; nothing fails the run.
#[tokio::test]
async fn missing_insights_only_disable_insight_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let lockfile = write_manifest(&dir, "requirements.txt", "django==2.0.0\nflask==1.0.0\n");

    let collector = CollectingReporter::default();
    let matches = Arc::clone(&collector.matches);
    let verdict = VerdictTracker::new();

    let scanner = Scanner::builder()
        .reader(LockfileReader::new(vec![lockfile]))
        .enricher(enricher_for(&server).await)
        .analyzer(FilterAnalyzer::new("pkg.name == 'django'", false, false, None, today()).unwrap())
        .analyzer(FilterAnalyzer::new("vulns.all.exists(v, true)", true, false, None, today()).unwrap())
        .reporter(collector)
        .verdict(verdict.clone())
        .build();

    let outcome = scanner.run().await.unwrap();

    assert_eq!(outcome.package_count, 2);
    assert_eq!(outcome.match_count, 1);
    assert_eq!(matches.lock().unwrap()[0].expression, "pkg.name == 'django'");
    assert_eq!(verdict.exit_code(), EXIT_OK);
}

/// Scenario E: an unexpired exception covers the only package that would
/// fail the run; the verdict stays clean.
#[tokio::test]
async fn exception_suppresses_failing_match() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "vulnerabilities": [{
                "id": "GHSA-x",
                "aliases": [],
                "severities": [{"type": "CVSSv3", "risk": "CRITICAL"}]
            }]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let lockfile = write_manifest(&dir, "requirements.txt", "django==2.0.0\n");

    let exceptions = Arc::new(ExceptionStore::from_records(vec![ExceptionRecord {
        ecosystem: pkgvet_lib::models::Ecosystem::Pypi,
        name: "django".to_string(),
        version: "2.0.0".to_string(),
        expires: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        reason: Some("accepted risk".to_string()),
    }]));

    let collector = CollectingReporter::default();
    let matches = Arc::clone(&collector.matches);
    let verdict = VerdictTracker::new();

    let scanner = Scanner::builder()
        .reader(LockfileReader::new(vec![lockfile]))
        .enricher(enricher_for(&server).await)
        .analyzer(FilterAnalyzer::new("vulns.critical.exists(v, true)", true, false, Some(exceptions), today()).unwrap())
        .reporter(collector)
        .verdict(verdict.clone())
        .build();

    let outcome = scanner.run().await.unwrap();

    assert_eq!(outcome.package_count, 1);
    assert_eq!(outcome.match_count, 0);
    assert!(matches.lock().unwrap().is_empty());
    assert_eq!(verdict.exit_code(), EXIT_OK);
}

/// A directory walk picks up every supported manifest and de-duplicates
/// enrichment across them.
#[tokio::test]
async fn directory_scan_enriches_duplicates_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/insights/v1/pypi/shared/1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"licenses": ["MIT"]})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("a")).unwrap();
    std::fs::create_dir_all(dir.path().join("b")).unwrap();
    std::fs::write(dir.path().join("a/requirements.txt"), "shared==1.0.0\n").unwrap();
    std::fs::write(dir.path().join("b/requirements.txt"), "shared==1.0.0\n").unwrap();

    let collector = CollectingReporter::default();
    let packages = Arc::clone(&collector.packages);

    let scanner = Scanner::builder()
        .reader(DirectoryReader::new(Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()))
        .enricher(enricher_for(&server).await)
        .reporter(collector)
        .build();

    let outcome = scanner.run().await.unwrap();

    // Both manifest occurrences are reported individually, but the mock's
    // expect(1) proves only one lookup went out.
    assert_eq!(outcome.package_count, 2);
    assert_eq!(packages.lock().unwrap().len(), 2);
}
