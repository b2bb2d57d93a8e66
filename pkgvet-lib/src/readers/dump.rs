//! Replay of JSON dumps produced by a previous scan.

use super::{PackageReader, ReaderControl};
use crate::Result;
use crate::models::{
    Ecosystem, Insight, Manifest, Package, PackageId, ProjectHost, RiskLevel, Scorecard, SeverityEntry, SeverityScheme, SourceProject,
    Vulnerability,
};
use crate::policy::FilterFact;
use camino::Utf8PathBuf;
use core::str::FromStr;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;

const LOG_TARGET: &str = "   readers";

/// File extension used for dump files.
pub(crate) const DUMP_EXTENSION: &str = "ndjson";

/// One line of a dump file: the originating manifest plus the package
/// serialized in the filter fact schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpRecord {
    pub manifest: Manifest,
    pub package: FilterFact,
}

impl DumpRecord {
    /// Rebuild the in-memory package, insight attached, from the fact form.
    ///
    /// # Errors
    /// Returns an error if the recorded ecosystem is not recognized.
    pub fn to_package(&self) -> Result<Package> {
        let fact = &self.package;
        let ecosystem = Ecosystem::from_str(&fact.pkg.ecosystem)
            .map_err(|_| app_err!("dump record for '{}' has unknown ecosystem '{}'", fact.pkg.name, fact.pkg.ecosystem))?;

        let id = PackageId::new(ecosystem, fact.pkg.name.as_str(), fact.pkg.version.as_str());

        let mut insight = Insight {
            licenses: fact.licenses.clone(),
            ..Insight::default()
        };

        let buckets = [
            (&fact.vulns.critical, RiskLevel::Critical),
            (&fact.vulns.high, RiskLevel::High),
            (&fact.vulns.medium, RiskLevel::Medium),
            (&fact.vulns.low, RiskLevel::Low),
        ];

        let mut bucketed_ids = std::collections::HashSet::new();
        for (bucket, risk) in buckets {
            for vuln in bucket {
                let _ = bucketed_ids.insert(vuln.id.as_str());
                insight.vulnerabilities.push(Vulnerability {
                    id: vuln.id.clone(),
                    aliases: if vuln.cve.is_empty() { vec![] } else { vec![vuln.cve.clone()] },
                    severities: vec![SeverityEntry {
                        scheme: SeverityScheme::CvssV3,
                        risk,
                    }],
                });
            }
        }

        // Entries only present in `all` carried no CVSS risk.
        for vuln in &fact.vulns.all {
            if !bucketed_ids.contains(vuln.id.as_str()) {
                insight.vulnerabilities.push(Vulnerability {
                    id: vuln.id.clone(),
                    aliases: if vuln.cve.is_empty() { vec![] } else { vec![vuln.cve.clone()] },
                    severities: vec![],
                });
            }
        }

        for project in &fact.projects {
            insight.projects.push(SourceProject {
                name: project.name.clone(),
                host: if project.host == "GITHUB" { ProjectHost::Github } else { ProjectHost::Unknown },
                stars: project.stars,
                forks: project.forks,
                issues: project.issues,
            });
        }

        if fact.scorecard.score != 0.0 || !fact.scorecard.scores.is_empty() {
            insight.scorecard = Some(Scorecard {
                score: fact.scorecard.score,
                checks: fact.scorecard.scores.clone(),
            });
        }

        Ok(Package::with_insight(id, Arc::new(insight)))
    }
}

/// Replays a dump directory, restoring packages with their insight attached
/// and bypassing enrichment.
pub struct DumpReader {
    dir: Utf8PathBuf,
}

impl DumpReader {
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PackageReader for DumpReader {
    fn name(&self) -> &str {
        "dump"
    }

    fn enumerate(&mut self, callback: &mut dyn FnMut(&Manifest, Package) -> Result<ReaderControl>) -> Result<()> {
        if !self.dir.is_dir() {
            return Err(app_err!("'{}' is not a readable dump directory", self.dir));
        }

        let mut files: Vec<Utf8PathBuf> = self
            .dir
            .read_dir_utf8()
            .into_app_err_with(|| format!("reading dump directory '{}'", self.dir))?
            .filter_map(core::result::Result::ok)
            .map(|entry| entry.path().to_path_buf())
            .filter(|path| path.extension() == Some(DUMP_EXTENSION))
            .collect();
        files.sort();

        for path in files {
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "skipping dump file '{path}': {e}");
                    continue;
                }
            };

            for (line_no, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }

                let record: DumpRecord = match serde_json::from_str(line) {
                    Ok(record) => record,
                    Err(e) => {
                        log::warn!(target: LOG_TARGET, "skipping malformed record at {path}:{}: {e}", line_no + 1);
                        continue;
                    }
                };

                let package = match record.to_package() {
                    Ok(package) => package,
                    Err(e) => {
                        log::warn!(target: LOG_TARGET, "skipping record at {path}:{}: {e:#}", line_no + 1);
                        continue;
                    }
                };

                if callback(&record.manifest, package)? == ReaderControl::Stop {
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}
