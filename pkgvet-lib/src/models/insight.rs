use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::Display;

/// Enrichment payload returned by the insights API for one package version.
///
/// Every field is optional on the wire; deserialization resolves missing
/// fields to their empty form so an `Insight` is never partially usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,

    #[serde(default)]
    pub projects: Vec<SourceProject>,

    #[serde(default)]
    pub scorecard: Option<Scorecard>,

    #[serde(default)]
    pub licenses: Vec<String>,
}

/// A known vulnerability affecting a package version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    #[serde(default)]
    pub id: String,

    /// Alternate identifiers, including the CVE form when one exists.
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub severities: Vec<SeverityEntry>,
}

impl Vulnerability {
    /// The coarse risk level of this vulnerability.
    ///
    /// Taken from the first severity entry scored under a CVSS scheme;
    /// vulnerabilities with no CVSS score are `unknown`.
    #[must_use]
    pub fn risk(&self) -> RiskLevel {
        self.severities
            .iter()
            .find(|s| matches!(s.scheme, SeverityScheme::CvssV3 | SeverityScheme::CvssV2))
            .map_or(RiskLevel::Unknown, |s| s.risk)
    }

    /// The first alias in CVE form, if any.
    #[must_use]
    pub fn cve(&self) -> Option<&str> {
        self.aliases
            .iter()
            .find(|alias| alias.to_ascii_uppercase().starts_with("CVE-"))
            .map(String::as_str)
    }
}

/// One severity score attached to a vulnerability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityEntry {
    #[serde(rename = "type")]
    pub scheme: SeverityScheme,
    pub risk: RiskLevel,
}

/// The scoring scheme a severity entry was produced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityScheme {
    #[serde(rename = "CVSSv2")]
    CvssV2,

    #[serde(rename = "CVSSv3")]
    CvssV3,

    #[serde(other)]
    Other,
}

/// Coarse risk buckets used by the fact schema and the summary report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,

    #[default]
    #[serde(other)]
    Unknown,
}

/// A source repository associated with a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProject {
    #[serde(default)]
    pub name: String,

    #[serde(default, rename = "type")]
    pub host: ProjectHost,

    #[serde(default)]
    pub stars: i32,

    #[serde(default)]
    pub forks: i32,

    #[serde(default)]
    pub issues: i32,
}

/// Where a source project is hosted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectHost {
    #[serde(rename = "GITHUB", alias = "github")]
    Github,

    #[default]
    #[serde(other, rename = "UNKNOWN")]
    Unknown,
}

/// OpenSSF Scorecard results for a package's source project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    #[serde(default)]
    pub score: f32,

    /// Per-check scores keyed by check name (e.g. `Maintained`, `Code-Review`).
    #[serde(default)]
    pub checks: HashMap<String, f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn severity(scheme: SeverityScheme, risk: RiskLevel) -> SeverityEntry {
        SeverityEntry { scheme, risk }
    }

    #[test]
    fn test_empty_insight_deserializes_from_empty_object() {
        let insight: Insight = serde_json::from_str("{}").unwrap();
        assert!(insight.vulnerabilities.is_empty());
        assert!(insight.projects.is_empty());
        assert!(insight.scorecard.is_none());
        assert!(insight.licenses.is_empty());
    }

    #[test]
    fn test_vulnerability_risk_prefers_cvss() {
        let vuln = Vulnerability {
            id: "GHSA-xxxx".to_string(),
            aliases: vec![],
            severities: vec![
                severity(SeverityScheme::Other, RiskLevel::Low),
                severity(SeverityScheme::CvssV3, RiskLevel::Critical),
            ],
        };

        assert_eq!(vuln.risk(), RiskLevel::Critical);
    }

    #[test]
    fn test_vulnerability_risk_falls_back_to_cvss2() {
        let vuln = Vulnerability {
            id: "GHSA-yyyy".to_string(),
            aliases: vec![],
            severities: vec![severity(SeverityScheme::CvssV2, RiskLevel::Medium)],
        };

        assert_eq!(vuln.risk(), RiskLevel::Medium);
    }

    #[test]
    fn test_vulnerability_without_cvss_is_unknown() {
        let vuln = Vulnerability {
            id: "GHSA-zzzz".to_string(),
            aliases: vec![],
            severities: vec![severity(SeverityScheme::Other, RiskLevel::High)],
        };

        assert_eq!(vuln.risk(), RiskLevel::Unknown);
    }

    #[test]
    fn test_cve_alias_extraction() {
        let vuln = Vulnerability {
            id: "GHSA-abcd".to_string(),
            aliases: vec!["OSV-2023-1".to_string(), "cve-2023-12345".to_string()],
            severities: vec![],
        };

        assert_eq!(vuln.cve(), Some("cve-2023-12345"));
    }

    #[test]
    fn test_cve_alias_absent() {
        let vuln = Vulnerability {
            id: "GHSA-abcd".to_string(),
            aliases: vec!["OSV-2023-1".to_string()],
            severities: vec![],
        };

        assert_eq!(vuln.cve(), None);
    }

    #[test]
    fn test_unknown_severity_scheme_tolerated() {
        let json = r#"{"type": "GHSA", "risk": "HIGH"}"#;
        let entry: SeverityEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.scheme, SeverityScheme::Other);
        assert_eq!(entry.risk, RiskLevel::High);
    }

    #[test]
    fn test_unknown_risk_level_tolerated() {
        let json = r#"{"type": "CVSSv3", "risk": "SOMETHING_NEW"}"#;
        let entry: SeverityEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.risk, RiskLevel::Unknown);
    }

    #[test]
    fn test_project_host_accepts_both_cases() {
        let upper: ProjectHost = serde_json::from_str("\"GITHUB\"").unwrap();
        let lower: ProjectHost = serde_json::from_str("\"github\"").unwrap();
        assert_eq!(upper, ProjectHost::Github);
        assert_eq!(lower, ProjectHost::Github);

        let other: ProjectHost = serde_json::from_str("\"gitlab\"").unwrap();
        assert_eq!(other, ProjectHost::Unknown);
    }

    #[test]
    fn test_full_payload_roundtrip() {
        let insight = Insight {
            vulnerabilities: vec![Vulnerability {
                id: "GHSA-jfh8".to_string(),
                aliases: vec!["CVE-2021-44228".to_string()],
                severities: vec![severity(SeverityScheme::CvssV3, RiskLevel::Critical)],
            }],
            projects: vec![SourceProject {
                name: "apache/logging-log4j2".to_string(),
                host: ProjectHost::Github,
                stars: 3200,
                forks: 1500,
                issues: 200,
            }],
            scorecard: Some(Scorecard {
                score: 6.5,
                checks: HashMap::from([("Maintained".to_string(), 10.0)]),
            }),
            licenses: vec!["Apache-2.0".to_string()],
        };

        let json = serde_json::to_string(&insight).unwrap();
        let parsed: Insight = serde_json::from_str(&json).unwrap();
        assert_eq!(insight, parsed);
    }
}
