//! Projection of packages into the structure exposed to filter expressions.

use crate::models::{Package, ProjectHost, RiskLevel};
use cel_interpreter::objects::Map;
use cel_interpreter::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// The read-only view of a package that filter expressions evaluate against.
///
/// Field names and numeric types are an external contract: users reference
/// them in `--filter` expressions and suite files, and the same structure is
/// what JSON dumps serialize. Changing them breaks user policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterFact {
    pub pkg: PkgFact,
    pub vulns: VulnsFact,
    pub scorecard: ScorecardFact,
    pub projects: Vec<ProjectFact>,
    pub licenses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkgFact {
    pub ecosystem: String,
    pub name: String,
    pub version: String,
}

/// Vulnerabilities pre-bucketed by risk level so policies can say
/// "any critical" without iterating over severity entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnsFact {
    pub all: Vec<VulnFact>,
    pub critical: Vec<VulnFact>,
    pub high: Vec<VulnFact>,
    pub medium: Vec<VulnFact>,
    pub low: Vec<VulnFact>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnFact {
    pub id: String,

    /// The CVE alias when one exists, otherwise empty.
    pub cve: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorecardFact {
    pub score: f32,
    pub scores: HashMap<String, f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFact {
    pub name: String,

    #[serde(rename = "type")]
    pub host: String,

    pub stars: i32,
    pub forks: i32,
    pub issues: i32,
}

impl FilterFact {
    /// Project a package (with whatever insight it carries) into the fact
    /// structure. Missing insight fields resolve to their empty form, so
    /// expressions over `vulns.*` simply never match un-enriched packages.
    #[must_use]
    pub fn project(package: &Package) -> Self {
        let id = package.id();
        let mut fact = Self {
            pkg: PkgFact {
                ecosystem: id.ecosystem().to_string(),
                name: id.name().to_string(),
                version: id.version().to_string(),
            },
            ..Self::default()
        };

        let Some(insight) = package.insight() else {
            return fact;
        };

        for vuln in &insight.vulnerabilities {
            let entry = VulnFact {
                id: vuln.id.clone(),
                cve: vuln.cve().unwrap_or_default().to_string(),
            };

            fact.vulns.all.push(entry.clone());
            match vuln.risk() {
                RiskLevel::Critical => fact.vulns.critical.push(entry),
                RiskLevel::High => fact.vulns.high.push(entry),
                RiskLevel::Medium => fact.vulns.medium.push(entry),
                RiskLevel::Low => fact.vulns.low.push(entry),
                RiskLevel::Unknown => {}
            }
        }

        for project in &insight.projects {
            fact.projects.push(ProjectFact {
                name: project.name.clone(),
                host: match project.host {
                    ProjectHost::Github => "GITHUB".to_string(),
                    ProjectHost::Unknown => "UNKNOWN".to_string(),
                },
                stars: project.stars,
                forks: project.forks,
                issues: project.issues,
            });
        }

        if let Some(scorecard) = &insight.scorecard {
            fact.scorecard.score = scorecard.score;
            fact.scorecard.scores = scorecard.checks.clone();
        }

        fact.licenses = insight.licenses.clone();
        fact
    }

    /// Convert the fact into the CEL values bound at evaluation time.
    ///
    /// Returns `(pkg, vulns, projects, scorecard, licenses)`; the `_` root
    /// variable is assembled by the evaluator from the same five values.
    #[must_use]
    pub(crate) fn to_cel_values(&self) -> (Value, Value, Value, Value, Value) {
        let pkg = map_value(vec![
            ("ecosystem", str_value(&self.pkg.ecosystem)),
            ("name", str_value(&self.pkg.name)),
            ("version", str_value(&self.pkg.version)),
        ]);

        let vulns = map_value(vec![
            ("all", vuln_list(&self.vulns.all)),
            ("critical", vuln_list(&self.vulns.critical)),
            ("high", vuln_list(&self.vulns.high)),
            ("medium", vuln_list(&self.vulns.medium)),
            ("low", vuln_list(&self.vulns.low)),
        ]);

        let projects = Value::List(Arc::new(
            self.projects
                .iter()
                .map(|p| {
                    map_value(vec![
                        ("name", str_value(&p.name)),
                        ("type", str_value(&p.host)),
                        ("stars", Value::Int(i64::from(p.stars))),
                        ("forks", Value::Int(i64::from(p.forks))),
                        ("issues", Value::Int(i64::from(p.issues))),
                    ])
                })
                .collect(),
        ));

        let scores: HashMap<Arc<String>, Value> = self
            .scorecard
            .scores
            .iter()
            .map(|(name, score)| (Arc::new(name.clone()), Value::Float(f64::from(*score))))
            .collect();
        let scorecard = map_value(vec![
            ("score", Value::Float(f64::from(self.scorecard.score))),
            ("scores", Value::Map(Map::from(scores))),
        ]);

        let licenses = Value::List(Arc::new(self.licenses.iter().map(|l| str_value(l)).collect()));

        (pkg, vulns, projects, scorecard, licenses)
    }
}

fn str_value(s: &str) -> Value {
    Value::String(Arc::new(s.to_string()))
}

fn map_value(fields: Vec<(&str, Value)>) -> Value {
    let map: HashMap<Arc<String>, Value> = fields.into_iter().map(|(k, v)| (Arc::new(k.to_string()), v)).collect();
    Value::Map(Map::from(map))
}

fn vuln_list(vulns: &[VulnFact]) -> Value {
    Value::List(Arc::new(
        vulns
            .iter()
            .map(|v| map_value(vec![("id", str_value(&v.id)), ("cve", str_value(&v.cve))]))
            .collect(),
    ))
}
