//! Analyzer that accumulates matching packages into an exceptions file.

use super::{Analyzer, AnalyzerContext, FinishContext};
use crate::Result;
use crate::models::{Manifest, Package, PackageId};
use crate::policy::{Evaluator, FilterFact, write_exceptions};
use camino::Utf8PathBuf;
use chrono::NaiveDate;
use std::collections::BTreeSet;

const LOG_TARGET: &str = " analyzers";

/// Collects packages matching a filter expression and, at finish, writes a
/// YAML exceptions document listing them with the requested expiry date.
pub struct ExceptionsGenerator {
    evaluator: Evaluator,
    output: Utf8PathBuf,
    expires: NaiveDate,
    matched: BTreeSet<PackageId>,
}

impl ExceptionsGenerator {
    /// Compile `expression` into a generator writing to `output`.
    ///
    /// # Errors
    /// Returns an error if the expression does not parse.
    pub fn new(expression: &str, output: impl Into<Utf8PathBuf>, expires: NaiveDate) -> Result<Self> {
        let mut evaluator = Evaluator::new("exceptions-generate", false);
        evaluator.add_filter("exceptions-filter", expression)?;

        Ok(Self {
            evaluator,
            output: output.into(),
            expires,
            matched: BTreeSet::new(),
        })
    }
}

impl Analyzer for ExceptionsGenerator {
    fn name(&self) -> &str {
        "exceptions-generate"
    }

    fn on_package(&mut self, _manifest: &Manifest, package: &Package, _ctx: &mut AnalyzerContext<'_>) -> Result<()> {
        let fact = FilterFact::project(package);

        if self.evaluator.evaluate(&fact)?.is_some() {
            let _ = self.matched.insert(package.id().clone());
        }

        Ok(())
    }

    fn on_finish(&mut self, _ctx: &FinishContext) -> Result<()> {
        let written = write_exceptions(&self.output, core::mem::take(&mut self.matched), self.expires)?;
        log::info!(target: LOG_TARGET, "wrote {written} exception(s) to '{}' expiring {}", self.output, self.expires);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ecosystem, ManifestKind};
    use crate::policy::ExceptionStore;
    use crate::scanner::VerdictTracker;

    fn run_packages(generator: &mut ExceptionsGenerator, packages: &[Package]) {
        let manifest = Manifest::new(ManifestKind::RequirementsTxt, "requirements.txt");
        let verdict = VerdictTracker::new();
        for package in packages {
            let mut events = Vec::new();
            let mut ctx = AnalyzerContext::new(&mut events, &verdict, false);
            generator.on_package(&manifest, package, &mut ctx).unwrap();
            assert!(events.is_empty(), "generator must not emit match events");
        }
        generator.on_finish(&FinishContext { cancelled: false }).unwrap();
    }

    #[test]
    fn test_writes_matching_packages() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("exceptions.yml")).unwrap();
        let expires = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();

        let mut generator = ExceptionsGenerator::new("pkg.ecosystem == 'pypi'", &path, expires).unwrap();

        run_packages(
            &mut generator,
            &[
                Package::new(PackageId::new(Ecosystem::Pypi, "django", "2.0.0")),
                Package::new(PackageId::new(Ecosystem::Npm, "lodash", "4.17.20")),
                Package::new(PackageId::new(Ecosystem::Pypi, "flask", "1.0.0")),
                // duplicate occurrence across manifests collapses to one record
                Package::new(PackageId::new(Ecosystem::Pypi, "django", "2.0.0")),
            ],
        );

        let store = ExceptionStore::load(&path, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();
        assert_eq!(store.len(), 2);

        let today = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert!(store.covers(&PackageId::new(Ecosystem::Pypi, "django", "2.0.0"), today));
        assert!(store.covers(&PackageId::new(Ecosystem::Pypi, "flask", "1.0.0"), today));
        assert!(!store.covers(&PackageId::new(Ecosystem::Npm, "lodash", "4.17.20"), today));
    }

    #[test]
    fn test_no_matches_writes_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("exceptions.yml")).unwrap();

        let mut generator =
            ExceptionsGenerator::new("pkg.name == 'nothing-matches-this'", &path, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).unwrap();

        run_packages(&mut generator, &[Package::new(PackageId::new(Ecosystem::Npm, "lodash", "4.17.20"))]);

        let store = ExceptionStore::load(&path, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_bad_expression_fails_construction() {
        let result = ExceptionsGenerator::new("pkg.name ==", "out.yml", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert!(result.is_err());
    }
}
