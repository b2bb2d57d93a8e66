//! Single-expression filter analyzer.

use super::{Analyzer, AnalyzerContext, FilterMatchEvent};
use crate::Result;
use crate::models::{Manifest, Package};
use crate::policy::{Evaluator, ExceptionStore, FilterFact};
use chrono::NaiveDate;
use std::sync::Arc;

const LOG_TARGET: &str = " analyzers";

/// Evaluates one filter expression against every package.
///
/// The expression is compiled at construction; a parse error fails the
/// analyzer before the pipeline starts. On match, a [`FilterMatchEvent`] is
/// emitted and, when configured to fail on match, the run verdict flips.
pub struct FilterAnalyzer {
    evaluator: Evaluator,
    fail_on_match: bool,
    exceptions: Option<Arc<ExceptionStore>>,
    today: NaiveDate,
    match_count: usize,
}

impl FilterAnalyzer {
    /// Compile `expression` into an analyzer.
    ///
    /// # Errors
    /// Returns an error if the expression does not parse.
    pub fn new(
        expression: &str,
        fail_on_match: bool,
        ignore_errors: bool,
        exceptions: Option<Arc<ExceptionStore>>,
        today: NaiveDate,
    ) -> Result<Self> {
        let mut evaluator = Evaluator::new("filter", ignore_errors);
        evaluator.add_filter("filter", expression)?;

        Ok(Self {
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

impl Analyzer for FilterAnalyzer {
    fn name(&self) -> &str {
        "filter"
    }

    fn on_package(&mut self, _manifest: &Manifest, package: &Package, ctx: &mut AnalyzerContext<'_>) -> Result<()> {
        let fact = FilterFact::project(package);

        let Some(matched) = self.evaluator.evaluate(&fact)? else {
            return Ok(());
        };

        if let Some(exceptions) = &self.exceptions
            && exceptions.covers(package.id(), self.today)
        {
            log::info!(target: LOG_TARGET, "suppressed match for {} (exception on file)", package.id());
            return Ok(());
        }

        self.match_count += 1;
        ctx.emit_match(FilterMatchEvent {
            analyzer: self.name().to_string(),
            filter_name: matched.name().to_string(),
            expression: matched.expression().to_string(),
            severity: None,
            check: None,
        });

        if self.fail_on_match {
            ctx.record_policy_failure();
        }

        Ok(())
    }
}
