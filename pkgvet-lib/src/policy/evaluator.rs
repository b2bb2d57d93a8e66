//! Compilation and evaluation of filter expressions against package facts.

use super::fact::FilterFact;
use super::suite::{CheckKind, Severity};
use crate::Result;
use cel_interpreter::objects::Map;
use cel_interpreter::{Context, Program, Value};
use ohno::app_err;
use std::collections::HashMap;
use std::sync::Arc;

const LOG_TARGET: &str = "evaluator";

/// Maximum number of programs one evaluator instance will accept.
pub const MAX_FILTERS: usize = 50;

/// A filter expression compiled into a reusable CEL program.
///
/// Programs are immutable once compiled; the severity and check kind are
/// present for filters loaded from a suite and absent for ad-hoc filters.
#[derive(Debug)]
pub struct CompiledFilter {
    name: String,
    expression: String,
    severity: Option<Severity>,
    check: Option<CheckKind>,
    program: Program,
}

impl CompiledFilter {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    #[must_use]
    pub const fn severity(&self) -> Option<Severity> {
        self.severity
    }

    #[must_use]
    pub const fn check(&self) -> Option<CheckKind> {
        self.check
    }
}

/// Evaluates registered filter expressions against package facts.
///
/// Expressions are compiled when registered and never change afterwards, so
/// a shared evaluator is safe to use from multiple threads concurrently.
#[derive(Debug)]
pub struct Evaluator {
    name: String,
    programs: Vec<CompiledFilter>,
    ignore_errors: bool,
}

impl Evaluator {
    #[must_use]
    pub fn new(name: impl Into<String>, ignore_errors: bool) -> Self {
        Self {
            name: name.into(),
            programs: Vec::new(),
            ignore_errors,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn filters(&self) -> &[CompiledFilter] {
        &self.programs
    }

    /// Register an ad-hoc filter expression.
    ///
    /// # Errors
    /// Returns an error if the expression does not parse (the message carries
    /// the parser's location text) or if the filter limit is reached.
    pub fn add_filter(&mut self, name: impl Into<String>, expression: impl Into<String>) -> Result<()> {
        self.add_tagged_filter(name, expression, None, None)
    }

    /// Register a filter carrying suite metadata (severity and check kind).
    ///
    /// # Errors
    /// Same failure modes as [`Evaluator::add_filter`].
    pub fn add_tagged_filter(
        &mut self,
        name: impl Into<String>,
        expression: impl Into<String>,
        severity: Option<Severity>,
        check: Option<CheckKind>,
    ) -> Result<()> {
        if self.programs.len() >= MAX_FILTERS {
            return Err(app_err!("evaluator '{}' reached the maximum of {MAX_FILTERS} filters", self.name));
        }

        let name = name.into();
        let expression = expression.into();
        let program = Program::compile(&expression).map_err(|e| app_err!("could not compile filter '{name}': {e}"))?;

        self.programs.push(CompiledFilter {
            name,
            expression,
            severity,
            check,
            program,
        });

        Ok(())
    }

    /// Evaluate every registered program; the first boolean-true result wins.
    ///
    /// # Errors
    /// Propagates evaluation failures and non-boolean results, unless the
    /// evaluator was built with `ignore_errors`, in which case they are
    /// logged and the offending program is skipped.
    pub fn evaluate(&self, fact: &FilterFact) -> Result<Option<&CompiledFilter>> {
        let context = self.build_context(fact);

        for filter in &self.programs {
            match evaluate_program(filter, &context) {
                Ok(true) => return Ok(Some(filter)),
                Ok(false) => {}
                Err(e) if self.ignore_errors => {
                    log::warn!(target: LOG_TARGET, "skipping filter '{}': {e:#}", filter.name);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Evaluate every registered program and return all that matched.
    ///
    /// Used by filter suites, where every fired filter is reported.
    ///
    /// # Errors
    /// Same error policy as [`Evaluator::evaluate`].
    pub fn evaluate_all(&self, fact: &FilterFact) -> Result<Vec<&CompiledFilter>> {
        let context = self.build_context(fact);
        let mut matches = Vec::new();

        for filter in &self.programs {
            match evaluate_program(filter, &context) {
                Ok(true) => matches.push(filter),
                Ok(false) => {}
                Err(e) if self.ignore_errors => {
                    log::warn!(target: LOG_TARGET, "skipping filter '{}': {e:#}", filter.name);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(matches)
    }

    /// Bind the fact's five variables plus the `_` root.
    fn build_context(&self, fact: &FilterFact) -> Context<'_> {
        let (pkg, vulns, projects, scorecard, licenses) = fact.to_cel_values();

        let root: HashMap<Arc<String>, Value> = [
            ("pkg", pkg.clone()),
            ("vulns", vulns.clone()),
            ("projects", projects.clone()),
            ("scorecard", scorecard.clone()),
            ("licenses", licenses.clone()),
        ]
        .into_iter()
        .map(|(k, v)| (Arc::new(k.to_string()), v))
        .collect();

        let mut context = Context::default();
        context.add_variable_from_value("pkg", pkg);
        context.add_variable_from_value("vulns", vulns);
        context.add_variable_from_value("projects", projects);
        context.add_variable_from_value("scorecard", scorecard);
        context.add_variable_from_value("licenses", licenses);
        context.add_variable_from_value("_", Value::Map(Map::from(root)));

        context
    }
}

/// Run one pre-compiled program, enforcing the boolean-result contract.
fn evaluate_program(filter: &CompiledFilter, context: &Context<'_>) -> Result<bool> {
    match filter
        .program
        .execute(context)
        .map_err(|e| app_err!("could not evaluate filter '{}': {e}", filter.name))?
    {
        Value::Bool(b) => Ok(b),
        other => Err(app_err!("filter '{}' did not return a boolean, got '{other:?}' instead", filter.name)),
    }
}
