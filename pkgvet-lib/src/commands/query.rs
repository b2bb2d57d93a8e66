//! The `query` command: re-evaluate a saved JSON dump without the network.

use super::common::{self, CommonArgs, FilterArgs, ReportArgs};
use crate::Result;
use crate::analyzers::ExceptionsGenerator;
use crate::policy::default_expiry;
use crate::readers::DumpReader;
use crate::scanner::{CancelToken, Scanner, VerdictTracker};
use camino::Utf8PathBuf;
use chrono::{NaiveDate, Utc};
use clap::Args;
use ohno::app_err;
use std::io::Write;

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Directory holding a JSON dump from a previous scan
    #[arg(long = "from", short = 'F', value_name = "DIR", help_heading = "Input")]
    pub from: Utf8PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub reports: ReportArgs,

    /// Generate exception records for matching packages into this YAML file
    #[arg(long, value_name = "PATH", help_heading = "Exceptions")]
    pub exceptions_generate: Option<Utf8PathBuf>,

    /// Expression selecting the packages to generate exceptions for
    #[arg(long, value_name = "EXPR", help_heading = "Exceptions")]
    pub exceptions_filter: Option<String>,

    /// Expiry date for generated exceptions (default: 90 days from today)
    #[arg(long, value_name = "YYYY-MM-DD", help_heading = "Exceptions")]
    pub exceptions_till: Option<String>,
}

/// Run the query command; returns the process exit code.
///
/// # Errors
/// Returns an error for configuration problems or fatal pipeline failures.
pub async fn process_query<H: super::Host>(host: &mut H, args: &QueryArgs) -> Result<u8> {
    common::init_logging(args.common.log_level);

    let today = Utc::now().date_naive();

    let verdict = VerdictTracker::new();
    let cancel = CancelToken::new();
    common::install_cancel_handler(cancel.clone());

    let mut builder = Scanner::builder()
        .verdict(verdict.clone())
        .cancel_token(cancel)
        .reader(DumpReader::new(args.from.clone()));

    builder = common::attach_policy(builder, &args.filters, today)?;

    if let Some(output) = &args.exceptions_generate {
        let Some(expression) = &args.exceptions_filter else {
            return Err(app_err!("--exceptions-generate requires --exceptions-filter"));
        };

        let expires = parse_expiry(args.exceptions_till.as_deref(), today)?;
        builder = builder.analyzer(ExceptionsGenerator::new(expression, output.clone(), expires)?);
    }

    let builder = common::attach_reporters(builder, &args.reports, args.common.color.use_colors());

    let outcome = builder.build().run().await?;

    if verdict.is_failed() {
        let _ = writeln!(
            host.error(),
            "pkgvet: policy violation: {} match(es) across {} package(s)",
            outcome.match_count,
            outcome.package_count
        );
    }

    Ok(verdict.exit_code())
}

/// Parse `--exceptions-till`, defaulting to today + 90 days.
fn parse_expiry(till: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match till {
        None => Ok(default_expiry(today)),
        Some(text) => {
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| app_err!("invalid --exceptions-till date '{text}': {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiry_default_is_ninety_days() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(parse_expiry(None, today).unwrap(), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
    }

    #[test]
    fn test_parse_expiry_explicit_date() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            parse_expiry(Some("2026-10-31"), today).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 31).unwrap()
        );
    }

    #[test]
    fn test_parse_expiry_rejects_malformed_date() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let err = parse_expiry(Some("31/10/2026"), today).unwrap_err();
        assert!(err.to_string().contains("invalid --exceptions-till"));
    }
}
