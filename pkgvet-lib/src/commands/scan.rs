//! The `scan` command: discover manifests, enrich, evaluate, report.

use super::common::{self, CommonArgs, FilterArgs, ReportArgs};
use crate::Result;
use crate::readers::{DirectoryReader, LockfileReader};
use crate::scanner::{CancelToken, Scanner, VerdictTracker};
use camino::Utf8PathBuf;
use chrono::Utc;
use clap::Args;
use ohno::app_err;
use std::io::Write;

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Walk a directory and scan every recognized manifest
    #[arg(long = "directory", short = 'D', value_name = "DIR", help_heading = "Input")]
    pub directory: Option<Utf8PathBuf>,

    /// Scan specific manifest files
    #[arg(long, value_name = "PATH", num_args = 1.., help_heading = "Input")]
    pub lockfiles: Vec<Utf8PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub reports: ReportArgs,
}

/// Run the scan command; returns the process exit code.
///
/// # Errors
/// Returns an error for configuration problems or fatal pipeline failures.
/// Policy matches are not errors: they are reflected in the returned exit
/// code instead.
pub async fn process_scan<H: super::Host>(host: &mut H, args: &ScanArgs) -> Result<u8> {
    common::init_logging(args.common.log_level);

    if args.directory.is_none() && args.lockfiles.is_empty() {
        return Err(app_err!("nothing to scan: pass --directory or --lockfiles"));
    }

    let config = common::effective_config(&args.common)?;
    let today = Utc::now().date_naive();

    let verdict = VerdictTracker::new();
    let cancel = CancelToken::new();
    common::install_cancel_handler(cancel.clone());

    let mut builder = Scanner::builder()
        .verdict(verdict.clone())
        .cancel_token(cancel)
        .concurrency(config.max_concurrency)
        .enricher(common::build_enricher(&config)?);

    if let Some(directory) = &args.directory {
        builder = builder.reader(DirectoryReader::new(directory.clone()));
    }

    if !args.lockfiles.is_empty() {
        builder = builder.reader(LockfileReader::new(args.lockfiles.iter().cloned()));
    }

    let builder = common::attach_policy(builder, &args.filters, today)?;
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
