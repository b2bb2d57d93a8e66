//! Shared argument handling and pipeline assembly for scan and query.

use super::config::Config;
use crate::Result;
use crate::insights::Client;
use crate::policy::{ExceptionStore, FilterSuite};
use crate::analyzers::{FilterAnalyzer, SuiteAnalyzer};
use crate::reporters::{ConsoleReporter, JsonDumpReporter, MarkdownReporter, SummaryReporter};
use crate::scanner::{CancelToken, Enricher, ScannerBuilder};
use camino::Utf8PathBuf;
use chrono::{NaiveDate, Utc};
use clap::Args;
use clap::ValueEnum;
use std::sync::Arc;

const LOG_TARGET: &str = "  commands";

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    /// Resolve against the state of stderr, where reports land.
    pub(crate) fn use_colors(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                use std::io::{IsTerminal, stderr};
                stderr().is_terminal()
            }
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Initialize logger based on log level
pub(crate) fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .init();
}

/// Arguments shared by every command
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Insights API key
    #[arg(long, value_name = "KEY", env = "VET_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Insights API base URL (overrides the configuration file)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Path to configuration file (default is `pkgvet.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Maximum concurrent enrichment requests (overrides the configuration file)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

/// Policy arguments shared by scan and query
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Filter packages using a CEL expression over the package fact schema
    #[arg(long, value_name = "EXPR", help_heading = "Policy")]
    pub filter: Option<String>,

    /// Run a filter suite loaded from a YAML file
    #[arg(long, value_name = "PATH", help_heading = "Policy")]
    pub filter_suite: Option<Utf8PathBuf>,

    /// Fail the command (exit code 2) if any filter matches any package
    #[arg(long, help_heading = "Policy")]
    pub filter_fail: bool,

    /// Suppress matches covered by this exceptions file
    #[arg(long, value_name = "PATH", help_heading = "Policy")]
    pub exceptions: Option<Utf8PathBuf>,
}

/// Report output arguments shared by scan and query
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Print a human-readable summary to stderr.
    /// This is the default when no other report is requested.
    #[arg(long, help_heading = "Report Output")]
    pub report_console: bool,

    /// Print an aggregate risk table when the scan finishes
    #[arg(long, help_heading = "Report Output")]
    pub report_summary: bool,

    /// Write a markdown report to the given path
    #[arg(long, value_name = "PATH", help_heading = "Report Output")]
    pub report_markdown: Option<Utf8PathBuf>,

    /// Write enriched packages to a JSON dump directory, replayable with `query -F`
    #[arg(long, value_name = "DIR", help_heading = "Report Output")]
    pub json_dump: Option<Utf8PathBuf>,
}

/// Resolve the effective configuration: file values overridden by CLI flags.
pub(crate) fn effective_config(args: &CommonArgs) -> Result<Config> {
    let mut config = Config::load(args.config.as_ref())?;

    if let Some(api_url) = &args.api_url {
        config.api_url.clone_from(api_url);
    }
    if let Some(api_key) = &args.api_key {
        config.api_key = Some(api_key.clone());
    }
    if let Some(concurrency) = &args.concurrency {
        config.max_concurrency = (*concurrency).max(1);
    }

    Ok(config)
}

/// Build the enricher from the effective configuration.
pub(crate) fn build_enricher(config: &Config) -> Result<Enricher> {
    if config.api_key.is_none() {
        log::warn!(target: LOG_TARGET, "no insights API key configured; enrichment may be rejected (set VET_API_KEY)");
    }

    let client = Client::new(&config.api_url, config.api_key.as_deref(), config.request_timeout)?;
    Ok(Enricher::new(client, config.max_concurrency, config.requests_per_second))
}

/// Register the filter and suite analyzers requested on the command line.
pub(crate) fn attach_policy(mut builder: ScannerBuilder, args: &FilterArgs, today: NaiveDate) -> Result<ScannerBuilder> {
    let exceptions = match &args.exceptions {
        Some(path) => Some(Arc::new(ExceptionStore::load(path, today)?)),
        None => None,
    };

    if let Some(expression) = &args.filter {
        builder = builder.analyzer(FilterAnalyzer::new(expression, args.filter_fail, true, exceptions.clone(), today)?);
    }

    if let Some(path) = &args.filter_suite {
        let suite = FilterSuite::load(path)?;
        builder = builder.analyzer(SuiteAnalyzer::new(&suite, args.filter_fail, true, exceptions, today)?);
    }

    Ok(builder)
}

/// Register the requested reporters. The console reporter is the default
/// when nothing else was asked for.
pub(crate) fn attach_reporters(mut builder: ScannerBuilder, args: &ReportArgs, use_colors: bool) -> ScannerBuilder {
    let any_requested = args.report_console || args.report_summary || args.report_markdown.is_some() || args.json_dump.is_some();

    if args.report_console || !any_requested {
        builder = builder.reporter(ConsoleReporter::new(use_colors));
    }

    if args.report_summary {
        builder = builder.reporter(SummaryReporter::new(use_colors));
    }

    if let Some(path) = &args.report_markdown {
        builder = builder.reporter(MarkdownReporter::new(path, Utc::now()));
    }

    if let Some(dir) = &args.json_dump {
        builder = builder.reporter(JsonDumpReporter::new(dir));
    }

    builder
}

/// Flip the cancel token when the process receives an interrupt.
pub(crate) fn install_cancel_handler(cancel: CancelToken) {
    drop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!(target: LOG_TARGET, "interrupt received; draining enqueued packages");
            cancel.cancel();
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_args(filter: Option<&str>, fail: bool) -> FilterArgs {
        FilterArgs {
            filter: filter.map(ToString::to_string),
            filter_suite: None,
            filter_fail: fail,
            exceptions: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_attach_policy_rejects_bad_expression() {
        let result = attach_policy(ScannerBuilder::new(), &filter_args(Some("pkg.name =="), false), today());
        assert!(result.is_err());
    }

    #[test]
    fn test_attach_policy_accepts_valid_expression() {
        let result = attach_policy(ScannerBuilder::new(), &filter_args(Some("pkg.name == 'x'"), true), today());
        assert!(result.is_ok());
    }

    #[test]
    fn test_attach_policy_missing_suite_file() {
        let args = FilterArgs {
            filter: None,
            filter_suite: Some(Utf8PathBuf::from("/nonexistent/suite.yml")),
            filter_fail: false,
            exceptions: None,
        };
        assert!(attach_policy(ScannerBuilder::new(), &args, today()).is_err());
    }

    #[test]
    fn test_effective_config_cli_overrides() {
        let args = CommonArgs {
            api_key: Some("secret".to_string()),
            api_url: Some("https://other.example.com".to_string()),
            config: None,
            concurrency: Some(3),
            color: ColorMode::Never,
            log_level: LogLevel::None,
        };

        let config = effective_config(&args).unwrap();
        assert_eq!(config.api_url, "https://other.example.com");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.max_concurrency, 3);
    }

    #[test]
    fn test_color_mode_explicit_values() {
        assert!(ColorMode::Always.use_colors());
        assert!(!ColorMode::Never.use_colors());
    }
}
