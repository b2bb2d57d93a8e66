//! Command dispatch logic for pkgvet

use super::{QueryArgs, ScanArgs, process_query, process_scan};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "pkgvet", version, author, long_about = None)]
#[command(about = "Vet open-source dependencies for vulnerabilities, licenses, and policy violations")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: PkgvetSubcommand,
}

#[derive(Subcommand, Debug)]
enum PkgvetSubcommand {
    /// Scan manifests, enrich packages, and evaluate policies
    Scan(Box<ScanArgs>),

    /// Re-evaluate a saved JSON dump without touching the network
    Query(Box<QueryArgs>),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the
/// corresponding subcommand. It's designed to be called from main.rs with
/// the program arguments; the returned value is the process exit code
/// (0 clean, 2 policy violation; errors map to 1 in the caller).
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<u8>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);

    match &cli.command {
        PkgvetSubcommand::Scan(scan_args) => process_scan(host, scan_args).await,
        PkgvetSubcommand::Query(query_args) => process_query(host, query_args).await,
    }
}
