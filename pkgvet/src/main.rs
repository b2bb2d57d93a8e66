//! A tool to vet open-source dependencies against security and policy checks.

use pkgvet_lib::{Host, run};
use std::io::Write;
use std::io::{stderr, stdout};
use std::process::ExitCode;

/// Default host that talks to the real OS.
#[derive(Debug, Clone, Default)]
pub struct RealHost;

impl Host for RealHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(&mut RealHost, std::env::args()).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("pkgvet: {e:#}");
            ExitCode::from(pkgvet_lib::EXIT_ERROR)
        }
    }
}
