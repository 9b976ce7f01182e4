use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::interfaces::cli::{self, Cli};

/// Parse arguments, initialise logging and run the selected command
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so `merge` without `-o` can stream CSV on stdout
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .try_init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
