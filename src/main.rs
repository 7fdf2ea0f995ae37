//! Debforge CLI - build order resolver and sequential builder for Debian
//! source repositories
//!
//! Entry point for the debforge command-line application.

use anyhow::Result;
use clap::Parser;

use debforge::cli::output::{display_error, exit_code};
use debforge::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = cli.output_config();

    // Logs go to stderr; stdout carries the order and unit output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.log_directive())),
        )
        .init();

    tracing::debug!(
        "debforge {} (commit {}, dirty {}, built {} with rustc {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("unknown"),
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    );

    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e, &output);
            // exit without dropping the runtime: an interrupted build may
            // still be running on a blocking thread
            std::process::exit(exit_code(&e));
        }
    }
}
