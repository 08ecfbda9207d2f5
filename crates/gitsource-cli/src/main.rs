//! gitsource CLI
//!
//! Creates Flux GitRepository sources and their credentials.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gitsource_cli::progress::ConsoleReporter;
use gitsource_cli::Cli;
use gitsource_provision::{Phase, ProgressReporter};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ConsoleReporter::stderr().report(Phase::Failure, &e.to_string());
            ExitCode::FAILURE
        }
    }
}
