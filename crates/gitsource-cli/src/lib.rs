//! gitsource CLI library

pub mod commands;
pub mod error;
pub mod export;
pub mod progress;
pub mod prompt;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// gitsource - provision Flux Git sources and their credentials
#[derive(Parser, Debug)]
#[command(name = "gitsource")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or update a resource
    #[command(subcommand)]
    Create(CreateCommands),
}

#[derive(Subcommand, Debug)]
pub enum CreateCommands {
    /// Create or update a GitRepository source
    Git(commands::create_git::CreateGitArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Create(CreateCommands::Git(args)) => commands::create_git::run(args).await,
        }
    }
}
