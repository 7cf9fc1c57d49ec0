mod apply;
mod steps;

pub use apply::ApplyCommand;
pub use steps::StepsCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// dbinit - idempotent schema provisioning for Postgres
#[derive(Parser)]
#[command(name = "dbinit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Apply the user schema using DB_* environment variables.
    Apply(ApplyCommand),

    /// Print the ordered migration steps without connecting.
    Steps(StepsCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Apply(cmd) => cmd.execute().await,
            Commands::Steps(cmd) => cmd.execute(),
        }
    }
}
