use anyhow::Result;
use clap::Parser;
use tracing::info;

use dbinit::{provision, ApplyFailure, DatabaseConfig, SchemaApplyResult};

/// Apply the user schema.
#[derive(Parser)]
pub struct ApplyCommand {
    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

impl ApplyCommand {
    /// Execute the apply command.
    pub async fn execute(self) -> Result<()> {
        // Load .env if present
        dotenvy::dotenv().ok();
        init_tracing(self.json_logs);

        let result = match DatabaseConfig::from_env() {
            Ok(config) => {
                info!("Loaded configuration for {}", config.database);
                provision(&config).await
            }
            Err(e) => SchemaApplyResult::failed(
                std::env::var("DB_NAME").unwrap_or_default(),
                std::env::var("DB_HOST").unwrap_or_default(),
                ApplyFailure::without_rollback(&e),
            ),
        };

        let response = result.to_response();
        println!("{}", serde_json::to_string_pretty(&response)?);

        match result.error_message() {
            None => Ok(()),
            Some(message) => anyhow::bail!("Provisioning failed: {}", message),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Logs go to stderr so stdout carries only the response
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
