//! Validate config command implementation

use crate::config::load_config;
use crate::config::schema::{InputSource, RuleSourceKind};
use crate::config::secret::redacted_host;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration file: {config_path}");
        println!();

        // load_config validates before returning
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);

        match config.input.source {
            InputSource::Folder => println!("  Input: folder {}", config.input.folder),
            InputSource::Redis => println!(
                "  Input: redis {} channel {}",
                redacted_host(&config.input.redis.url),
                config.input.redis.channel
            ),
        }

        match (&config.rules.source, &config.rules.postgresql) {
            (RuleSourceKind::PostgreSQL, Some(pg)) => {
                println!(
                    "  Rules: postgresql {} table {}",
                    redacted_host(&pg.connection_string),
                    pg.table
                );
                println!("  Max Connections: {}", pg.max_connections);
            }
            _ => println!("  Rules: folder {}", config.rules.folder),
        }

        println!("  Sink: {}", config.effective_sink());
        println!("  Default Queue: {}", config.output.default_queue);
        if !config.output.default_queues.is_empty() {
            println!("  Always-Notified Queues: {:?}", config.output.default_queues);
        }
        println!(
            "  Max Concurrent Documents: {}",
            config.processing.max_concurrent_documents
        );
        println!();
        Ok(0)
    }
}
