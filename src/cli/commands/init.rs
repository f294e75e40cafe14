//! Init command implementation
//!
//! Writes a starter configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "ehr2row.toml")]
    pub output: String,

    /// Include commented examples for the Redis and PostgreSQL backends
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        if Path::new(&self.output).exists() && !self.force {
            println!("Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let content = if self.with_examples {
            format!("{}{}", Self::generate_minimal_config(), Self::generate_examples())
        } else {
            Self::generate_minimal_config().to_string()
        };

        match fs::write(&self.output, content) {
            Ok(_) => {
                println!("Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Put rule definitions in ./rules and documents in ./JSON");
                println!("  2. Check the rules: ehr2row check-rules");
                println!("  3. Try a dry run: ehr2row run --dry-run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5)
            }
        }
    }

    fn generate_minimal_config() -> &'static str {
        r#"# ehr2row configuration

[application]
log_level = "info"
dry_run = false

[input]
# folder | redis
source = "folder"
folder = "./JSON"

[rules]
# file | postgresql
source = "file"
folder = "./rules"

[output]
# console | queue | memory
sink = "console"
default_queue = "default"
# Channels that always receive the end-of-stream sentinel
default_queues = []

[processing]
max_concurrent_documents = 16

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"
"#
    }

    fn generate_examples() -> &'static str {
        r#"
# Redis pub/sub input
# [input.redis]
# url = "${REDIS_URL}"
# channel = "ehr_json"

# Rules stored in PostgreSQL (columns plantilla_id BIGINT, code TEXT)
# [rules.postgresql]
# connection_string = "${EHR2ROW_RULES_DSN}"
# table = "rules"
# max_connections = 5
# connection_timeout_seconds = 30

# Redis list output, one list per channel
# [output.redis]
# url = "${REDIS_URL}"
"#
    }
}
