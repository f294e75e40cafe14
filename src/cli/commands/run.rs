//! Run command implementation

use crate::config::{load_config, Ehr2RowConfig, InputSource, SinkKind};
use crate::core::engine::{RunCoordinator, RunSummary};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Override the document source (folder or redis)
    #[arg(long)]
    pub input: Option<InputSource>,

    /// Override the document folder
    #[arg(long)]
    pub folder: Option<String>,

    /// Override the output sink (console, queue or memory)
    #[arg(long)]
    pub sink: Option<SinkKind>,

    /// Process everything but keep records in memory instead of publishing them
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };
        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if config.application.dry_run {
            println!("DRY RUN MODE - records are kept in memory and not published");
            println!();
        }

        let coordinator = match RunCoordinator::from_config(&config, shutdown_signal).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize run");
                eprintln!("Failed to initialize run: {e}");
                return Ok(4);
            }
        };

        let summary = match coordinator.run().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Run failed");
                eprintln!("Run failed: {e}");
                return Ok(5);
            }
        };

        print_summary(&summary);
        Ok(exit_code(&summary))
    }

    fn apply_overrides(&self, config: &mut Ehr2RowConfig) {
        if let Some(input) = self.input {
            tracing::info!(input = %input, "Overriding input source from CLI");
            config.input.source = input;
        }
        if let Some(folder) = &self.folder {
            tracing::info!(folder = %folder, "Overriding input folder from CLI");
            config.input.folder = folder.clone();
        }
        if let Some(sink) = self.sink {
            tracing::info!(sink = %sink, "Overriding output sink from CLI");
            config.output.sink = sink;
        }
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Run Summary ({}):", summary.run_id);
    match summary.expected {
        Some(expected) => println!("  Expected Documents: {expected}"),
        None => println!("  Expected Documents: not announced"),
    }
    println!("  Received: {}", summary.documents_received);
    println!("  Processed: {}", summary.documents_processed);
    println!("  Without Rules: {}", summary.documents_without_rules);
    println!("  Invalid: {}", summary.documents_invalid);
    println!("  Failed: {}", summary.documents_failed);
    println!("  Records Emitted: {}", summary.records_emitted);
    println!("  Records Failed: {}", summary.records_failed);
    println!(
        "  Rules Fired/Skipped: {}/{}",
        summary.rules_fired, summary.rules_skipped
    );
    println!("  Expression Errors: {}", summary.expression_errors);
    println!("  Channels: {}", summary.channels.join(", "));
    println!(
        "  End of Stream Sent: {}",
        if summary.completed { "yes" } else { "no" }
    );
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if !summary.errors.is_empty() {
        println!("Errors encountered:");
        for error in &summary.errors {
            println!("  - {:?}: {}", error.kind, error.message);
            if let Some(context) = &error.context {
                println!("    Context: {context}");
            }
        }
        println!();
    }
}

fn exit_code(summary: &RunSummary) -> i32 {
    if summary.interrupted {
        println!("Run interrupted, in-flight documents were drained.");
        130
    } else if summary.is_successful() {
        println!("Run completed successfully");
        0
    } else {
        println!("Run completed with failures");
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let args = RunArgs {
            input: Some(InputSource::Redis),
            folder: Some("./incoming".to_string()),
            sink: Some(SinkKind::Console),
            dry_run: true,
        };
        let mut config = Ehr2RowConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.input.source, InputSource::Redis);
        assert_eq!(config.input.folder, "./incoming");
        assert_eq!(config.output.sink, SinkKind::Console);
        assert!(config.application.dry_run);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = Ehr2RowConfig::default();
        RunArgs::default().apply_overrides(&mut config);
        assert_eq!(config.input.folder, Ehr2RowConfig::default().input.folder);
        assert!(!config.application.dry_run);
    }

    #[test]
    fn test_exit_codes() {
        let mut summary = RunSummary::new();
        assert_eq!(exit_code(&summary), 0);

        summary.records_failed = 1;
        assert_eq!(exit_code(&summary), 1);

        summary.interrupted = true;
        assert_eq!(exit_code(&summary), 130);
    }
}
