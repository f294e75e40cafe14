//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// ehr2row - rule-driven clinical document to row transformation
#[derive(Parser, Debug)]
#[command(name = "ehr2row")]
#[command(version, about, long_about = None)]
#[command(author = "ehr2row Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ehr2row.toml", env = "EHR2ROW_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "EHR2ROW_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process the configured document source to completion
    Run(commands::run::RunArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Load rule definitions and report expressions that do not compile
    CheckRules(commands::check_rules::CheckRulesArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InputSource, SinkKind};

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["ehr2row", "run"]);
        assert_eq!(cli.config, "ehr2row.toml");
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_cli_parse_run_overrides() {
        let cli = Cli::parse_from([
            "ehr2row", "run", "--input", "folder", "--folder", "./docs", "--sink", "memory",
            "--dry-run",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.input, Some(InputSource::Folder));
        assert_eq!(args.folder.as_deref(), Some("./docs"));
        assert_eq!(args.sink, Some(SinkKind::Memory));
        assert!(args.dry_run);
    }

    #[test]
    fn test_cli_rejects_unknown_sink() {
        assert!(Cli::try_parse_from(["ehr2row", "run", "--sink", "kafka"]).is_err());
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["ehr2row", "--config", "custom.toml", "validate-config"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["ehr2row", "--log-level", "debug", "run"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_check_rules() {
        let cli = Cli::parse_from(["ehr2row", "check-rules", "--template", "1001"]);
        let Commands::CheckRules(args) = cli.command else {
            panic!("expected check-rules command");
        };
        assert_eq!(args.template.as_deref(), Some("1001"));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["ehr2row", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
