//! Integration tests for logging setup
//!
//! Only one global subscriber can be installed per process, so every test
//! here either fails before installing one or is the single installer.

use ehr2row::config::LoggingConfig;
use ehr2row::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_defaults() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert!(!config.local_path.is_empty());
}

#[test]
fn test_invalid_level_is_rejected() {
    let result = init_logging("verbose", &LoggingConfig::default());
    assert!(result.is_err());
}

#[test]
fn test_invalid_rotation_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = LoggingConfig {
        local_enabled: true,
        local_path: dir.path().display().to_string(),
        local_rotation: "weekly".to_string(),
    };
    assert!(init_logging("info", &config).is_err());
}

#[test]
fn test_file_logging_creates_directory() {
    let dir = TempDir::new().unwrap();
    let log_dir = dir.path().join("logs");
    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_dir.display().to_string(),
        local_rotation: "never".to_string(),
    };

    let guard = init_logging("debug", &config).unwrap();
    tracing::info!(template_id = "1001", "Logging integration test");
    drop(guard);

    assert!(log_dir.is_dir());
}
