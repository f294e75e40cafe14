//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::Ehr2RowConfig;
use super::secret_string;
use crate::domain::errors::Ehr2RowError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into Ehr2RowConfig
/// 4. Applies environment variable overrides (EHR2ROW_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use ehr2row::config::loader::load_config;
///
/// let config = load_config("ehr2row.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<Ehr2RowConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Ehr2RowError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        Ehr2RowError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: Ehr2RowConfig = toml::from_str(&contents)
        .map_err(|e| Ehr2RowError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        Ehr2RowError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| Ehr2RowError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(Ehr2RowError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Splits a queue list on whitespace or commas
pub fn parse_queue_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

/// Applies environment variable overrides using the EHR2ROW_* prefix
///
/// Environment variables follow the pattern: EHR2ROW_<SECTION>_<KEY>
/// For example: EHR2ROW_INPUT_SOURCE, EHR2ROW_OUTPUT_DEFAULT_QUEUE.
/// `DEFAULT_QUEUES` (space separated) is honoured as a fallback for
/// `EHR2ROW_OUTPUT_DEFAULT_QUEUES`.
fn apply_env_overrides(config: &mut Ehr2RowConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("EHR2ROW_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("EHR2ROW_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Input overrides
    if let Ok(val) = std::env::var("EHR2ROW_INPUT_SOURCE") {
        config.input.source = val.parse().map_err(Ehr2RowError::Configuration)?;
    }
    if let Ok(val) = std::env::var("EHR2ROW_INPUT_FOLDER") {
        config.input.folder = val;
    }
    if let Ok(val) = std::env::var("EHR2ROW_INPUT_REDIS_URL") {
        config.input.redis.url = secret_string(val);
    }
    if let Ok(val) = std::env::var("EHR2ROW_INPUT_REDIS_CHANNEL") {
        config.input.redis.channel = val;
    }

    // Rules overrides
    if let Ok(val) = std::env::var("EHR2ROW_RULES_SOURCE") {
        config.rules.source = val.parse().map_err(Ehr2RowError::Configuration)?;
    }
    if let Ok(val) = std::env::var("EHR2ROW_RULES_FOLDER") {
        config.rules.folder = val;
    }
    if let Some(ref mut pg_config) = config.rules.postgresql {
        if let Ok(val) = std::env::var("EHR2ROW_RULES_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("EHR2ROW_RULES_POSTGRESQL_TABLE") {
            pg_config.table = val;
        }
        if let Ok(val) = std::env::var("EHR2ROW_RULES_POSTGRESQL_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                pg_config.max_connections = max;
            }
        }
    }

    // Output overrides
    if let Ok(val) = std::env::var("EHR2ROW_OUTPUT_SINK") {
        config.output.sink = val.parse().map_err(Ehr2RowError::Configuration)?;
    }
    if let Ok(val) = std::env::var("EHR2ROW_OUTPUT_DEFAULT_QUEUE") {
        config.output.default_queue = val;
    }
    if let Ok(val) = std::env::var("EHR2ROW_OUTPUT_DEFAULT_QUEUES")
        .or_else(|_| std::env::var("DEFAULT_QUEUES"))
    {
        config.output.default_queues = parse_queue_list(&val);
    }
    if let Ok(val) = std::env::var("EHR2ROW_OUTPUT_REDIS_URL") {
        config.output.redis.url = secret_string(val);
    }

    // Processing overrides
    if let Ok(val) = std::env::var("EHR2ROW_PROCESSING_MAX_CONCURRENT_DOCUMENTS") {
        if let Ok(max) = val.parse() {
            config.processing.max_concurrent_documents = max;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("EHR2ROW_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("EHR2ROW_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("EHR2ROW_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{InputSource, SinkKind};
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Environment variables are process-wide
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_substitute_env_vars() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("EHR2ROW_TEST_VAR", "test_value");
        let input = "url = \"${EHR2ROW_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "url = \"test_value\"");
        std::env::remove_var("EHR2ROW_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("EHR2ROW_MISSING_VAR");
        let input = "url = \"${EHR2ROW_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("EHR2ROW_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let input = "# url = \"${EHR2ROW_NOT_SET_IN_COMMENT}\"\nkey = 1";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn test_parse_queue_list() {
        assert_eq!(parse_queue_list("a b  c"), vec!["a", "b", "c"]);
        assert_eq!(parse_queue_list("a,b"), vec!["a", "b"]);
        assert!(parse_queue_list("   ").is_empty());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(Ehr2RowError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let toml_content = r#"
[application]
log_level = "debug"

[input]
source = "redis"

[input.redis]
url = "redis://localhost:6379"
channel = "incoming"

[output]
sink = "queue"
default_queue = "rows"
default_queues = ["person", "visit"]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.input.source, InputSource::Redis);
        assert_eq!(config.input.redis.channel, "incoming");
        assert_eq!(config.output.sink, SinkKind::Queue);
        assert_eq!(config.output.default_queue, "rows");
        assert_eq!(config.output.default_queues, vec!["person", "visit"]);
    }
}
