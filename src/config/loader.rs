//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::SluiceConfig;
use super::secret::secret_string;
use crate::core::ingest::LoadStrategyKind;
use crate::domain::errors::SluiceError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Environment variable naming the mover's source bucket
pub const SOURCE_BUCKET_ENV: &str = "SOURCE_BUCKET";

/// Environment variable naming the mover's destination bucket
pub const DESTINATION_BUCKET_ENV: &str = "DESTINATION_BUCKET";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into SluiceConfig
/// 4. Applies environment variable overrides (SLUICE_* prefix, plus the
///    mover's SOURCE_BUCKET / DESTINATION_BUCKET)
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
/// use sluice::config::loader::load_config;
///
/// let config = load_config("sluice.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<SluiceConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SluiceError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SluiceError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: SluiceConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        SluiceError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left alone.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SluiceError::Configuration(format!("Invalid substitution pattern: {e}")))?;
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
        return Err(SluiceError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_strategy(value: &str) -> Result<LoadStrategyKind> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|_| {
        SluiceError::Configuration(format!(
            "Invalid SLUICE_INGEST_LOAD_STRATEGY '{value}'. Must be one of: external_table, bulk_load, streaming_insert"
        ))
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    value.trim().parse().map_err(|_| {
        SluiceError::Configuration(format!("Invalid {name} '{value}'. Must be true or false"))
    })
}

/// Applies environment variable overrides
///
/// Environment variables follow the pattern: SLUICE_<SECTION>_<KEY>
/// For example: SLUICE_INGEST_LOAD_STRATEGY, SLUICE_COSMOSDB_KEY
fn apply_env_overrides(config: &mut SluiceConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("SLUICE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("SLUICE_APPLICATION_SETTINGS_PATH") {
        config.application.settings_path = val;
    }
    if let Ok(val) = std::env::var("SLUICE_APPLICATION_DRY_RUN") {
        config.application.dry_run = parse_bool("SLUICE_APPLICATION_DRY_RUN", &val)?;
    }

    // Ingest overrides
    if let Ok(val) = std::env::var("SLUICE_INGEST_LOAD_STRATEGY") {
        config.ingest.load_strategy = parse_strategy(&val)?;
    }
    if let Ok(val) = std::env::var("SLUICE_INGEST_TABLE_PREFIX") {
        config.ingest.table_prefix = val;
    }
    if let Ok(val) = std::env::var("SLUICE_INGEST_LEDGER_COLLECTION") {
        config.ingest.ledger_collection = val;
    }
    if let Ok(val) = std::env::var("SLUICE_INGEST_STREAMING_DEADLINE_SECONDS") {
        if let Ok(secs) = val.parse() {
            config.ingest.streaming_deadline_seconds = secs;
        }
    }

    // Mover buckets come from the trigger's deployment environment
    if let Ok(val) = std::env::var(SOURCE_BUCKET_ENV) {
        config.mover.source_bucket = Some(val);
    }
    if let Ok(val) = std::env::var(DESTINATION_BUCKET_ENV) {
        config.mover.destination_bucket = Some(val);
    }

    // Object storage and notification overrides
    if let Ok(val) = std::env::var("SLUICE_GCS_ENDPOINT") {
        config.gcs.endpoint = val;
    }
    if let Ok(val) = std::env::var("SLUICE_GCS_ACCESS_TOKEN") {
        config.gcs.access_token = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("SLUICE_PUBSUB_ENDPOINT") {
        config.pubsub.endpoint = val;
    }
    if let Ok(val) = std::env::var("SLUICE_PUBSUB_ACCESS_TOKEN") {
        config.pubsub.access_token = Some(secret_string(val));
    }

    // Cosmos DB overrides (only if configured)
    if let Some(ref mut cosmos_config) = config.cosmosdb {
        if let Ok(val) = std::env::var("SLUICE_COSMOSDB_ENDPOINT") {
            cosmos_config.endpoint = val;
        }
        if let Ok(val) = std::env::var("SLUICE_COSMOSDB_KEY") {
            cosmos_config.key = secret_string(val);
        }
        if let Ok(val) = std::env::var("SLUICE_COSMOSDB_DATABASE_NAME") {
            cosmos_config.database_name = val;
        }
    }

    // PostgreSQL overrides (only if configured)
    if let Some(ref mut pg_config) = config.postgresql {
        if let Ok(val) = std::env::var("SLUICE_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("SLUICE_POSTGRESQL_SSL_MODE") {
            pg_config.ssl_mode = val;
        }
        if let Ok(val) = std::env::var("SLUICE_POSTGRESQL_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                pg_config.max_connections = max;
            }
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("SLUICE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_bool("SLUICE_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("SLUICE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
