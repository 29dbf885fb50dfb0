//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{JobStoreBackend, PortaConfig};
use super::secret::secret_string;
use crate::domain::errors::PortaError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into PortaConfig
/// 4. Applies environment variable overrides (PORTA_* prefix)
/// 5. Validates the configuration
///
/// A `.env` file, if present, is loaded by the binary before this runs.
///
/// # Errors
///
/// Returns `PortaError::Configuration` if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - An override cannot be parsed
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use porta::config::loader::load_config;
///
/// let config = load_config("porta.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<PortaConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PortaError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        PortaError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text (substitution, overrides, validation)
///
/// # Errors
///
/// Same as [`load_config`], minus file access.
pub fn parse_config(contents: &str) -> Result<PortaConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: PortaConfig = toml::from_str(&contents)
        .map_err(|e| PortaError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        PortaError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| PortaError::Configuration(format!("Invalid substitution pattern: {e}")))?;
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
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
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
        return Err(PortaError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_parsed<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env(name)
        .map(|val| {
            val.trim().parse::<T>().map_err(|e| {
                PortaError::Configuration(format!("Invalid value '{val}' for {name}: {e}"))
            })
        })
        .transpose()
}

/// Applies environment variable overrides using PORTA_* prefix
///
/// Environment variables follow the pattern: PORTA_<SECTION>_<KEY>
/// For example: PORTA_WORKER_POLL_INTERVAL_MS, PORTA_CRYPTO_KEY
fn apply_env_overrides(config: &mut PortaConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env("PORTA_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Worker overrides
    if let Some(val) = env("PORTA_WORKER_WORKER_ID") {
        config.worker.worker_id = Some(val);
    }
    if let Some(val) = env_parsed("PORTA_WORKER_POLL_INTERVAL_MS")? {
        config.worker.poll_interval_ms = val;
    }
    if let Some(val) = env_parsed("PORTA_WORKER_MAX_JOBS")? {
        config.worker.max_jobs = val;
    }
    if let Some(val) = env_parsed("PORTA_WORKER_SHUTDOWN_TIMEOUT_SECS")? {
        config.worker.shutdown_timeout_secs = val;
    }

    // Transfer overrides
    if let Some(val) = env_parsed("PORTA_TRANSFER_MAX_EXPORT_PAGES")? {
        config.transfer.max_export_pages = val;
    }
    if let Some(val) = env_parsed("PORTA_TRANSFER_MAX_JOB_DURATION_SECS")? {
        config.transfer.max_job_duration_secs = val;
    }

    // Job store overrides
    if let Some(val) = env("PORTA_JOB_STORE_BACKEND") {
        config.job_store.backend = match val.trim().to_lowercase().as_str() {
            "memory" => JobStoreBackend::Memory,
            "postgresql" | "postgres" => JobStoreBackend::PostgreSQL,
            other => {
                return Err(PortaError::Configuration(format!(
                    "Invalid PORTA_JOB_STORE_BACKEND '{other}' (expected memory or postgresql)"
                )))
            }
        };
    }
    if let Some(val) = env("PORTA_JOB_STORE_STREAM_DIR") {
        config.job_store.stream_dir = val.into();
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg_config) = config.postgresql {
        if let Some(val) = env("PORTA_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Some(val) = env_parsed("PORTA_POSTGRESQL_MAX_CONNECTIONS")? {
            pg_config.max_connections = val;
        }
        if let Some(val) = env("PORTA_POSTGRESQL_SSL_MODE") {
            pg_config.ssl_mode = val;
        }
    }

    // Crypto overrides
    if let Some(val) = env_parsed("PORTA_CRYPTO_TRANSFORMATION")? {
        config.crypto.transformation = val;
    }
    if let Some(val) = env("PORTA_CRYPTO_KEY") {
        config.crypto.key = secret_string(val);
    }

    // Generic importer overrides (only if configured)
    if let Some(ref mut generic) = config.generic {
        if let Some(val) = env("PORTA_GENERIC_BASE_URL") {
            generic.base_url = val;
        }
        if let Some(val) = env_parsed("PORTA_GENERIC_TIMEOUT_SECONDS")? {
            generic.timeout_seconds = val;
        }
    }

    // Logging overrides
    if let Some(val) = env_parsed("PORTA_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Some(val) = env("PORTA_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env("PORTA_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
