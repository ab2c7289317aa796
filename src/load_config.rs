/// `load_config` module: merges the optional YAML config file, CLI flags and
/// environment into the internal [`UploaderConfig`].
///
/// # Precedence
/// CLI flags win over the YAML file, the YAML file wins over environment
/// variables, and environment variables win over the built-in defaults.
///
/// # Environment
/// - `GOOGLE_APPLICATION_CREDENTIALS`: credential file when none is configured
/// - `FIRESTORE_EMULATOR_HOST`: talk to a local emulator instead of Google
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI
/// boundary.
use anyhow::Result;
use outfit_rules_core::collection::CollectionId;
use outfit_rules_core::upload::ErrorPolicy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_CREDENTIALS: &str = "ootd-project_service_account_key.json";
pub const DEFAULT_COLLECTION: &str = "outfit_rules";
pub const DEFAULT_RULES: &str = "lib/outfit_rules.json";
pub const DEFAULT_DATABASE: &str = "(default)";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const EMULATOR_HOST_ENV: &str = "FIRESTORE_EMULATOR_HOST";

/// Keys accepted in the YAML config file. All are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub credentials: Option<PathBuf>,
    pub collection: Option<String>,
    pub rules: Option<PathBuf>,
    pub database: Option<String>,
    pub project_id: Option<String>,
    pub timeout_secs: Option<u64>,
    pub continue_on_error: Option<bool>,
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub credentials: Option<PathBuf>,
    pub collection: Option<String>,
    pub rules: Option<PathBuf>,
    pub project_id: Option<String>,
    pub continue_on_error: bool,
}

#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub credentials: PathBuf,
    pub collection: CollectionId,
    pub rules: PathBuf,
    pub database: String,
    pub project_id: Option<String>,
    pub timeout: Duration,
    pub policy: ErrorPolicy,
    pub emulator_host: Option<String>,
}

/// Reads and parses a YAML config file.
pub fn read_config_file<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid, empty config.
    if config_content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Builds the effective configuration for one upload run.
pub fn load_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<UploaderConfig> {
    let file = match path {
        Some(p) => read_config_file(p)?,
        None => FileConfig::default(),
    };

    let credentials = overrides
        .credentials
        .or(file.credentials)
        .or_else(|| env_non_empty(CREDENTIALS_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS));

    let collection_raw = overrides
        .collection
        .or(file.collection)
        .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
    let collection = CollectionId::parse(&collection_raw).map_err(|e| {
        error!(error = %e, "Rejected collection id");
        e
    })?;

    let rules = overrides
        .rules
        .or(file.rules)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES));

    let policy = if overrides.continue_on_error || file.continue_on_error.unwrap_or(false) {
        ErrorPolicy::ContinueOnError
    } else {
        ErrorPolicy::AbortOnFirst
    };

    let timeout_secs = file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        anyhow::bail!("timeout_secs must be greater than zero");
    }

    let config = UploaderConfig {
        credentials,
        collection,
        rules,
        database: file
            .database
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        project_id: overrides.project_id.or(file.project_id),
        timeout: Duration::from_secs(timeout_secs),
        policy,
        emulator_host: env_non_empty(EMULATOR_HOST_ENV),
    };

    info!(
        collection = %config.collection,
        rules = %config.rules.display(),
        credentials = %config.credentials.display(),
        emulator = config.emulator_host.is_some(),
        policy = ?config.policy,
        "Config loaded and merged successfully"
    );
    Ok(config)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

