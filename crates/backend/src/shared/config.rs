use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Per-network transport settings, keyed by network slug
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// How often the scheduler looks for due schedules
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Number of concurrent sync job workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// How often counter windows are checked for rotation
    #[serde(default = "default_rotation_interval_seconds")]
    pub rotation_interval_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            worker_count: default_worker_count(),
            rotation_interval_seconds: default_rotation_interval_seconds(),
        }
    }
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_worker_count() -> usize {
    2
}

fn default_rotation_interval_seconds() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Shared secret for networks that wrap search payloads in an
    /// encrypted envelope
    pub envelope_key: Option<String>,
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/app.db"

[scheduler]
interval_seconds = 60
worker_count = 2
rotation_interval_seconds = 300

[networks.omolaat]
base_url = "https://app.omolaat.com"
timeout_seconds = 30
envelope_key = ""

[networks.marketeers]
base_url = "https://dash.marketeers.io"
timeout_seconds = 30
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&contents)?;
                return Ok(config);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    Ok(PathBuf::from(db_path_str))
}
