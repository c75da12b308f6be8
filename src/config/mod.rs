//! Configuration management for `tracker`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. Explicit overrides
//! 2. Environment variables (`TRACKER_*`)
//! 3. Project config (`<dir>/config.yaml`)
//! 4. User config (~/.config/tracker/config.yaml)
//! 5. Defaults
//!
//! Keys are normalized to lowercase kebab-case, so `busy_timeout_ms`,
//! `BUSY_TIMEOUT_MS` and `busy-timeout-ms` are the same key.

use crate::error::{Result, TrackerError};
use crate::storage::SqliteStorage;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default database filename, relative to the config directory.
pub const DEFAULT_DB_FILENAME: &str = "tracker.db";
/// Default wait on a locked database.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

const ENV_PREFIX: &str = "TRACKER_";
const KEY_DATABASE: &str = "database";
const KEY_BUSY_TIMEOUT: &str = "busy-timeout-ms";
const KEY_LOG_LEVEL: &str = "log-level";

/// A flat set of configuration values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `TRACKER_*` variables; other names are ignored.
    #[must_use]
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.insert(stripped, value);
            }
        }
        layer
    }

    pub fn insert(&mut self, key: &str, value: String) {
        self.values.insert(normalize_key(key), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&String> {
        self.values.get(&normalize_key(key))
    }
}

/// Explicit overrides, applied above every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<PathBuf>,
    pub busy_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.database {
            layer.insert(KEY_DATABASE, path.to_string_lossy().to_string());
        }
        if let Some(timeout) = self.busy_timeout_ms {
            layer.insert(KEY_BUSY_TIMEOUT, timeout.to_string());
        }
        if let Some(level) = &self.log_level {
            layer.insert(KEY_LOG_LEVEL, level.clone());
        }

        layer
    }
}

/// Resolved settings for opening the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    pub busy_timeout: Duration,
    pub log_level: Option<String>,
}

impl StoreConfig {
    /// Resolve settings from a merged layer. Relative database paths are
    /// taken relative to `config_dir`.
    ///
    /// # Errors
    ///
    /// Returns a config error if `busy-timeout-ms` is not a whole number.
    pub fn from_layer(layer: &ConfigLayer, config_dir: &Path) -> Result<Self> {
        let database = layer
            .get(KEY_DATABASE)
            .map_or(DEFAULT_DB_FILENAME, String::as_str)
            .trim();
        let database = if database.is_empty() {
            DEFAULT_DB_FILENAME
        } else {
            database
        };
        let candidate = PathBuf::from(database);
        let database_path = if candidate.is_absolute() {
            candidate
        } else {
            config_dir.join(candidate)
        };

        let busy_timeout_ms = match layer.get(KEY_BUSY_TIMEOUT) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                TrackerError::Config(format!("{KEY_BUSY_TIMEOUT} must be a whole number, got {raw:?}"))
            })?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        Ok(Self {
            database_path,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            log_level: layer.get(KEY_LOG_LEVEL).cloned(),
        })
    }
}

/// Load project config (`<dir>/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(config_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&config_dir.join("config.yaml"))
}

/// Load user config (~/.config/tracker/config.yaml).
///
/// # Errors
///
/// Returns an error if `HOME` is unset or the file cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let home = env::var("HOME").map_err(|_| TrackerError::Config("HOME not set".to_string()))?;
    let path = Path::new(&home)
        .join(".config")
        .join("tracker")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.insert(KEY_DATABASE, DEFAULT_DB_FILENAME.to_string());
    layer.insert(KEY_BUSY_TIMEOUT, DEFAULT_BUSY_TIMEOUT_MS.to_string());
    layer
}

/// Load configuration with the full precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(config_dir: &Path, overrides: &ConfigOverrides) -> Result<StoreConfig> {
    let merged = ConfigLayer::merge_layers(&[
        default_config_layer(),
        load_user_config()?,
        load_project_config(config_dir)?,
        ConfigLayer::from_env(),
        overrides.as_layer(),
    ]);
    StoreConfig::from_layer(&merged, config_dir)
}

/// Open storage at the configured path, creating its directory if needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the database cannot be opened.
pub fn open_storage(config: &StoreConfig) -> Result<SqliteStorage> {
    if let Some(parent) = config.database_path.parent() {
        fs::create_dir_all(parent)?;
    }
    SqliteStorage::open_with_timeout(&config.database_path, config.busy_timeout)
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    let mut layer = ConfigLayer::default();
    for (key, value) in flat {
        layer.insert(&key, value);
    }
    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key) = key.as_str() else {
                    continue;
                };
                let next = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_yaml(value, &next, out);
            }
        }
        _ => {
            if let Some(scalar) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), scalar);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
