//! Application-level configuration loading: scoring rules and storage selection.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MAHJONG_LEDGER_CONFIG_PATH";
/// Raw scores of one game must add up to this (four players starting on 25000).
pub const DEFAULT_TABLE_TOTAL: i64 = 100_000;
/// Attempts at numbering a game before giving up on a contended `game_no`.
pub const DEFAULT_GAME_NO_MAX_ATTEMPTS: u32 = 5;

/// Which persistence backend the server installs at start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Mongo,
    Memory,
}

impl StorageBackend {
    /// Lowercase name as written in the configuration file.
    pub fn label(self) -> &'static str {
        match self {
            StorageBackend::Mongo => "mongo",
            StorageBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Required sum of the four raw scores of a game.
    pub table_total: i64,
    /// Number of times game numbering is attempted before reporting a conflict.
    pub game_no_max_attempts: u32,
    /// Selected storage backend.
    pub storage: StorageBackend,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        table_total = app_config.table_total,
                        storage = ?app_config.storage,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            table_total: DEFAULT_TABLE_TOTAL,
            game_no_max_attempts: DEFAULT_GAME_NO_MAX_ATTEMPTS,
            storage: StorageBackend::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    table_total: Option<i64>,
    #[serde(default)]
    game_no_max_attempts: Option<u32>,
    #[serde(default)]
    storage: Option<StorageBackend>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            table_total: value.table_total.unwrap_or(defaults.table_total),
            game_no_max_attempts: value
                .game_no_max_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.game_no_max_attempts),
            storage: value.storage.unwrap_or(defaults.storage),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
