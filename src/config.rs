// ABOUTME: Configuration for session timing policy
// Loaded once from ~/.session-box/config.toml or a key/value source; bad values fall back to defaults

use crate::session::error::SessionError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key for the resume delay, in milliseconds.
pub const RESUME_DELAY_CONFIG_KEY: &str = "sessionResumeDelay";
/// Key for the restart delay, in milliseconds.
pub const RESTART_DELAY_CONFIG_KEY: &str = "sessionRestartDelay";
/// Resume delay when unset or invalid.
pub const DEFAULT_RESUME_DELAY_MS: u64 = 5_000;
/// Restart delay when unset or invalid.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 30_000;

/// Timing thresholds for the session state machine, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Longest pause after which `resume` still continues the same session.
    pub resume_delay_ms: u64,
    /// Read and exposed, but no transition is gated on it.
    pub restart_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resume_delay_ms: DEFAULT_RESUME_DELAY_MS,
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
        }
    }
}

impl SessionConfig {
    /// Explicit delays, in milliseconds.
    pub fn new(resume_delay_ms: u64, restart_delay_ms: u64) -> Self {
        Self {
            resume_delay_ms,
            restart_delay_ms,
        }
    }

    /// Read the delays from a TOML table holding the camelCase keys.
    pub fn from_table(table: &toml::Table) -> Self {
        let read = |key: &str, default: u64| match table.get(key) {
            None => default,
            Some(value) => match value.as_integer() {
                Some(ms) => delay_or_default(key, ms, default),
                None => {
                    warn!("Config value {} = {} is not an integer, using {}", key, value, default);
                    default
                }
            },
        };

        Self {
            resume_delay_ms: read(RESUME_DELAY_CONFIG_KEY, DEFAULT_RESUME_DELAY_MS),
            restart_delay_ms: read(RESTART_DELAY_CONFIG_KEY, DEFAULT_RESTART_DELAY_MS),
        }
    }

    /// Read the delays from string properties, e.g. an environment or remote config.
    pub fn from_properties(properties: &HashMap<String, String>) -> Self {
        let read = |key: &str, default: u64| match properties.get(key) {
            None => default,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(ms) => delay_or_default(key, ms, default),
                Err(_) => {
                    warn!("Config value {} = {:?} is not an integer, using {}", key, raw, default);
                    default
                }
            },
        };

        Self {
            resume_delay_ms: read(RESUME_DELAY_CONFIG_KEY, DEFAULT_RESUME_DELAY_MS),
            restart_delay_ms: read(RESTART_DELAY_CONFIG_KEY, DEFAULT_RESTART_DELAY_MS),
        }
    }
}

fn delay_or_default(key: &str, ms: i64, default: u64) -> u64 {
    u64::try_from(ms).unwrap_or_else(|_| {
        warn!("Config value {} = {} is negative, using {}", key, ms, default);
        default
    })
}

/// Application configuration file.
///
/// ```toml
/// [session]
/// sessionResumeDelay = 5000
/// sessionRestartDelay = 30000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// The `[session]` table.
    pub session: SessionConfig,
}

impl AppConfig {
    /// Default config location, `~/.session-box/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".session-box").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults on any problem.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            debug!("No home directory, using default config");
            return Self::default();
        };
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            warn!("Failed to load config {:?}: {}, using defaults", path, e);
            Self::default()
        })
    }

    /// Load from an explicit file. Unreadable or malformed files are errors.
    pub fn load_from(path: &Path) -> Result<Self, SessionError> {
        let content = fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self, SessionError> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| SessionError::Config(e.to_string()))?;

        let session = match table.get("session") {
            None => SessionConfig::default(),
            Some(toml::Value::Table(section)) => SessionConfig::from_table(section),
            Some(other) => {
                warn!("[session] must be a table, found {}", other.type_str());
                SessionConfig::default()
            }
        };

        Ok(Self { session })
    }
}
