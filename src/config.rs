//! Configuration directory layout and the optional `config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use dirs::home_dir;
use serde::{Deserialize, Serialize};

use crate::error::{DriveError, Result};

/// Configuration directory name
const CONFIG_DIR: &str = "gcmd";

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// OAuth client secrets or service account key
const CREDENTIALS_FILE: &str = "credentials.json";

/// Cached authorized-user token
const TOKEN_FILE: &str = "token.json";

/// Settings read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rate-limit handling for multi-artifact exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_inter_request_delay")]
    pub inter_request_delay_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            inter_request_delay_ms: default_inter_request_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_order_by")]
    pub order_by: String,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            order_by: default_order_by(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_max_retries() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    1000
}

fn default_inter_request_delay() -> u64 {
    1000
}

fn default_max_results() -> u32 {
    20
}

fn default_order_by() -> String {
    "modifiedTime desc".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Locations of everything gcmd keeps on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub dir: PathBuf,
}

impl ConfigPaths {
    /// `$XDG_CONFIG_HOME/gcmd`, falling back to `~/.config/gcmd`.
    pub fn discover() -> Result<Self> {
        let base = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => home_dir()
                .ok_or_else(|| {
                    DriveError::AuthenticationError(
                        "Cannot determine home directory".to_string(),
                    )
                })?
                .join(".config"),
        };
        Ok(Self::in_dir(base.join(CONFIG_DIR)))
    }

    pub fn in_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    pub fn token_file(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    /// Create the directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl Config {
    /// Load `config.toml`, or defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.export.max_retries, 5);
        assert_eq!(config.list.max_results, 20);
        assert_eq!(config.list.order_by, "modifiedTime desc");
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[export]\nmax_retries = 2\n\n[logging]\nlevel = \"debug\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.export.max_retries, 2);
        assert_eq!(config.export.inter_request_delay_ms, 1000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[export\nmax_retries = ").unwrap();
        assert!(matches!(Config::load(&path), Err(DriveError::Config(_))));
    }

    #[test]
    fn test_paths() {
        let paths = ConfigPaths::in_dir("/tmp/gcmd-test");
        assert_eq!(paths.token_file(), PathBuf::from("/tmp/gcmd-test/token.json"));
        assert_eq!(
            paths.credentials_file(),
            PathBuf::from("/tmp/gcmd-test/credentials.json")
        );
    }
}
