//! YAML configuration shared by the daemon and `logctl`.
//!
//! ```yaml
//! socket: /run/loggerd.sock
//! output: /var/log/messages
//! level: info          # any severity alias, or 0-7
//! buffer_records: 1024
//! ```
//!
//! A missing file is not an error; every field has a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::severity::Severity;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/loggerd.yaml";
pub const DEFAULT_SOCKET_PATH: &str = "/run/loggerd.sock";
pub const DEFAULT_BUFFER_RECORDS: usize = 1024;

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_ENV: &str = "LOGGERD_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    /// Socket the daemon listens on and clients connect to.
    pub socket: PathBuf,
    /// Primary output file; records are buffered in memory until set.
    pub output: Option<PathBuf>,
    /// Least severe level the daemon keeps.
    pub level: Severity,
    /// Records held in memory before an output is opened.
    pub buffer_records: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET_PATH),
            output: None,
            level: Severity::Info,
            buffer_records: DEFAULT_BUFFER_RECORDS,
        }
    }
}

impl LoggerConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `$LOGGERD_CONFIG`, or [`DEFAULT_CONFIG_PATH`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&config_path())
    }
}

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
