//! Configuration file handling
//!
//! Configuration lives in `$XDG_CONFIG_HOME/camwatch/config.toml`. A missing
//! file is not an error: every field has a default matching the stock
//! `/dev/video*` setup.

use crate::device::{DeviceClass, DEFAULT_DEVICE_DIR, DEFAULT_DEVICE_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub devices: DevicesConfig,
    pub scan: ScanConfig,
    pub rearm: RearmConfig,
    pub hooks: HooksConfig,
}

/// Which device nodes are monitored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Directory holding device nodes
    pub directory: PathBuf,
    /// File name prefix of video devices
    pub prefix: String,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DEVICE_DIR),
            prefix: DEFAULT_DEVICE_PREFIX.to_string(),
        }
    }
}

/// Process table scanning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Root of the process table
    pub proc_root: PathBuf,
    /// Quiescence window before a rescan runs
    pub debounce_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            debounce_ms: 500,
        }
    }
}

/// Watch re-registration after a device node is recreated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RearmConfig {
    /// Total add attempts before giving up
    pub max_attempts: u32,
    /// Delay between attempts
    pub retry_delay_ms: u64,
}

impl Default for RearmConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 1000,
        }
    }
}

/// Hook scripts run on state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Scripts run in order; command line scripts are appended
    pub scripts: Vec<PathBuf>,
    /// Environment variable carrying the action
    pub action_var: String,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            scripts: Vec::new(),
            action_var: "ACTION".to_string(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("camwatch").join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location
    ///
    /// A missing file at the default location yields defaults. An explicitly
    /// given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text (no validation)
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Check all values are within their valid ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.devices.directory.is_absolute() {
            return Err(invalid("devices.directory", "must be an absolute path"));
        }
        if self.devices.prefix.is_empty() {
            return Err(invalid("devices.prefix", "must not be empty"));
        }
        if !self.scan.proc_root.is_absolute() {
            return Err(invalid("scan.proc_root", "must be an absolute path"));
        }
        if !(10..=60_000).contains(&self.scan.debounce_ms) {
            return Err(invalid("scan.debounce_ms", "must be between 10 and 60000"));
        }
        if !(1..=100).contains(&self.rearm.max_attempts) {
            return Err(invalid("rearm.max_attempts", "must be between 1 and 100"));
        }
        if self.rearm.retry_delay_ms > 60_000 {
            return Err(invalid("rearm.retry_delay_ms", "must be at most 60000"));
        }
        if self.hooks.action_var.is_empty() || self.hooks.action_var.contains('=') {
            return Err(invalid("hooks.action_var", "must be a non-empty variable name"));
        }
        Ok(())
    }

    /// Device classifier built from the `[devices]` section
    pub fn device_class(&self) -> DeviceClass {
        DeviceClass::new(self.devices.directory.clone(), self.devices.prefix.clone())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.scan.debounce_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.rearm.retry_delay_ms)
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Example config file with every key at its default
    pub fn example() -> &'static str {
        r#"# camwatch configuration

[devices]
# Directory holding device nodes
directory = "/dev"
# File name prefix of monitored devices
prefix = "video"

[scan]
# Process table root
proc_root = "/proc"
# Quiet period before rescanning the process table (10-60000)
debounce_ms = 500

[rearm]
# Attempts to watch a newly created device node (1-100)
max_attempts = 5
# Delay between attempts (0-60000)
retry_delay_ms = 1000

[hooks]
# Scripts run on every transition, before scripts given on the command line
scripts = []
# Environment variable set to OPEN or CLOSE
action_var = "ACTION"
"#
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}
