//! Effective configuration: config file plus command line overrides

use camwatch_core::{Config, ConfigError};
use std::path::{Path, PathBuf};

/// Command line values layered over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Replaces `devices.directory`
    pub device_dir: Option<PathBuf>,
    /// Appended after `hooks.scripts`
    pub scripts: Vec<PathBuf>,
}

impl Overrides {
    /// Apply on top of `config` and re-validate
    pub fn apply(self, mut config: Config) -> Result<Config, ConfigError> {
        if let Some(dir) = self.device_dir {
            config.devices.directory = dir;
        }
        config.hooks.scripts.extend(self.scripts);
        config.validate()?;
        Ok(config)
    }
}

/// Load the config file (or defaults) and apply overrides
pub fn resolve(config_path: Option<&Path>, overrides: Overrides) -> Result<Config, ConfigError> {
    overrides.apply(Config::load(config_path)?)
}
