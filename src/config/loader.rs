//! Configuration loading
//!
//! Layers defaults, an optional TOML file and `BOOKIE_*` environment
//! overrides, then validates the result.

use crate::{Result, config::Settings};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming a config file when none is passed explicitly
pub const CONFIG_PATH_ENV: &str = "BOOKIE_CONFIG";

/// Configuration loader with multiple source support
#[derive(Debug)]
pub struct ConfigLoader {
    defaults: Settings,
}

impl ConfigLoader {
    /// Loader starting from [`Settings::default`]
    pub fn new() -> Self {
        Self::with_defaults(Settings::default())
    }

    /// Loader starting from custom defaults
    pub fn with_defaults(defaults: Settings) -> Self {
        Self { defaults }
    }

    /// Resolve settings, lowest precedence first:
    /// 1. Defaults
    /// 2. TOML file (`config_file`, else `BOOKIE_CONFIG`)
    /// 3. Environment overrides
    ///
    /// Command line flags are applied by the caller afterwards. A file that
    /// does not exist is skipped with a warning.
    pub fn load(&self, config_file: Option<&Path>) -> Result<Settings> {
        let path = config_file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let settings = match path.as_deref() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Settings::from_file(path)?
            }
            Some(path) => {
                warn!("Configuration file {} not found, using defaults", path.display());
                self.defaults.clone()
            }
            None => self.defaults.clone(),
        };

        let settings = settings.merge_with_env()?;
        settings.validate()?;

        debug!(
            concurrency = settings.refresh.concurrency,
            cache_fallback = settings.session.cache_fallback,
            dedup_mode = ?settings.dedup.mode,
            "Configuration resolved"
        );
        Ok(settings)
    }

    /// Defaults plus environment overrides, ignoring any file
    pub fn from_env_only(&self) -> Result<Settings> {
        let settings = self.defaults.clone().merge_with_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Starting point before any source is applied
    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
