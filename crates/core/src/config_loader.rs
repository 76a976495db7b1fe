use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::config::AppConfig;

/// Default location of the TOML configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

/// Prefix for environment overrides, e.g. `REGIME_RISK__MAX_TRADES_PER_DAY=2`.
pub const ENV_PREFIX: &str = "REGIME_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by merging built-in defaults, the TOML file at `path`
    /// (skipped when absent) and `REGIME_`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an override holds a value of the wrong type.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let config: AppConfig = Self::figment(path.as_ref()).extract()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
