use std::path::PathBuf;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::error::{CacheError, CacheResult};
use crate::options::GlobalConfig;

/// Process-wide switch carried by `NETWORK_CACHE_STRATEGY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    On,
    Off,
}

/// Environment overrides for the global defaults:
/// `NETWORK_CACHE_DIR`, `NETWORK_CACHE_TTL` (minutes), and
/// `NETWORK_CACHE_STRATEGY` (`on`/`off`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub strategy: Option<CacheStrategy>,
}

impl Settings {
    pub fn load() -> CacheResult<Self> {
        let cfg = Config::builder()
            .add_source(Environment::with_prefix("NETWORK_CACHE").try_parsing(true))
            .build()
            .map_err(to_cache_error)?;
        cfg.try_deserialize().map_err(to_cache_error)
    }

    /// Overlay these settings on a config; unset variables leave the
    /// config untouched.
    pub fn apply(self, mut config: GlobalConfig) -> GlobalConfig {
        if let Some(dir) = self.dir {
            config.base_dir = dir;
        }
        if let Some(ttl) = self.ttl {
            config.ttl_minutes = Some(ttl);
        }
        if let Some(strategy) = self.strategy {
            config.disabled = strategy == CacheStrategy::Off;
        }
        config
    }
}

fn to_cache_error(err: ConfigError) -> CacheError {
    CacheError::Other(anyhow::anyhow!(err))
}
