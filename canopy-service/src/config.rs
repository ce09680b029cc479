//! Service configuration, loaded from TOML.
//!
//! ```toml
//! info_path = "/run/canopy/info.sock"
//! pool_size = 10
//! call_timeout_ms = 5000
//!
//! [sites.example]
//! templates_path = "/srv/canopy/example/templates"
//! ```

use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Default number of idle handles cached per service.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Settings of one site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Directory holding the site's templates.
    pub templates_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Socket path of the info daemon.
    pub info_path: String,
    /// Idle handles cached per service.
    pub pool_size: usize,
    /// Upper bound for a single RPC call (ms). Unbounded if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_timeout_ms: Option<u64>,
    pub sites: HashMap<String, SiteConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            info_path: "/run/canopy/info.sock".to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            call_timeout_ms: None,
            sites: HashMap::new(),
        }
    }
}

impl ServiceConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> ServiceResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Config(format!("could not read {}: {e}", path.display())))?;
        let config =
            Self::from_toml_str(&contents).map_err(|e| e.context(path.display()))?;
        info!(path = %path.display(), sites = config.sites.len(), "loaded service configuration");
        Ok(config)
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.info_path.trim().is_empty() {
            return Err(ServiceError::Config("info_path must not be empty".into()));
        }
        if self.pool_size == 0 {
            return Err(ServiceError::Config("pool_size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Template directory of `site`, if the site is configured.
    pub fn site_templates_path(&self, site: &str) -> Option<&Path> {
        self.sites.get(site).map(|s| s.templates_path.as_path())
    }
}
