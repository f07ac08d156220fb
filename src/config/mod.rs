//! Server configuration: typed TOML sections, defaults, and startup
//! validation. Split across submodules the way the sections themselves
//! are split in the TOML file; `Config` itself is assembled here since it
//! is the one struct every other module needs a reference to.

mod defaults;
mod types;
mod validation;

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub use types::{
    ChannelsSection, DatabaseSection, DirectorySection, HistorySection, ListenSection, LogFormat,
    LoggingSection, LimitsSection, MetricsSection, RateLimitSection, ServerSection, SshSection,
    TlsSection,
};
pub use validation::{validate, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    pub server: ServerSection,
    #[serde(default)]
    pub listen: ListenSection,
    #[serde(default)]
    pub tls: TlsSection,
    #[serde(default)]
    pub ssh: SshSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub channels: ChannelsSection,
    #[serde(default)]
    pub directory: DirectorySection,
    #[serde(default)]
    pub metrics: MetricsSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

// `ServerSection` has no sensible all-defaults instance (an operator must
// at least consider a server name), but Config as a whole derives Default
// for tests; give it one explicitly.
impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: defaults::default_server_name(),
            network: defaults::default_network_name(),
            description: defaults::default_description(),
            admin_nickname: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path_str.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path_str,
            source,
        })
    }
}
