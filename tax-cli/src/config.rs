//! Fetcher settings from an optional TOML file plus command-line overrides.
//!
//! ```toml
//! base_url = "http://localhost:5001"
//! timeout_secs = 10
//! max_retries = 3
//! retry_base_delay_ms = 1000
//! supported_years = [2019, 2020, 2021, 2022]
//! ```
//!
//! Every key is optional. Precedence, highest first: command-line flag,
//! file value, [`FetcherConfig::default`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tax_core::SupportedTaxYears;
use tax_data::FetcherConfig;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub supported_years: Option<Vec<i32>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            warn!(path = %path.display(), error = %source, "failed to read config");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        toml::from_str(&content).map_err(|source| {
            warn!(path = %path.display(), error = %source, "failed to parse config");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

/// Layers `overrides` over `file` over the library defaults.
pub fn resolve(
    file: FileConfig,
    overrides: Overrides,
) -> FetcherConfig {
    let defaults = FetcherConfig::default();

    let mut config = match overrides.base_url.or(file.base_url) {
        Some(base_url) => FetcherConfig::new(base_url),
        None => defaults,
    };

    if let Some(secs) = overrides.timeout_secs.or(file.timeout_secs) {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(retries) = overrides.max_retries.or(file.max_retries) {
        config = config.with_max_retries(retries);
    }
    if let Some(ms) = file.retry_base_delay_ms {
        config = config.with_retry_base_delay(Duration::from_millis(ms));
    }
    if let Some(years) = file.supported_years {
        config = config.with_supported_years(SupportedTaxYears::new(years));
    }

    config
}
