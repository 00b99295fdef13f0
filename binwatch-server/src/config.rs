//! Environment-driven server configuration.
//!
//! Variables may also come from a `.env` file loaded before parsing:
//!
//! ```bash
//! BIND_ADDR=0.0.0.0:8080
//! GOOGLE_MAPS_API_KEY=<key>
//! DIRECTIONS_TIMEOUT_SECS=10
//! BINS_FILE=bins.json
//! ALLOWED_ORIGINS=https://dashboard.example.org
//! LOG_LEVEL=info
//! ```

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
/// Errors raised while reading the configuration.
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required variable {0}")]
    Missing(&'static str),
    /// A variable is set but cannot be used.
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Socket the HTTP server listens on.
    pub bind_addr: SocketAddr,
    /// Key for the Google Directions API.
    pub google_maps_api_key: String,
    /// Upper bound for each directions request.
    pub directions_timeout: Duration,
    /// Optional JSON file with the bins to serve.
    pub bins_file: Option<PathBuf>,
    /// Origins allowed by CORS. Empty disables cross-origin access.
    pub allowed_origins: Vec<String>,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let bind_addr = bind_raw.parse().map_err(|err: AddrParseError| {
            ConfigError::Invalid {
                key: "BIND_ADDR",
                value: bind_raw.clone(),
                reason: err.to_string(),
            }
        })?;

        let google_maps_api_key =
            get("GOOGLE_MAPS_API_KEY").ok_or(ConfigError::Missing("GOOGLE_MAPS_API_KEY"))?;

        let directions_timeout = match get("DIRECTIONS_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        key: "DIRECTIONS_TIMEOUT_SECS",
                        value: raw,
                        reason: "must be greater than zero".to_owned(),
                    });
                }
                Err(err) => {
                    return Err(ConfigError::Invalid {
                        key: "DIRECTIONS_TIMEOUT_SECS",
                        value: raw,
                        reason: err.to_string(),
                    });
                }
            },
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            google_maps_api_key,
            directions_timeout,
            bins_file: get("BINS_FILE").map(PathBuf::from),
            allowed_origins,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned()),
        })
    }
}
