//! Configuration for the vehicle telemetry client
//!
//! Loads configuration from a TOML file with a single [vehicle] section:
//! region, wire protocol, optional command PIN, and the status cache TTL.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::units::Region;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub vehicle: VehicleConfig,
}

/// Vehicle and protocol settings
#[derive(Deserialize, Clone)]
pub struct VehicleConfig {
    /// Vendor region: EU, US or CA (required)
    pub region: Region,

    /// Vehicle speaks the nested CCS2 status protocol
    #[serde(default)]
    pub ccs2: bool,

    /// Account PIN forwarded with control commands
    pub pin: Option<String>,

    /// How long a cached status stays fresh (e.g. "30s", "2m")
    #[serde(default = "default_status_max_age", with = "humantime_serde")]
    pub status_max_age: Duration,
}

fn default_status_max_age() -> Duration {
    Duration::from_secs(30)
}

impl std::fmt::Debug for VehicleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("VehicleConfig")
            .field("region", &self.region)
            .field("ccs2", &self.ccs2)
            .field("pin", &self.pin.as_ref().map(|_| "***REDACTED***"))
            .field("status_max_age", &self.status_max_age)
            .finish()
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration logic (semantic validation beyond type checks)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(pin) = &self.vehicle.pin {
            if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::ValidationError(
                    "vehicle.pin must be exactly 4 digits".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
