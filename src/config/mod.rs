use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    calibration::gyro_average::DEFAULT_HORIZON_SECONDS,
    drivers::switch::driver::{FlashRetries, DEFAULT_READ_RETRIES, DEFAULT_WRITE_RETRIES},
};


/// Represents all possible errors loading a [SessionConfig]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// Settings applied to every device session. Every field is optional and
/// falls back to the driver defaults.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Horizon of the continuous gyro calibration, in seconds
    pub gyro_average_seconds: Option<u32>,
    /// Feed gyro samples from input reports into the continuous calibration
    pub continuous_calibration: Option<bool>,
    pub flash: Option<FlashConfig>,
}

/// SPI flash access settings
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct FlashConfig {
    /// Maximum attempts for a single flash read
    pub read_retries: Option<u32>,
    /// Retry flash reads until the device answers. Overrides `read_retries`.
    pub unbounded_reads: Option<bool>,
    /// Maximum attempts for a single flash write
    pub write_retries: Option<u32>,
}

impl SessionConfig {
    /// Load a [SessionConfig] from the given YAML string
    pub fn from_yaml(content: String) -> Result<SessionConfig, LoadError> {
        let config: SessionConfig = serde_yaml::from_str(content.as_str())?;
        Ok(config)
    }

    /// Load a [SessionConfig] from the given YAML file
    pub fn from_yaml_file(path: String) -> Result<SessionConfig, LoadError> {
        let file = std::fs::File::open(path)?;
        let config: SessionConfig = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    pub fn gyro_average_seconds(&self) -> u32 {
        self.gyro_average_seconds.unwrap_or(DEFAULT_HORIZON_SECONDS)
    }

    pub fn continuous_calibration(&self) -> bool {
        self.continuous_calibration.unwrap_or(false)
    }

    /// Resolve the flash retry policy
    pub fn flash_retries(&self) -> FlashRetries {
        let Some(flash) = self.flash.as_ref() else {
            return FlashRetries::default();
        };
        let read = if flash.unbounded_reads.unwrap_or(false) {
            None
        } else {
            Some(flash.read_retries.unwrap_or(DEFAULT_READ_RETRIES))
        };
        FlashRetries {
            read,
            write: flash.write_retries.unwrap_or(DEFAULT_WRITE_RETRIES),
        }
    }
}
