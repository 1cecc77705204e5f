use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

/// Readings at or above this distance are reported as invalid by default.
/// Must match the firmware configuration.
const DEFAULT_MAX_VALID_DISTANCE_CM: u32 = 120;

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct RawConfig {
    pub serial: Serial,
    pub monitor: Option<RawMonitor>,
}

impl RawConfig {
    /// Parse the config file at the specified path.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file at {:?}", path))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read config file to string")?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn example() -> Self {
        Self {
            serial: Serial {
                port: PathBuf::from_str("/dev/ttyACM0").unwrap(),
                baudrate: 9600,
            },
            monitor: Some(RawMonitor {
                max_valid_distance_cm: Some(DEFAULT_MAX_VALID_DISTANCE_CM),
            }),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct Serial {
    /// The serial port.
    pub port: PathBuf,

    /// The baud rate.
    pub baudrate: u32,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct RawMonitor {
    /// Readings at or above this distance (in cm) are counted as invalid
    pub max_valid_distance_cm: Option<u32>,
}

#[derive(Debug)]
pub struct Config {
    pub serial: Serial,
    pub monitor: Monitor,
}

#[derive(Debug, PartialEq)]
pub struct Monitor {
    pub max_valid_distance_cm: u32,
}

impl TryFrom<RawConfig> for Config {
    type Error = anyhow::Error;

    fn try_from(raw_config: RawConfig) -> Result<Self, Self::Error> {
        if raw_config.serial.baudrate == 0 {
            bail!("Invalid serial baud rate: 0");
        }

        let max_valid_distance_cm = raw_config
            .monitor
            .and_then(|monitor| monitor.max_valid_distance_cm)
            .unwrap_or(DEFAULT_MAX_VALID_DISTANCE_CM);
        if max_valid_distance_cm == 0 {
            bail!("Invalid max valid distance: 0 cm");
        }

        Ok(Config {
            serial: raw_config.serial,
            monitor: Monitor {
                max_valid_distance_cm,
            },
        })
    }
}
