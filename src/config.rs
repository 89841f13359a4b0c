//! Monitor configuration
//!
//! Settings come from three layers, lowest precedence first: built-in
//! defaults, an optional TOML file, and command-line flags. Each layer is a
//! [`ConfigLayer`] whose fields are all optional; [`resolve`] merges them
//! and validates the result into a [`MonitorConfig`].
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! device = "stm32"
//! duration_secs = 30
//! poll_interval_ms = 50
//! invalid = "drop"
//! ```

use crate::decode::InvalidBytes;
use crate::devices::get_profile;
use crate::error::{MonitorError, Result};
use crate::serial::{MonitorConfig, PortConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CP210x bridge as it appears on macOS
pub const DEFAULT_PORT: &str = "/dev/cu.SLAB_USBtoUART";
pub const DEFAULT_DEVICE: &str = "esp32";
pub const DEFAULT_DURATION: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One layer of partially specified settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub device: Option<String>,
    pub duration_secs: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub invalid: Option<InvalidBytes>,
    pub log_file: Option<PathBuf>,
}

impl ConfigLayer {
    /// Parse a layer from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MonitorError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| MonitorError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Fill every unset field of `self` from `lower`
    pub fn over(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            port: self.port.or(lower.port),
            baud: self.baud.or(lower.baud),
            device: self.device.or(lower.device),
            duration_secs: self.duration_secs.or(lower.duration_secs),
            timeout_ms: self.timeout_ms.or(lower.timeout_ms),
            poll_interval_ms: self.poll_interval_ms.or(lower.poll_interval_ms),
            invalid: self.invalid.or(lower.invalid),
            log_file: self.log_file.or(lower.log_file),
        }
    }
}

fn non_zero(value: Option<u64>, default: Duration, unit: fn(u64) -> Duration, what: &str) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(0) => Err(MonitorError::Config(format!("{} must be greater than zero", what))),
        Some(v) => Ok(unit(v)),
    }
}

/// Merge command-line flags over the file layer and apply defaults
pub fn resolve(cli: ConfigLayer, file: ConfigLayer) -> Result<MonitorConfig> {
    let merged = cli.over(file);

    let device_name = merged.device.as_deref().unwrap_or(DEFAULT_DEVICE);
    let profile = get_profile(device_name)
        .ok_or_else(|| MonitorError::UnknownDevice(device_name.to_string()))?;

    let baud_rate = merged.baud.unwrap_or(profile.baud_rate);
    if baud_rate == 0 {
        return Err(MonitorError::Config("baud rate must be greater than zero".into()));
    }

    let duration = non_zero(merged.duration_secs, DEFAULT_DURATION, Duration::from_secs, "duration")?;
    let timeout = non_zero(merged.timeout_ms, DEFAULT_READ_TIMEOUT, Duration::from_millis, "read timeout")?;
    let poll_interval = non_zero(
        merged.poll_interval_ms,
        DEFAULT_POLL_INTERVAL,
        Duration::from_millis,
        "poll interval",
    )?;

    let port_config = PortConfig::new(merged.port.as_deref().unwrap_or(DEFAULT_PORT))
        .with_baud_rate(baud_rate)
        .with_timeout(timeout);

    Ok(MonitorConfig {
        port_config,
        device_name: profile.name.clone(),
        duration,
        poll_interval,
        invalid: merged.invalid.unwrap_or_default(),
        log_file: merged.log_file,
    })
}
