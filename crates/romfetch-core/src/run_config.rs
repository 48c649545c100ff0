//! Run configuration: which devices to fetch, where to store them, and whether
//! to clear the directory first.
//!
//! Built either from explicit CLI values or from a run file passed with
//! `--conf`. The run file keeps the `[device]` / `[location]` layout:
//!
//! ```toml
//! [device]
//! device_name = "bacon,oneplus3"
//!
//! [location]
//! saved_to_dir = "/srv/roms"
//! remove_old_rom = true
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read run config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse run config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("run config {path} lists no device in [device] device_name")]
    NoDevices { path: PathBuf },
}

/// One device to fetch, with the directory it lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub device: String,
    pub target_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Devices in processing order.
    pub devices: Vec<String>,
    pub target_dir: PathBuf,
    /// Clear `target_dir` before the first device is processed.
    pub remove_old: bool,
    /// Treat any per-device failure as a failed run (single-device simple form).
    pub strict: bool,
}

#[derive(Debug, Deserialize)]
struct RunFile {
    device: DeviceSection,
    location: LocationSection,
}

#[derive(Debug, Deserialize)]
struct DeviceSection {
    device_name: DeviceNames,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeviceNames {
    Csv(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct LocationSection {
    saved_to_dir: PathBuf,
    #[serde(default)]
    remove_old_rom: bool,
}

/// Split a comma-separated device list, trimming blanks and dropping empty names.
pub fn split_device_names(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl DeviceNames {
    fn into_vec(self) -> Vec<String> {
        match self {
            DeviceNames::Csv(s) => split_device_names(&s),
            DeviceNames::List(v) => v
                .iter()
                .flat_map(|s| split_device_names(s))
                .collect(),
        }
    }
}

impl RunConfig {
    /// A single explicitly named device.
    pub fn single(device: impl Into<String>, target_dir: impl Into<PathBuf>, remove_old: bool) -> Self {
        Self {
            devices: vec![device.into()],
            target_dir: target_dir.into(),
            remove_old,
            strict: false,
        }
    }

    /// Load a run file. `remove_flag` (from `--remove-old-rom`) is OR-ed with the
    /// file's `remove_old_rom`.
    pub fn from_run_file(path: &Path, remove_flag: bool) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&data, path, remove_flag)
    }

    fn from_toml(data: &str, path: &Path, remove_flag: bool) -> Result<Self, ConfigError> {
        let file: RunFile = toml::from_str(data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let devices = file.device.device_name.into_vec();
        if devices.is_empty() {
            return Err(ConfigError::NoDevices {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            devices,
            target_dir: file.location.saved_to_dir,
            remove_old: remove_flag || file.location.remove_old_rom,
            strict: false,
        })
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn requests(&self) -> impl Iterator<Item = DeviceRequest> + '_ {
        self.devices.iter().map(move |device| DeviceRequest {
            device: device.clone(),
            target_dir: self.target_dir.clone(),
        })
    }
}
