//! Global settings loaded from `~/.config/romfetch/config.toml`.
//!
//! The file is optional; it is read when present and never created, so a run
//! leaves nothing behind besides the downloaded archives.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Catalog host used when neither settings nor `--catalog-url` override it.
pub const DEFAULT_CATALOG_URL: &str = "http://dwnld.aicp-rom.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the catalog; `?device=<name>` is appended per lookup.
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,
    /// Optional TCP connect timeout. Absent means curl's default, and a hung
    /// transfer blocks until the user interrupts it.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Optional User-Agent header for catalog and archive requests.
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            connect_timeout_secs: None,
            user_agent: None,
        }
    }
}

impl Settings {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

pub fn settings_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("romfetch")?;
    Ok(xdg_dirs.get_config_home().join("romfetch").join("config.toml"))
}

/// Load settings from the XDG config dir, falling back to defaults when the file is absent.
pub fn load() -> Result<Settings> {
    let path = settings_path()?;
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::debug!("no settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    let data =
        fs::read_to_string(path).with_context(|| format!("read settings {}", path.display()))?;
    let settings: Settings =
        toml::from_str(&data).with_context(|| format!("parse settings {}", path.display()))?;
    Ok(settings)
}
