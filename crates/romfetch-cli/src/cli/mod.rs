//! CLI for romfetch.
//!
//! Two invocation forms share one pipeline:
//!
//! - simple: `romfetch <DEVICE> <DIRECTORY>`; any failure makes the run fail;
//! - configurable: `--device-name NAME --saved-to-dir DIR` or `--conf FILE`,
//!   optionally with `--remove-old-rom`; per-device failures are only reported.

pub mod exit;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use romfetch_core::catalog::HttpCatalog;
use romfetch_core::control::InterruptFlag;
use romfetch_core::http::CurlOptions;
use romfetch_core::pipeline::{Pipeline, TracingReporter};
use romfetch_core::run_config::RunConfig;
use romfetch_core::settings;
use std::path::PathBuf;

/// Top-level CLI for romfetch.
#[derive(Debug, Parser)]
#[command(name = "romfetch", version)]
#[command(
    about = "Download the latest ROM build for a device and verify its MD5",
    long_about = None
)]
pub struct Cli {
    /// Device codename (simple form; requires DIRECTORY).
    #[arg(value_name = "DEVICE")]
    pub device: Option<String>,

    /// Directory the archive is saved to (simple form).
    #[arg(value_name = "DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// Device name (required when --conf is not given).
    #[arg(long = "device-name", value_name = "NAME")]
    pub device_name: Option<String>,

    /// Directory where the ROM is saved (required when --conf is not given).
    #[arg(long = "saved-to-dir", value_name = "DIR")]
    pub saved_to_dir: Option<PathBuf>,

    /// Run file listing devices and target directory (used when --device-name
    /// and --saved-to-dir are not given).
    #[arg(long = "conf", value_name = "PATH")]
    pub conf: Option<PathBuf>,

    /// Remove every file in the saved-to directory before downloading.
    #[arg(long = "remove-old-rom")]
    pub remove_old_rom: bool,

    /// Catalog base URL; overrides `catalog_url` from the settings file.
    #[arg(long, value_name = "URL")]
    pub catalog_url: Option<String>,

    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long)]
    pub verbose: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Print shell completions and exit.
    #[arg(long, value_name = "SHELL", value_enum)]
    pub completions: Option<Shell>,
}

/// Neither the simple form, the explicit pair, nor `--conf` was supplied.
#[derive(Debug)]
pub struct UsageError;

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid or missing arguments: give DEVICE DIRECTORY, \
             --device-name with --saved-to-dir, or --conf (see --help)"
        )
    }
}

impl std::error::Error for UsageError {}

/// Simple-form run in which at least one device did not end verified.
#[derive(Debug)]
pub struct DevicesFailed {
    pub failed: usize,
}

impl std::fmt::Display for DevicesFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} device(s) not downloaded", self.failed)
    }
}

impl std::error::Error for DevicesFailed {}

impl Cli {
    /// Positional `<DEVICE> <DIRECTORY>` invocation.
    pub fn is_simple_form(&self) -> bool {
        self.device.is_some() && self.directory.is_some()
    }

    /// Builds the run configuration from whichever input source was supplied.
    /// Precedence: simple form, then the explicit pair, then `--conf`.
    pub fn run_config(&self) -> Result<RunConfig> {
        if let (Some(device), Some(dir)) = (&self.device, &self.directory) {
            return Ok(RunConfig::single(device.as_str(), dir.as_path(), self.remove_old_rom)
                .with_strict(true));
        }
        if self.device.is_some() {
            return Err(UsageError.into());
        }
        if let (Some(device), Some(dir)) = (&self.device_name, &self.saved_to_dir) {
            return Ok(RunConfig::single(device.as_str(), dir.as_path(), self.remove_old_rom));
        }
        if let Some(path) = &self.conf {
            return Ok(RunConfig::from_run_file(path, self.remove_old_rom)?);
        }
        Err(UsageError.into())
    }

    pub fn run(&self) -> Result<()> {
        if let Some(shell) = self.completions {
            clap_complete::generate(shell, &mut Cli::command(), "romfetch", &mut std::io::stdout());
            return Ok(());
        }

        let cfg = self.run_config()?;
        tracing::debug!("run config: {:?}", cfg);

        let mut settings = settings::load()?;
        if let Some(url) = &self.catalog_url {
            settings.catalog_url = url.clone();
        }
        tracing::debug!("settings: {:?}", settings);

        std::fs::create_dir_all(&cfg.target_dir)
            .with_context(|| format!("create {}", cfg.target_dir.display()))?;

        let interrupt = InterruptFlag::new();
        let handler_flag = interrupt.clone();
        ctrlc::set_handler(move || handler_flag.raise())
            .context("failed to set interrupt handler")?;

        let curl = CurlOptions::from(&settings);
        let catalog = HttpCatalog::new(&settings.catalog_url, curl.clone())?
            .with_interrupt(interrupt.clone());
        let pipeline = Pipeline::new(catalog, TracingReporter, curl);

        let summary = pipeline.run(&cfg, &interrupt)?;
        tracing::info!(
            devices = summary.outcomes.len(),
            failed = summary.failures(),
            "run finished"
        );
        if cfg.strict && !summary.all_succeeded() {
            return Err(DevicesFailed {
                failed: summary.failures(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
