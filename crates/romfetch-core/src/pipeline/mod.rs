//! Per-device pipeline: catalog lookup → download → verify → report.
//!
//! Devices are processed one after another. A device missing from the
//! catalog, a broken download, or a checksum mismatch only affects that
//! device; an unreachable catalog stops the run. On interrupt the target
//! directory is cleaned before returning.

mod report;

pub use report::{NullReporter, Reporter, TracingReporter};

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::{Catalog, CatalogError};
use crate::checksum::{verify_file, Verification};
use crate::cleaner::clean_dir;
use crate::control::InterruptFlag;
use crate::download::{download_archive, target_path, DownloadError};
use crate::http::CurlOptions;
use crate::run_config::{DeviceRequest, RunConfig};

/// What happened to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome {
    /// Archive downloaded and its MD5 matches; the file stays on disk.
    Verified(PathBuf),
    NotListed,
    /// Checksum differed; the file has been deleted.
    IntegrityMismatch,
    Failed(String),
}

impl DeviceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeviceOutcome::Verified(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// `(device, outcome)` in processing order.
    pub outcomes: Vec<(String, DeviceOutcome)>,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| o.is_success())
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| !o.is_success()).count()
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Catalog unreachable or answering non-200.
    #[error(transparent)]
    Remote(CatalogError),
    /// Run stopped by the user; `removed` entries were cleaned from `dir`.
    #[error("interrupted; removed {removed} file(s) from {dir}")]
    Interrupted { dir: PathBuf, removed: usize },
    #[error("failed to clean {dir}: {reason:#}")]
    Clean { dir: PathBuf, reason: anyhow::Error },
}

enum Halt {
    Remote(CatalogError),
    Interrupted,
}

pub struct Pipeline<C, R> {
    catalog: C,
    reporter: R,
    curl: CurlOptions,
}

impl<C: Catalog, R: Reporter> Pipeline<C, R> {
    pub fn new(catalog: C, reporter: R, curl: CurlOptions) -> Self {
        Self {
            catalog,
            reporter,
            curl,
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Runs every device in `cfg`, cleaning the directory first when requested.
    pub fn run(&self, cfg: &RunConfig, interrupt: &InterruptFlag) -> Result<RunSummary, PipelineError> {
        if cfg.remove_old {
            self.clean(&cfg.target_dir)?;
        }

        let mut summary = RunSummary::default();
        for request in cfg.requests() {
            if interrupt.is_raised() {
                return Err(self.abort(&cfg.target_dir));
            }
            match self.process(&request, interrupt) {
                Ok(outcome) => summary.outcomes.push((request.device, outcome)),
                Err(Halt::Remote(e)) => return Err(PipelineError::Remote(e)),
                Err(Halt::Interrupted) => return Err(self.abort(&cfg.target_dir)),
            }
            // Raised during the lookup or the MD5 pass; the device itself finished.
            if interrupt.is_raised() {
                return Err(self.abort(&cfg.target_dir));
            }
        }
        Ok(summary)
    }

    fn process(&self, request: &DeviceRequest, interrupt: &InterruptFlag) -> Result<DeviceOutcome, Halt> {
        let device = request.device.as_str();
        let entry = match self.catalog.latest(device) {
            Ok(entry) => entry,
            Err(CatalogError::Interrupted) => return Err(Halt::Interrupted),
            Err(e) if e.is_fatal() => return Err(Halt::Remote(e)),
            Err(_) => {
                self.reporter.not_listed(device);
                return Ok(DeviceOutcome::NotListed);
            }
        };
        self.reporter.catalog_entry(device, &entry);

        let path = match download_archive(&entry.url, &request.target_dir, &self.curl, interrupt) {
            Ok(path) => path,
            Err(DownloadError::Interrupted) => return Err(Halt::Interrupted),
            Err(e) => {
                discard_partial(&entry.url, &request.target_dir);
                let reason = e.to_string();
                self.reporter.failed(device, &reason);
                return Ok(DeviceOutcome::Failed(reason));
            }
        };

        match verify_file(&path, &entry.checksum) {
            Ok(Verification::Valid) => {
                self.reporter.verified(device, &path);
                Ok(DeviceOutcome::Verified(path))
            }
            Ok(Verification::Mismatch { actual }) => {
                self.reporter.mismatch(device, &path, &entry.checksum, &actual);
                Ok(DeviceOutcome::IntegrityMismatch)
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                self.reporter.failed(device, &reason);
                Ok(DeviceOutcome::Failed(reason))
            }
        }
    }

    fn clean(&self, dir: &Path) -> Result<usize, PipelineError> {
        clean_dir(dir, &self.reporter)
            .map(|removed| removed.len())
            .map_err(|reason| PipelineError::Clean {
                dir: dir.to_path_buf(),
                reason,
            })
    }

    fn abort(&self, dir: &Path) -> PipelineError {
        self.reporter.interrupted(dir);
        match self.clean(dir) {
            Ok(removed) => PipelineError::Interrupted {
                dir: dir.to_path_buf(),
                removed,
            },
            Err(e) => e,
        }
    }
}

/// Removes whatever a failed transfer left behind for `url` in `dir`.
fn discard_partial(url: &str, dir: &Path) {
    let Ok(path) = target_path(url, dir) else {
        return;
    };
    match std::fs::remove_file(&path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "could not remove partial download: {}", e),
    }
}
