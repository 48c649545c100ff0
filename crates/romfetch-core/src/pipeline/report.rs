//! Reporting capability injected into the pipeline.

use std::path::Path;

use crate::catalog::CatalogEntry;
use crate::checksum::Md5Hex;

/// Receives progress events from a run. Implementations decide where they go.
pub trait Reporter {
    fn catalog_entry(&self, device: &str, entry: &CatalogEntry);
    fn not_listed(&self, device: &str);
    fn verified(&self, device: &str, path: &Path);
    fn mismatch(&self, device: &str, path: &Path, expected: &Md5Hex, actual: &Md5Hex);
    fn failed(&self, device: &str, reason: &str);
    fn removed(&self, path: &Path);
    fn interrupted(&self, dir: &Path);
}

/// Emits `tracing` events; removals are also printed on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn catalog_entry(&self, device: &str, entry: &CatalogEntry) {
        tracing::info!(device, "URL: {}", entry.url);
        tracing::info!(device, "checksum: {}", entry.checksum);
    }

    fn not_listed(&self, device: &str) {
        tracing::error!("ROM for device {} seems not to be provided by the catalog", device);
    }

    fn verified(&self, device: &str, path: &Path) {
        tracing::info!(
            path = %path.display(),
            "ROM for device {} downloaded successfully",
            device
        );
    }

    fn mismatch(&self, device: &str, path: &Path, expected: &Md5Hex, actual: &Md5Hex) {
        tracing::error!(
            device,
            %expected,
            %actual,
            "downloaded ROM seems to be broken, removed {}",
            path.display()
        );
    }

    fn failed(&self, device: &str, reason: &str) {
        tracing::error!(device, "download failed: {}", reason);
    }

    fn removed(&self, path: &Path) {
        println!("{} is removed", path.display());
        tracing::debug!(path = %path.display(), "removed");
    }

    fn interrupted(&self, dir: &Path) {
        tracing::warn!("Interrupted. Cleaning files in {}", dir.display());
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn catalog_entry(&self, _: &str, _: &CatalogEntry) {}
    fn not_listed(&self, _: &str) {}
    fn verified(&self, _: &str, _: &Path) {}
    fn mismatch(&self, _: &str, _: &Path, _: &Md5Hex, _: &Md5Hex) {}
    fn failed(&self, _: &str, _: &str) {}
    fn removed(&self, _: &Path) {}
    fn interrupted(&self, _: &Path) {}
}
