//! Streamed archive download into the target directory.
//!
//! The body is written to disk as curl hands it over, in chunks of at most
//! [`CHUNK_SIZE`] bytes; nothing is buffered in memory. A failed or interrupted
//! transfer leaves the partial file in place for the caller to clean up.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::control::InterruptFlag;
use crate::http::{self, CurlOptions};
use crate::url_model::filename_from_url;

/// Receive buffer handed to libcurl; the write callback never sees more than this.
pub const CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("cannot derive a file name from {0}")]
    NoFileName(String),
    #[error("create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("GET {url} failed: {source}")]
    Transfer {
        url: String,
        #[source]
        source: curl::Error,
    },
    #[error("GET {url} returned HTTP {status}")]
    Http { url: String, status: u32 },
    #[error("download interrupted")]
    Interrupted,
}

/// Output path for `url` inside `dir`.
pub fn target_path(url: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
    let name = filename_from_url(url).ok_or_else(|| DownloadError::NoFileName(url.to_string()))?;
    Ok(dir.join(name))
}

/// Downloads `url` into `dir` with a single GET and returns the written path.
///
/// An existing file with the same name is overwritten. The transfer is
/// aborted as soon as `interrupt` is raised.
pub fn download_archive(
    url: &str,
    dir: &Path,
    curl: &CurlOptions,
    interrupt: &InterruptFlag,
) -> Result<PathBuf, DownloadError> {
    let path = target_path(url, dir)?;
    let file = File::create(&path).map_err(|source| DownloadError::Create {
        path: path.clone(),
        source,
    })?;
    let mut out = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut write_error: Option<std::io::Error> = None;
    let mut written: u64 = 0;

    let transfer_err = |source| DownloadError::Transfer {
        url: url.to_string(),
        source,
    };

    let mut easy = http::easy_get(url, curl).map_err(transfer_err)?;
    easy.buffer_size(CHUNK_SIZE).map_err(transfer_err)?;
    easy.progress(true).map_err(transfer_err)?;

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                if data.is_empty() {
                    return Ok(0);
                }
                match out.write_all(data) {
                    Ok(()) => {
                        written += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        write_error = Some(e);
                        Ok(0) // abort transfer
                    }
                }
            })
            .map_err(transfer_err)?;
        // Returning false aborts the transfer with CURLE_ABORTED_BY_CALLBACK.
        transfer
            .progress_function(|_, _, _, _| !interrupt.is_raised())
            .map_err(transfer_err)?;
        if let Err(e) = transfer.perform() {
            drop(transfer);
            if e.is_aborted_by_callback() && interrupt.is_raised() {
                return Err(DownloadError::Interrupted);
            }
            if let (true, Some(source)) = (e.is_write_error(), write_error.take()) {
                return Err(DownloadError::Write { path, source });
            }
            return Err(transfer_err(e));
        }
    }

    out.flush().map_err(|source| DownloadError::Write {
        path: path.clone(),
        source,
    })?;

    let status = easy.response_code().map_err(transfer_err)?;
    if !(200..300).contains(&status) {
        return Err(DownloadError::Http {
            url: url.to_string(),
            status,
        });
    }

    tracing::debug!(url, path = %path.display(), bytes = written, "archive downloaded");
    Ok(path)
}
