//! MD5 verification of downloaded archives.
//!
//! The catalog publishes one MD5 per archive. A file whose recomputed digest
//! differs is deleted here, so only verified archives stay on disk.

use anyhow::{Context, Result};
use md5::{Digest, Md5};
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

const BUF_SIZE: usize = 64 * 1024;

/// A 32-character MD5 hex digest, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Md5Hex(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not an MD5 hex digest: {0:?}")]
pub struct InvalidMd5(pub String);

impl FromStr for Md5Hex {
    type Err = InvalidMd5;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 32 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Md5Hex(s.to_ascii_lowercase()))
        } else {
            Err(InvalidMd5(s.to_string()))
        }
    }
}

impl Md5Hex {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Md5Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of checking a file against its published digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid,
    /// The file did not match and has been removed.
    Mismatch { actual: Md5Hex },
}

/// Compute MD5 of a file and return the digest as lowercase hex.
/// Reads in 64 KiB blocks to keep memory use bounded on multi-GB archives.
pub fn md5_path(path: &Path) -> Result<Md5Hex> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Md5Hex(hex::encode(hasher.finalize())))
}

/// Check `path` against `expected`. On mismatch the file is deleted.
///
/// Calling this again on an unchanged file gives the same answer.
pub fn verify_file(path: &Path, expected: &Md5Hex) -> Result<Verification> {
    let actual = md5_path(path)?;
    if &actual == expected {
        tracing::debug!(path = %path.display(), md5 = %actual, "checksum ok");
        return Ok(Verification::Valid);
    }
    tracing::warn!(
        path = %path.display(),
        expected = %expected,
        actual = %actual,
        "checksum mismatch, removing file"
    );
    fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
    Ok(Verification::Mismatch { actual })
}
