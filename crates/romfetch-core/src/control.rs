//! Interrupt handling for a run: a shared flag raised by the signal handler.
//!
//! The CLI installs a SIGINT/SIGTERM handler that raises the flag. The
//! downloader polls it from curl's progress callback and aborts the transfer;
//! the catalog request does the same, and the pipeline checks it around every
//! device before cleaning the target directory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable interrupt token. All clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the current run to stop. Safe to call from a signal handler thread.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = InterruptFlag::new();
        let other = flag.clone();
        assert!(!flag.is_raised());
        other.raise();
        assert!(flag.is_raised());
        assert!(other.is_raised());
    }
}
