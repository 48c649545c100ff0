//! Process exit codes.
//!
//! errno values are used where the failure has an obvious one, so scripts
//! can tell a bad invocation from an unreachable catalog.

use romfetch_core::catalog::CatalogError;
use romfetch_core::pipeline::PipelineError;

use super::{DevicesFailed, UsageError};

pub const FAILURE: i32 = 1;

/// Killed by SIGINT, shell convention (128 + 2).
pub const INTERRUPTED: i32 = 130;

#[cfg(unix)]
pub const INVALID_ARGS: i32 = libc::EINVAL;
#[cfg(not(unix))]
pub const INVALID_ARGS: i32 = 22;

#[cfg(target_os = "linux")]
pub const REMOTE_IO: i32 = libc::EREMOTEIO;
#[cfg(all(unix, not(target_os = "linux")))]
pub const REMOTE_IO: i32 = libc::EIO;
#[cfg(not(unix))]
pub const REMOTE_IO: i32 = 5;

/// Exit code for a failed run. In the simple form every failure but a bad
/// invocation or an interrupt exits with [`FAILURE`].
pub fn code_for(err: &anyhow::Error, strict: bool) -> i32 {
    if err.downcast_ref::<UsageError>().is_some() {
        return INVALID_ARGS;
    }
    if err.downcast_ref::<DevicesFailed>().is_some() {
        return FAILURE;
    }
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Interrupted { .. }) => INTERRUPTED,
        Some(PipelineError::Remote(
            CatalogError::RemoteUnavailable { .. } | CatalogError::Transport { .. },
        )) if !strict => REMOTE_IO,
        _ => FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn remote() -> anyhow::Error {
        PipelineError::Remote(CatalogError::RemoteUnavailable {
            url: "http://dwnld.aicp-rom.com/?device=bacon".into(),
            status: 502,
        })
        .into()
    }

    #[test]
    fn usage_error_is_einval() {
        assert_eq!(code_for(&UsageError.into(), false), INVALID_ARGS);
        assert_eq!(code_for(&UsageError.into(), true), INVALID_ARGS);
    }

    #[test]
    fn remote_unavailable_depends_on_form() {
        assert_eq!(code_for(&remote(), false), REMOTE_IO);
        assert_eq!(code_for(&remote(), true), FAILURE);
    }

    #[test]
    fn remote_with_context_still_maps() {
        let err = remote().context("run");
        assert_eq!(code_for(&err, false), REMOTE_IO);
    }

    #[test]
    fn interrupted_is_130() {
        let err: anyhow::Error = PipelineError::Interrupted {
            dir: PathBuf::from("/tmp/roms"),
            removed: 2,
        }
        .into();
        assert_eq!(code_for(&err, true), INTERRUPTED);
        assert_eq!(code_for(&err, false), INTERRUPTED);
    }

    #[test]
    fn device_failures_and_other_errors_are_one() {
        assert_eq!(code_for(&DevicesFailed { failed: 1 }.into(), true), FAILURE);
        assert_eq!(code_for(&anyhow::anyhow!("disk full"), false), FAILURE);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_errno_values() {
        assert_eq!(INVALID_ARGS, 22);
        assert_eq!(REMOTE_IO, 121);
    }
}
