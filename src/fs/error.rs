//! Error types for store operations
//!
//! Every verb in the dispatcher reports one of three kinds of failure:
//!
//! | Condition                              | Variant            | errno      |
//! |----------------------------------------|--------------------|------------|
//! | Basename absent from every store       | `NotFound`         | `ENOENT`   |
//! | Access check fails                     | `PermissionDenied` | `EACCES`   |
//! | Any other host primitive failure       | `Io`               | host errno |
//!
//! Host errors are carried unchanged so the protocol boundary can hand the
//! original errno back to the kernel.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreFsError>;

/// Errors raised while resolving or operating on a virtual path
#[derive(Debug, Error)]
pub enum StoreFsError {
    /// No store contains the requested basename
    #[error("{name:?} not found in any store")]
    NotFound { name: OsString },

    /// The host access check rejected the requested mode
    #[error("access denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    /// Host filesystem failure, passed through untouched
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StoreFsError {
    /// Translate into the errno reported at the filesystem-protocol boundary.
    pub fn errno(&self) -> libc::c_int {
        match self {
            StoreFsError::NotFound { .. } => libc::ENOENT,
            StoreFsError::PermissionDenied { .. } => libc::EACCES,
            StoreFsError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// True when the failure means "no such file", whichever layer raised it.
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreFsError::NotFound { .. } => true,
            StoreFsError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            StoreFsError::PermissionDenied { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_enoent() {
        let err = StoreFsError::NotFound {
            name: OsString::from("missing.txt"),
        };
        assert_eq!(err.errno(), libc::ENOENT);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn permission_denied_maps_to_eacces() {
        let err = StoreFsError::PermissionDenied {
            path: PathBuf::from("/store/a"),
        };
        assert_eq!(err.errno(), libc::EACCES);
        assert!(!err.is_not_found());
    }

    #[test]
    fn host_errno_passes_through() {
        let err = StoreFsError::from(io::Error::from_raw_os_error(libc::ENOSPC));
        assert_eq!(err.errno(), libc::ENOSPC);

        let err = StoreFsError::from(io::Error::from_raw_os_error(libc::EISDIR));
        assert_eq!(err.errno(), libc::EISDIR);
    }

    #[test]
    fn synthetic_io_error_falls_back_to_eio() {
        let err = StoreFsError::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(err.errno(), libc::EIO);
    }

    #[test]
    fn host_enoent_counts_as_not_found() {
        let err = StoreFsError::from(io::Error::from_raw_os_error(libc::ENOENT));
        assert!(err.is_not_found());
        assert_eq!(err.errno(), libc::ENOENT);
    }
}
