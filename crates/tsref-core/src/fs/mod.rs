//! Filesystem abstraction consumed by resolver hooks.
//!
//! Hooks never touch `std::fs` directly; they go through [`FileSystem`] so
//! the host decides where bytes come from (disk, an in-memory overlay, a
//! test fixture).

mod memory;

pub use memory::MemoryFileSystem;

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error from a filesystem operation.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a symbolic link: {}", .0.display())]
    NotALink(PathBuf),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the path did not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Asynchronous read-only filesystem used during resolution.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read the stored target of a symbolic link.
    ///
    /// Fails with [`FsError::NotALink`] when `path` exists but is not a link.
    async fn read_link(&self, path: &Path) -> Result<PathBuf, FsError>;

    /// Read a whole file, following symlinks.
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError>;
}

/// Disk-backed filesystem on top of `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        tokio::fs::read_link(path).await.map_err(|e| {
            if is_not_a_link(&e) {
                FsError::NotALink(path.to_path_buf())
            } else if e.kind() == io::ErrorKind::NotFound {
                FsError::NotFound(path.to_path_buf())
            } else {
                FsError::io(path, e)
            }
        })
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                FsError::NotFound(path.to_path_buf())
            } else {
                FsError::io(path, e)
            }
        })
    }
}

/// `readlink` on something that is not a link fails with EINVAL.
#[cfg(unix)]
fn is_not_a_link(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EINVAL)
}

/// `ERROR_NOT_A_REPARSE_POINT`
#[cfg(windows)]
fn is_not_a_link(err: &io::Error) -> bool {
    const ERROR_NOT_A_REPARSE_POINT: i32 = 4390;
    err.raw_os_error() == Some(ERROR_NOT_A_REPARSE_POINT)
}

#[cfg(not(any(unix, windows)))]
fn is_not_a_link(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::InvalidInput
}
