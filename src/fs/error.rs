//! Error types for launcher filesystem operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for launcher filesystem operations
pub type LauncherResult<T> = Result<T, LauncherFsError>;

/// Errors that can occur while serving or mounting the launcher filesystem.
#[derive(Error, Debug)]
pub enum LauncherFsError {
    /// Virtual path is syntactically malformed (nested, relative, non-canonical)
    #[error("Invalid virtual path: {0}")]
    InvalidPath(String),

    /// Well-formed path with no matching entry, or the original file vanished
    #[error("No such entry: {0}")]
    NotFound(String),

    /// Read offset lies beyond the current content length
    #[error("Offset {offset} is beyond end of content ({size} bytes)")]
    OutOfRange { offset: u64, size: u64 },

    /// Opening or reading an original bundle failed
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Content was requested for a directory
    #[error("Is a directory: {0}")]
    IsDirectory(String),

    /// Directory listing was requested for a file
    #[error("Not a directory: {0}")]
    NotDirectory(String),

    /// The source directory could not be enumerated
    #[error("Cannot scan source directory {}: {source}", .path.display())]
    SourceDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A mountpoint directory already exists, so another instance is assumed to be serving it
    #[error("Another instance appears to be running at {}", .mountpoint.display())]
    AlreadyRunning { mountpoint: PathBuf },

    /// Preparing, mounting or cleaning up the mountpoint failed
    #[error("Mount failed at {}: {source}", .mountpoint.display())]
    Mount {
        mountpoint: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A required environment variable is not set
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// Writing a report (map, listing) to its destination failed
    #[error("Failed to write output: {0}")]
    Output(#[source] io::Error),
}

impl LauncherFsError {
    /// Negative-result code reported to the kernel for this error.
    pub fn errno(&self) -> i32 {
        match self {
            LauncherFsError::InvalidPath(_) | LauncherFsError::NotFound(_) => libc::ENOENT,
            LauncherFsError::OutOfRange { .. } => libc::EINVAL,
            LauncherFsError::IsDirectory(_) => libc::EISDIR,
            LauncherFsError::NotDirectory(_) => libc::ENOTDIR,
            LauncherFsError::Io { source, .. } => source.raw_os_error().unwrap_or(libc::EIO),
            LauncherFsError::SourceDir { .. }
            | LauncherFsError::AlreadyRunning { .. }
            | LauncherFsError::Mount { .. }
            | LauncherFsError::MissingEnv(_)
            | LauncherFsError::Output(_) => libc::EIO,
        }
    }
}
