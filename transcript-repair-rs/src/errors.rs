//! Error handling for the repair library
//!
//! The engine itself never fails on transcript content: malformed lines and
//! malformed nested structure are classified, not raised. Errors here cover
//! the collaborators that touch the filesystem and the process environment.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for repair operations
pub type RepairResult<T> = Result<T, RepairError>;

/// Enum representing the failures a repair run can surface
#[derive(Error, Debug)]
pub enum RepairError {
    /// Reading or writing a transcript failed
    #[error("I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The original transcript could not be copied aside before rewriting
    #[error("Failed to back up {}: {}", .path.display(), .source)]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The repaired content could not be moved over the original
    #[error("Failed to persist repaired transcript {}: {}", .path.display(), .source)]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Walking a sessions directory failed
    #[error("Failed to scan {}: {}", .path.display(), .message)]
    Discovery { path: PathBuf, message: String },

    /// A requested target is neither a file nor a directory
    #[error("{} is not a file or directory", .0.display())]
    InvalidTarget(PathBuf),

    /// Configuration value could not be interpreted
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The global subscriber could not be installed
    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl RepairError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RepairError::Io {
            path: path.into(),
            source,
        }
    }
}
