use std::io;
use std::time::SystemTime;
use thiserror::Error;

use crate::name::FileName;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found")]
    NotFound,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("File exceeds the maximum size of {limit} bytes")]
    SizeLimitExceeded { limit: u64 },

    #[error("Cleanup worker is not running")]
    SweepUnavailable,
}

impl StoreError {
    /// Map `io::ErrorKind::NotFound` to [`StoreError::NotFound`].
    pub(crate) fn from_lookup(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound
        } else {
            StoreError::Io(err)
        }
    }
}

/// Metadata about a committed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: FileName,
    pub size: u64,
    pub modified: SystemTime,
}

/// Outcome of one pass of the eviction sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries examined
    pub scanned: usize,
    /// Entries this pass actually removed
    pub removed: usize,
    /// Entries or staging files that were due but could not be removed
    pub failed: usize,
    /// Staging files of abandoned uploads that were reclaimed
    pub abandoned: usize,
}
