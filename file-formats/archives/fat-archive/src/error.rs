//! Error types for the FAT archive engine

use std::io;
use thiserror::Error;

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for archive operations
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying byte storage failed to read, write, insert or delete
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The on-disk allocation table is internally inconsistent
    #[error("Corrupted allocation table: {0}")]
    CorruptedTable(String),

    /// Operation on an entry or handle that is no longer valid
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// The format rejected a filename
    #[error("Filename {name:?} rejected: {reason}")]
    NameRejected {
        /// The offending name
        name: String,
        /// Why the format refused it
        reason: String,
    },

    /// The table has no room for the request (too many files, size field too narrow)
    #[error("Archive capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// A stream transform failed to encode or decode
    #[error("Transform error: {0}")]
    Transform(String),

    /// A resize reported success but the open stream did not observe it
    #[error("Archive resize silently failed: expected size {expected}, stream reports {actual}")]
    ResizeNotApplied {
        /// Size requested by the truncate call
        expected: u64,
        /// Size seen by the stream afterwards
        actual: u64,
    },

    /// Pending edits cannot be committed because no truncate callback was supplied
    #[error("No truncate callback configured for this archive")]
    MissingTruncateCallback,
}

impl Error {
    /// Create a new CorruptedTable error
    pub fn corrupted_table<S: Into<String>>(msg: S) -> Self {
        Error::CorruptedTable(msg.into())
    }

    /// Create a new InvalidHandle error
    pub fn invalid_handle<S: Into<String>>(msg: S) -> Self {
        Error::InvalidHandle(msg.into())
    }

    /// Create a new NameRejected error
    pub fn name_rejected<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Error::NameRejected {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new CapacityExceeded error
    pub fn capacity<S: Into<String>>(msg: S) -> Self {
        Error::CapacityExceeded(msg.into())
    }

    /// Create a new Transform error
    pub fn transform<S: Into<String>>(msg: S) -> Self {
        Error::Transform(msg.into())
    }

    /// Check if this error indicates the archive is corrupted
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::CorruptedTable(_) | Error::ResizeNotApplied { .. })
    }

    /// Check if this error left the archive untouched and the caller may retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NameRejected { .. }
                | Error::CapacityExceeded(_)
                | Error::InvalidHandle(_)
                | Error::MissingTruncateCallback
        )
    }

    /// Wrap this error so it can travel through `std::io` traits
    pub(crate) fn into_io(self) -> io::Error {
        match self {
            Error::Io(e) => e,
            other => io::Error::other(other),
        }
    }
}
