use std::io;

use thiserror::Error;

use crate::recording::Id;

/// Enumerates high-level errors returned by this library. The display
/// form of each variant is the message sent back to clients.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The upload contained no file part.
    #[error("No file provided")]
    NoFileProvided,

    /// The id path segment was not a number.
    #[error("Invalid recording ID")]
    InvalidId(String),

    /// No index row exists for the id.
    #[error("Recording not found")]
    NotFound(Id),

    /// The index row exists but its blob is gone (a stale row).
    #[error("Recording file missing")]
    FileMissing { id: Id, key: String },

    /// The multipart body could not be read to the end.
    #[error("Malformed form submission")]
    MalformedFormSubmission,

    /// Writing a new blob failed.
    #[error("Failed to store file")]
    StorageWriteError { source: io::Error },

    /// Removing a blob failed for a reason other than it being absent.
    #[error("Failed to delete file")]
    StorageDeleteError { source: io::Error },

    /// Opening or inspecting a blob failed.
    #[error("Failed to read file")]
    StorageReadError { source: io::Error },

    /// Inserting or deleting an index row failed.
    #[error("Failed to update recording index")]
    IndexWriteError { source: sqlx::Error },

    /// The index could not be opened or its schema created.
    #[error("Recording index unavailable")]
    IndexUnavailable { source: sqlx::Error },

    /// The blob's size cannot be recorded in the index.
    #[error("Failed to update recording index")]
    BlobTooLarge(u64),

    /// Listing or looking up index rows failed.
    #[error("Failed to read recording index")]
    IndexReadError { source: sqlx::Error },

    /// A row held values that could not be decoded.
    #[error("Corrupt recording index entry")]
    CorruptIndexRow { id: Id },

    /// The requested byte range lies outside the blob.
    #[error("Requested range not satisfiable")]
    RangeNotSatisfiable { total_length: u64 },
}

/// Enumerates errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}
