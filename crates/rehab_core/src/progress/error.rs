use thiserror::Error;

/// Progress archive read/write failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Archive IO failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not encode archive: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("Could not decode archive: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("Archive payload failed to decompress")]
    Decompression,

    #[error("Archive truncated or malformed")]
    Corrupted,

    #[error("Archive version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("Archive checksum does not match its payload")]
    ChecksumMismatch,

    #[error("No archive at {path}")]
    FileNotFound { path: String },
}

impl StoreError {
    /// Whether retrying or starting a fresh archive makes sense.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::Io(_) | StoreError::FileNotFound { .. })
    }
}
