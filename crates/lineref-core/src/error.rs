//! Error types for the lineref core

use std::path::PathBuf;

/// All errors that can occur while storing, encoding or decoding lines
#[derive(Debug, thiserror::Error)]
pub enum LineRefError {
    /// An input file named by the caller does not exist
    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),
    /// A glob pattern matched no files
    #[error("No files matched pattern '{0}'")]
    NoInputMatched(String),
    /// A glob pattern could not be parsed
    #[error("Invalid glob pattern: {0}")]
    InvalidPattern(#[from] glob::PatternError),
    /// The persisted store could not be written
    #[error("Could not write store to {path}: {source}")]
    StoreWrite {
        /// Destination of the failed write
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
    /// The persisted store exists but could not be parsed
    #[error("Store blob is corrupt: {0}")]
    StoreCorrupt(String),
    /// A hash record was cut short at the end of an encoded stream
    #[error("Truncated hash record at byte {offset}: expected 3 more bytes, found {available}")]
    TruncatedRecord {
        /// Offset of the record's first byte in the stream
        offset: u64,
        /// Bytes that followed the first byte before EOF
        available: usize,
    },
    /// Compression operation failed
    #[error("Compression failed: {0}")]
    CompressionFailed(String),
    /// Decompression operation failed
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),
    /// Store contents could not be (de)serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] bincode::Error),
    /// Configuration file could not be read or parsed
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
