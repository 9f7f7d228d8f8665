//! Compression of the store payload inside a persisted blob.
//!
//! The algorithm is recorded in the blob envelope, so a store saved with one
//! setting still loads after the configured default changes.

use crate::error::LineRefError;
use serde::{Deserialize, Serialize};

/// How the serialized store entries are packed on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionAlgorithm {
    /// Entries stored as-is
    None,
    /// LZ4 block with its uncompressed size in front; fastest to load
    Lz4,
    /// Zstandard; smallest blobs for text-heavy stores
    Zstd {
        /// Zstd level, 3 unless configured
        level: i32,
    },
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        CompressionAlgorithm::Zstd { level: 3 }
    }
}

/// Pack a serialized store payload.
pub fn compress(payload: &[u8], algo: CompressionAlgorithm) -> Result<Vec<u8>, LineRefError> {
    match algo {
        CompressionAlgorithm::None => Ok(payload.to_vec()),
        CompressionAlgorithm::Lz4 => Ok(lz4_flex::compress_prepend_size(payload)),
        CompressionAlgorithm::Zstd { level } => zstd::encode_all(payload, level)
            .map_err(|e| LineRefError::CompressionFailed(e.to_string())),
    }
}

/// Unpack a payload written by [`compress`] with the same algorithm.
/// A damaged payload is reported as [`LineRefError::DecompressionFailed`].
pub fn decompress(packed: &[u8], algo: CompressionAlgorithm) -> Result<Vec<u8>, LineRefError> {
    let unpacked = match algo {
        CompressionAlgorithm::None => return Ok(packed.to_vec()),
        CompressionAlgorithm::Lz4 => {
            lz4_flex::decompress_size_prepended(packed).map_err(|e| e.to_string())
        }
        CompressionAlgorithm::Zstd { .. } => zstd::decode_all(packed).map_err(|e| e.to_string()),
    };
    unpacked.map_err(LineRefError::DecompressionFailed)
}
