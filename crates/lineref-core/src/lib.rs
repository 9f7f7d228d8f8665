#![warn(missing_docs)]

//! lineref core: line-level deduplication through a content-addressed store
//!
//! Encode path: Text → Line → Normalize → Hash (XXH32) → Store insert → Record
//! (0x00 | 4-byte hash)
//! Decode path: Records → Store lookup → Text

pub mod codec;
pub mod compression;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod ops;
pub mod store;
pub mod wire;

pub use codec::{decode_stream, DecodeStats, EncodeStats, LineCodec, SeedStats};
pub use compression::CompressionAlgorithm;
pub use config::LineRefConfig;
pub use error::LineRefError;
pub use fingerprint::{
    HashAlgorithm, LineHash, LineHasher, Normalization, Sha256TruncatedHasher, Xxh32Hasher,
};
pub use store::{ContentStore, InsertOutcome};
pub use wire::{Record, RecordReader, BLANK_MARKER, HASH_REF_LEN};
