//! Line fingerprinting: 32-bit XXH32 hashing and optional case folding

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Cow;

/// Seed used for every XXH32 line hash. Changing it invalidates existing stores.
pub const XXH32_SEED: u32 = 0;

/// A 4-byte hash identifying a line's content. Used as the store key and as the
/// on-wire hash reference, in big-endian (canonical digest) byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineHash(pub [u8; 4]);

impl LineHash {
    /// Build a hash from its numeric value
    pub fn from_u32(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
    /// Numeric value of the hash
    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }
    /// Return the hash as a lowercase hex string
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
    /// Return the raw bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Display for LineHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Computes the 4-byte hash of a line.
/// Implementations must be deterministic across runs and platforms.
pub trait LineHasher {
    /// Hash the line's UTF-8 bytes
    fn hash(&self, line: &str) -> LineHash;
}

/// XXH32 with a fixed seed. The default hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xxh32Hasher;

impl LineHasher for Xxh32Hasher {
    fn hash(&self, line: &str) -> LineHash {
        LineHash::from_u32(xxhash_rust::xxh32::xxh32(line.as_bytes(), XXH32_SEED))
    }
}

/// First 4 bytes of the SHA-256 digest. Same 32-bit key space as XXH32, so the
/// collision rate is unchanged; only throughput differs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256TruncatedHasher;

impl LineHasher for Sha256TruncatedHasher {
    fn hash(&self, line: &str) -> LineHash {
        let digest = Sha256::digest(line.as_bytes());
        LineHash([digest[0], digest[1], digest[2], digest[3]])
    }
}

/// Hash function selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// XXH32, seed 0
    #[default]
    Xxh32,
    /// Truncated SHA-256
    Sha256,
}

impl HashAlgorithm {
    /// Boxed hasher for this algorithm
    pub fn hasher(self) -> Box<dyn LineHasher> {
        match self {
            HashAlgorithm::Xxh32 => Box::new(Xxh32Hasher),
            HashAlgorithm::Sha256 => Box::new(Sha256TruncatedHasher),
        }
    }
}

/// Text normalization applied before a line is hashed and stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Lines are hashed and stored byte-for-byte
    #[default]
    None,
    /// Surrounding whitespace is trimmed and the line lower-cased, so variants
    /// differing only in case merge into a single entry
    CaseFold,
}

impl Normalization {
    /// Apply the normalization
    pub fn apply<'a>(self, line: &'a str) -> Cow<'a, str> {
        match self {
            Normalization::None => Cow::Borrowed(line),
            Normalization::CaseFold => Cow::Owned(line.trim().to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn xxh32_empty_matches_reference_value() {
        assert_eq!(Xxh32Hasher.hash("").to_u32(), 0x02CC_5D05);
    }

    #[test]
    fn xxh32_bytes_are_big_endian() {
        let h = Xxh32Hasher.hash("");
        assert_eq!(h.as_bytes(), &[0x02, 0xCC, 0x5D, 0x05]);
        assert_eq!(h.to_hex(), "02cc5d05");
    }

    #[test]
    fn sha256_truncated_takes_digest_prefix() {
        assert_eq!(Sha256TruncatedHasher.hash("").to_hex(), "e3b0c442");
    }

    #[test]
    fn different_lines_produce_different_hashes() {
        assert_ne!(Xxh32Hasher.hash("hello"), Xxh32Hasher.hash("world"));
    }

    #[test]
    fn hash_is_case_sensitive() {
        assert_ne!(Xxh32Hasher.hash("Hello"), Xxh32Hasher.hash("hello"));
    }

    #[test]
    fn case_fold_trims_and_lowercases() {
        assert_eq!(Normalization::CaseFold.apply("  Hello World \t"), "hello world");
        assert_eq!(Normalization::CaseFold.apply("   "), "");
        assert_eq!(Normalization::None.apply("  Hello "), "  Hello ");
    }

    #[test]
    fn algorithm_selects_hasher() {
        assert_eq!(HashAlgorithm::Xxh32.hasher().hash("x"), Xxh32Hasher.hash("x"));
        assert_eq!(
            HashAlgorithm::Sha256.hasher().hash("x"),
            Sha256TruncatedHasher.hash("x")
        );
    }

    proptest! {
        #[test]
        fn prop_xxh32_deterministic(line in ".{0,200}") {
            prop_assert_eq!(Xxh32Hasher.hash(&line), Xxh32Hasher.hash(&line));
        }

        #[test]
        fn prop_u32_roundtrip(value in any::<u32>()) {
            prop_assert_eq!(LineHash::from_u32(value).to_u32(), value);
        }
    }
}
