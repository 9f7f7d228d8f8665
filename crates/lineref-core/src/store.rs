//! Content-addressed line store: maps a 4-byte line hash to the line text.
//!
//! The store owns the collision policy. The 32-bit key space makes collisions
//! an ordinary event, so the first line written under a hash wins and every
//! later, different line with the same hash is rejected with a warning.

use crate::compression::{compress, decompress, CompressionAlgorithm};
use crate::error::LineRefError;
use crate::fingerprint::LineHash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Leading bytes of every persisted store blob
pub const STORE_MAGIC: [u8; 4] = *b"LREF";

/// Current blob layout version
pub const STORE_FORMAT_VERSION: u16 = 1;

/// Result of an insertion, before it is collapsed to the boolean contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The hash was absent and the line is now stored
    New,
    /// The same line is already stored under this hash
    Duplicate,
    /// A different line is already stored under this hash; nothing changed
    Collision,
}

impl InsertOutcome {
    /// True only for a newly stored entry
    pub fn is_new(self) -> bool {
        self == InsertOutcome::New
    }
}

#[derive(Serialize, Deserialize)]
struct StoreEnvelope {
    version: u16,
    compression: CompressionAlgorithm,
    payload: Vec<u8>,
}

/// In-memory hash → line table with compressed on-disk persistence
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContentStore {
    entries: HashMap<LineHash, String>,
}

impl ContentStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from `path`.
    /// A missing file yields an empty store. An unreadable or corrupt file also
    /// yields an empty store and logs a warning.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "No existing store, starting empty");
            return Self::new();
        }
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read store, starting empty");
                return Self::new();
            }
        };
        match Self::from_blob(&bytes) {
            Ok(store) => {
                info!(path = %path.display(), entries = store.len(), "Loaded store");
                store
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not parse store, starting empty");
                Self::new()
            }
        }
    }

    /// Persist the store to `path` with the default compression, overwriting any existing file.
    pub fn save(&self, path: &Path) -> Result<(), LineRefError> {
        self.save_with(path, CompressionAlgorithm::default())
    }

    /// Persist the store to `path` with an explicit compression algorithm.
    pub fn save_with(
        &self,
        path: &Path,
        compression: CompressionAlgorithm,
    ) -> Result<(), LineRefError> {
        let blob = self.to_blob(compression)?;
        std::fs::write(path, &blob).map_err(|source| LineRefError::StoreWrite {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), entries = self.len(), bytes = blob.len(), "Saved store");
        Ok(())
    }

    /// Serialize the store into a self-describing compressed blob.
    /// Entries are written in hash order so identical stores produce identical blobs.
    pub fn to_blob(&self, compression: CompressionAlgorithm) -> Result<Vec<u8>, LineRefError> {
        let mut sorted: Vec<(&LineHash, &String)> = self.entries.iter().collect();
        sorted.sort_unstable_by_key(|(hash, _)| **hash);
        let raw = bincode::serialize(&sorted)?;
        let envelope = StoreEnvelope {
            version: STORE_FORMAT_VERSION,
            compression,
            payload: compress(&raw, compression)?,
        };
        let mut blob = STORE_MAGIC.to_vec();
        blob.extend(bincode::serialize(&envelope)?);
        Ok(blob)
    }

    /// Parse a blob produced by [`ContentStore::to_blob`].
    pub fn from_blob(blob: &[u8]) -> Result<Self, LineRefError> {
        let body = blob
            .strip_prefix(&STORE_MAGIC[..])
            .ok_or_else(|| LineRefError::StoreCorrupt("missing store header".into()))?;
        let envelope: StoreEnvelope = bincode::deserialize(body)?;
        if envelope.version != STORE_FORMAT_VERSION {
            return Err(LineRefError::StoreCorrupt(format!(
                "unsupported store version {}",
                envelope.version
            )));
        }
        let raw = decompress(&envelope.payload, envelope.compression)?;
        let pairs: Vec<(LineHash, String)> = bincode::deserialize(&raw)?;
        Ok(Self {
            entries: pairs.into_iter().collect(),
        })
    }

    /// Insert a line under its hash. Returns true only if a new entry was stored;
    /// duplicates and collisions both return false.
    pub fn insert(&mut self, hash: LineHash, line: &str) -> bool {
        self.insert_tagged(hash, line).is_new()
    }

    /// Insert a line under its hash and report what happened.
    pub fn insert_tagged(&mut self, hash: LineHash, line: &str) -> InsertOutcome {
        match self.entries.get(&hash) {
            None => {
                self.entries.insert(hash, line.to_owned());
                debug!(%hash, "Inserted new line");
                InsertOutcome::New
            }
            Some(existing) if existing == line => InsertOutcome::Duplicate,
            Some(existing) => {
                warn!(
                    %hash,
                    existing = %existing,
                    rejected = %line,
                    "Hash collision detected, new line ignored"
                );
                InsertOutcome::Collision
            }
        }
    }

    /// Look up the line stored under `hash`
    pub fn lookup(&self, hash: &LineHash) -> Option<&str> {
        self.entries.get(hash).map(String::as_str)
    }

    /// Number of distinct hashes stored
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Number of distinct hashes stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the store empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
