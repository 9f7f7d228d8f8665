//! Run configuration shared by the library operations and the CLI

use crate::compression::CompressionAlgorithm;
use crate::error::LineRefError;
use crate::fingerprint::{HashAlgorithm, Normalization};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the persisted store
pub const DEFAULT_STORE_PATH: &str = "dedupe_main.db";

/// Settings for a seed/encode/decode run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineRefConfig {
    /// Persisted store blob
    pub store_path: PathBuf,
    /// Line hash function. Must match the one the store was built with.
    pub hash: HashAlgorithm,
    /// Normalization applied before hashing and storing
    pub normalization: Normalization,
    /// Compression used when saving the store
    pub compression: CompressionAlgorithm,
}

impl Default for LineRefConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            hash: HashAlgorithm::default(),
            normalization: Normalization::default(),
            compression: CompressionAlgorithm::default(),
        }
    }
}

impl LineRefConfig {
    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: &Path) -> Result<Self, LineRefError> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents).map_err(|e| LineRefError::Config(e.to_string())),
            "json" => {
                serde_json::from_str(&contents).map_err(|e| LineRefError::Config(e.to_string()))
            }
            _ => Err(LineRefError::Config(format!(
                "Unsupported config file extension: {}",
                ext
            ))),
        }
    }
}
