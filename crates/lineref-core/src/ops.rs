//! File-level operations: each loads the store, runs one codec pass and
//! persists the store when the pass may have changed it.

use crate::codec::{decode_stream, DecodeStats, EncodeStats, LineCodec, SeedStats};
use crate::config::LineRefConfig;
use crate::error::LineRefError;
use crate::store::ContentStore;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Seed the store with every line of every file matching `pattern`, then save it.
/// Fails with [`LineRefError::NoInputMatched`] before touching the store when
/// nothing matches. Unreadable files are logged and skipped; a file that fails
/// partway keeps the lines already inserted, and they are counted.
#[instrument(skip(config), fields(store = %config.store_path.display()))]
pub fn seed(pattern: &str, config: &LineRefConfig) -> Result<SeedStats, LineRefError> {
    let files = matching_files(pattern)?;
    if files.is_empty() {
        return Err(LineRefError::NoInputMatched(pattern.to_owned()));
    }

    let mut store = ContentStore::load(&config.store_path);
    let mut total = SeedStats::default();
    {
        let mut codec = LineCodec::from_config(&mut store, config);
        for path in &files {
            debug!(file = %path.display(), "Processing file");
            let file = match File::open(path) {
                Ok(file) => file,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            };
            if let Err(e) = codec.seed_into(BufReader::new(file), &mut total) {
                warn!(
                    file = %path.display(),
                    error = %e,
                    "Stopped reading file; lines read before the error were kept"
                );
            }
        }
        info!(
            files = total.sources,
            lines = total.lines_scanned,
            new = total.new_entries,
            collisions = total.collisions,
            entries = codec.store().size(),
            "Seeding complete"
        );
    }

    store.save_with(&config.store_path, config.compression)?;
    Ok(total)
}

/// Encode `input` into the binary stream at `output`, then save the store.
#[instrument(skip(config), fields(store = %config.store_path.display()))]
pub fn encode(
    input: &Path,
    output: &Path,
    config: &LineRefConfig,
) -> Result<EncodeStats, LineRefError> {
    if !input.exists() {
        return Err(LineRefError::InputNotFound(input.to_path_buf()));
    }

    let mut store = ContentStore::load(&config.store_path);
    let reader = BufReader::new(File::open(input)?);
    let writer = BufWriter::new(File::create(output)?);
    let stats = LineCodec::from_config(&mut store, config).encode(reader, writer)?;

    info!(
        lines = stats.lines,
        new = stats.new_entries,
        collisions = stats.collisions,
        bytes = stats.bytes_written,
        "Encoding complete"
    );
    if stats.ambiguous_refs > 0 {
        warn!(
            count = stats.ambiguous_refs,
            "Some references start with the blank marker byte and will not decode correctly"
        );
    }
    store.save_with(&config.store_path, config.compression)?;
    Ok(stats)
}

/// Decode `hash_file` into `output`. The store is only read, never saved.
#[instrument(skip(config, output), fields(store = %config.store_path.display()))]
pub fn decode<W: Write>(
    hash_file: &Path,
    config: &LineRefConfig,
    output: W,
) -> Result<DecodeStats, LineRefError> {
    if !hash_file.exists() {
        return Err(LineRefError::InputNotFound(hash_file.to_path_buf()));
    }

    let store = ContentStore::load(&config.store_path);
    let reader = BufReader::new(File::open(hash_file)?);
    let stats = decode_stream(&store, reader, output)?;

    info!(
        records = stats.records,
        missing = stats.missing,
        "Decoding complete"
    );
    Ok(stats)
}

fn matching_files(pattern: &str) -> Result<Vec<PathBuf>, LineRefError> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Unreadable path while matching pattern"),
        }
    }
    Ok(files)
}
