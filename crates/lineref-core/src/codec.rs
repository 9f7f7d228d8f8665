//! Line codec: seeds the store from text, encodes text into hash-reference
//! streams and decodes those streams back into text.

use crate::config::LineRefConfig;
use crate::error::LineRefError;
use crate::fingerprint::{LineHash, LineHasher, Normalization, Xxh32Hasher};
use crate::store::{ContentStore, InsertOutcome};
use crate::wire::{starts_with_marker, Record, RecordReader};
use serde::Serialize;
use std::io::{self, BufRead, Read, Write};
use std::ops::AddAssign;
use tracing::{debug, warn};

/// Counters from seeding one or more text sources
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedStats {
    /// Number of sources scanned
    pub sources: usize,
    /// Every line read, blank lines included
    pub lines_scanned: u64,
    /// Lines skipped because they were empty
    pub blank_lines: u64,
    /// Lines that created a new store entry
    pub new_entries: u64,
    /// Lines already present in the store
    pub duplicates: u64,
    /// Lines rejected because their hash belongs to a different line
    pub collisions: u64,
}

impl SeedStats {
    fn record(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::New => self.new_entries += 1,
            InsertOutcome::Duplicate => self.duplicates += 1,
            InsertOutcome::Collision => self.collisions += 1,
        }
    }
}

impl AddAssign for SeedStats {
    fn add_assign(&mut self, other: Self) {
        self.sources += other.sources;
        self.lines_scanned += other.lines_scanned;
        self.blank_lines += other.blank_lines;
        self.new_entries += other.new_entries;
        self.duplicates += other.duplicates;
        self.collisions += other.collisions;
    }
}

/// Counters from encoding one text stream
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncodeStats {
    /// Lines read from the input
    pub lines: u64,
    /// Blank markers written
    pub blank_lines: u64,
    /// Lines that created a new store entry
    pub new_entries: u64,
    /// Lines already present in the store
    pub duplicates: u64,
    /// Lines whose reference resolves to a different, earlier line
    pub collisions: u64,
    /// References whose first byte equals the blank marker
    pub ambiguous_refs: u64,
    /// Bytes written to the encoded stream
    pub bytes_written: u64,
}

/// Counters from decoding one encoded stream
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Records parsed
    pub records: u64,
    /// Blank lines emitted
    pub blank_lines: u64,
    /// References resolved to a stored line
    pub resolved: u64,
    /// References with no store entry; their lines are lost
    pub missing: u64,
}

/// Hashes lines and moves them between text, the store and encoded streams.
/// Borrows the store mutably so seeding and encoding in one run share it.
pub struct LineCodec<'a> {
    store: &'a mut ContentStore,
    hasher: Box<dyn LineHasher>,
    normalization: Normalization,
}

impl<'a> LineCodec<'a> {
    /// Codec with the XXH32 hasher and no normalization
    pub fn new(store: &'a mut ContentStore) -> Self {
        Self {
            store,
            hasher: Box::new(Xxh32Hasher),
            normalization: Normalization::None,
        }
    }

    /// Codec with hasher and normalization taken from configuration
    pub fn from_config(store: &'a mut ContentStore, config: &LineRefConfig) -> Self {
        Self {
            store,
            hasher: config.hash.hasher(),
            normalization: config.normalization,
        }
    }

    /// Replace the hasher
    pub fn with_hasher(mut self, hasher: impl LineHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    /// Replace the normalization
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// The underlying store
    pub fn store(&self) -> &ContentStore {
        &*self.store
    }

    /// Hash of a line as this codec would store it
    pub fn hash_line(&self, line: &str) -> LineHash {
        self.hasher.hash(&self.normalization.apply(line))
    }

    /// Add every non-empty line of `source` to the store. Produces no stream.
    pub fn seed<R: BufRead>(&mut self, source: R) -> Result<SeedStats, LineRefError> {
        let mut stats = SeedStats::default();
        self.seed_into(source, &mut stats)?;
        Ok(stats)
    }

    /// Like [`LineCodec::seed`], but counts into `stats` as lines are read, so
    /// a source that fails partway still accounts for the lines it inserted.
    pub fn seed_into<R: BufRead>(
        &mut self,
        mut source: R,
        stats: &mut SeedStats,
    ) -> Result<(), LineRefError> {
        stats.sources += 1;
        let mut buf = Vec::new();
        while let Some(raw) = read_line(&mut source, &mut buf)? {
            stats.lines_scanned += 1;
            let line = self.normalization.apply(&raw);
            if line.is_empty() {
                stats.blank_lines += 1;
                continue;
            }
            let hash = self.hasher.hash(&line);
            stats.record(self.store.insert_tagged(hash, &line));
        }
        debug!(
            lines = stats.lines_scanned,
            new = stats.new_entries,
            "Seeded source"
        );
        Ok(())
    }

    /// Encode `input` into a stream of blank markers and hash references,
    /// inserting every non-empty line into the store on the way.
    ///
    /// A reference is written even when the insert collided, so that line
    /// decodes to whatever text already owns the hash.
    pub fn encode<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> Result<EncodeStats, LineRefError> {
        let mut stats = EncodeStats::default();
        let mut buf = Vec::new();
        while let Some(raw) = read_line(&mut input, &mut buf)? {
            stats.lines += 1;
            let line = self.normalization.apply(&raw);
            let record = if line.is_empty() {
                stats.blank_lines += 1;
                Record::Blank
            } else {
                let hash = self.hasher.hash(&line);
                match self.store.insert_tagged(hash, &line) {
                    InsertOutcome::New => stats.new_entries += 1,
                    InsertOutcome::Duplicate => stats.duplicates += 1,
                    InsertOutcome::Collision => stats.collisions += 1,
                }
                if starts_with_marker(&hash) {
                    stats.ambiguous_refs += 1;
                    debug!(
                        %hash,
                        line = stats.lines,
                        "Reference starts with the blank marker byte"
                    );
                }
                Record::HashRef(hash)
            };
            record.write_to(&mut output)?;
            stats.bytes_written += record.encoded_len() as u64;
        }
        output.flush()?;
        Ok(stats)
    }

    /// Decode an encoded stream against this codec's store.
    pub fn decode<R: Read, W: Write>(
        &self,
        stream: R,
        output: W,
    ) -> Result<DecodeStats, LineRefError> {
        decode_stream(&*self.store, stream, output)
    }
}

/// Decode `stream` into newline-terminated text using read-only store lookups.
///
/// Missing hashes are logged and skipped. A truncated final record returns
/// [`LineRefError::TruncatedRecord`] after all earlier lines have been written
/// and flushed.
pub fn decode_stream<R: Read, W: Write>(
    store: &ContentStore,
    stream: R,
    mut output: W,
) -> Result<DecodeStats, LineRefError> {
    let mut stats = DecodeStats::default();
    let mut reader = RecordReader::new(stream);
    loop {
        let record_offset = reader.offset();
        let record = match reader.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(e) => {
                output.flush()?;
                return Err(e);
            }
        };
        stats.records += 1;
        match record {
            Record::Blank => {
                stats.blank_lines += 1;
                output.write_all(b"\n")?;
            }
            Record::HashRef(hash) => match store.lookup(&hash) {
                Some(line) => {
                    stats.resolved += 1;
                    output.write_all(line.as_bytes())?;
                    output.write_all(b"\n")?;
                }
                None => {
                    stats.missing += 1;
                    warn!(
                        %hash,
                        offset = record_offset,
                        "Hash not found in store, line cannot be restored"
                    );
                }
            },
        }
    }
    output.flush()?;
    Ok(stats)
}

/// Read one line with its terminator (`\n` or `\r\n`) removed.
/// Invalid UTF-8 is replaced rather than rejected.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps every line to the same hash, forcing collisions.
    struct FixedHasher(LineHash);

    impl LineHasher for FixedHasher {
        fn hash(&self, _line: &str) -> LineHash {
            self.0
        }
    }

    fn decode_to_string(
        store: &ContentStore,
        bytes: &[u8],
    ) -> (String, Result<DecodeStats, LineRefError>) {
        let mut out = Vec::new();
        let result = decode_stream(store, bytes, &mut out);
        (String::from_utf8(out).unwrap(), result)
    }

    #[test]
    fn basic_round_trip_layout() {
        let mut store = ContentStore::new();
        let mut codec = LineCodec::new(&mut store);
        let mut encoded = Vec::new();
        let stats = codec.encode(&b"foo\n\nbar\n"[..], &mut encoded).unwrap();

        let mut expected = Xxh32Hasher.hash("foo").0.to_vec();
        expected.push(0x00);
        expected.extend(Xxh32Hasher.hash("bar").0);
        assert_eq!(encoded, expected);
        assert_eq!(&encoded[..4], &[0xe2, 0x0f, 0x0d, 0xd9]);
        assert_eq!(encoded.len(), 9);
        assert_eq!(stats.bytes_written, 9);
        assert_eq!(stats.new_entries, 2);
        assert_eq!(stats.blank_lines, 1);

        let mut decoded = Vec::new();
        codec.decode(&encoded[..], &mut decoded).unwrap();
        assert_eq!(decoded, b"foo\n\nbar\n");
    }

    #[test]
    fn seeding_counts() {
        let mut store = ContentStore::new();
        let stats = LineCodec::new(&mut store)
            .seed(&b"alpha\nbeta\nalpha\n"[..])
            .unwrap();
        assert_eq!(stats.lines_scanned, 3);
        assert_eq!(stats.new_entries, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(store.size(), 2);
    }

    #[test]
    fn seeding_skips_blank_lines_but_counts_them() {
        let mut store = ContentStore::new();
        let stats = LineCodec::new(&mut store).seed(&b"a\n\n\nb"[..]).unwrap();
        assert_eq!(stats.lines_scanned, 4);
        assert_eq!(stats.blank_lines, 2);
        assert_eq!(store.size(), 2);
    }

    #[test]
    fn encode_after_seed_adds_nothing_new() {
        let mut store = ContentStore::new();
        let mut codec = LineCodec::new(&mut store);
        codec.seed(&b"one\ntwo\n"[..]).unwrap();
        let stats = codec.encode(&b"two\none\n"[..], Vec::new()).unwrap();
        assert_eq!(stats.new_entries, 0);
        assert_eq!(stats.duplicates, 2);
    }

    #[test]
    fn collision_reference_decodes_to_first_line() {
        let mut store = ContentStore::new();
        let hash = LineHash([0x10, 0x20, 0x30, 0x40]);
        let mut codec = LineCodec::new(&mut store).with_hasher(FixedHasher(hash));
        let mut encoded = Vec::new();
        let stats = codec.encode(&b"cat\ndog\n"[..], &mut encoded).unwrap();
        assert_eq!(stats.new_entries, 1);
        assert_eq!(stats.collisions, 1);
        assert_eq!(encoded, [hash.0, hash.0].concat());

        let mut decoded = Vec::new();
        codec.decode(&encoded[..], &mut decoded).unwrap();
        assert_eq!(decoded, b"cat\ncat\n");
        assert_eq!(store.lookup(&hash), Some("cat"));
    }

    #[test]
    fn missing_hash_is_skipped() {
        let mut store = ContentStore::new();
        let known = Xxh32Hasher.hash("known");
        store.insert(known, "known");
        let unknown = LineHash([0x99, 0x88, 0x77, 0x66]);
        assert!(store.lookup(&unknown).is_none());

        let mut bytes = known.0.to_vec();
        bytes.extend(unknown.0);
        bytes.push(0x00);
        bytes.extend(known.0);
        let (text, result) = decode_to_string(&store, &bytes);
        let stats = result.unwrap();
        assert_eq!(text, "known\n\nknown\n");
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.resolved, 2);
        assert_eq!(stats.records, 4);
    }

    #[test]
    fn truncated_record_keeps_prior_output() {
        let mut store = ContentStore::new();
        let hash = Xxh32Hasher.hash("kept");
        store.insert(hash, "kept");
        let bytes = [hash.0.to_vec(), vec![0x00, 0x7f, 0x01, 0x02]].concat();
        let (text, result) = decode_to_string(&store, &bytes);
        assert_eq!(text, "kept\n\n");
        assert!(matches!(
            result,
            Err(LineRefError::TruncatedRecord { offset: 5, available: 2 })
        ));
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let mut store = ContentStore::new();
        let mut codec = LineCodec::new(&mut store);
        let mut encoded = Vec::new();
        codec.encode(&b"left\r\n\r\nright"[..], &mut encoded).unwrap();
        let mut decoded = Vec::new();
        codec.decode(&encoded[..], &mut decoded).unwrap();
        assert_eq!(decoded, b"left\n\nright\n");
    }

    #[test]
    fn case_fold_merges_variants() {
        let mut store = ContentStore::new();
        let mut codec =
            LineCodec::new(&mut store).with_normalization(Normalization::CaseFold);
        let stats = codec.seed(&b"Hello World\n  hello world  \nHELLO WORLD\n"[..]).unwrap();
        assert_eq!(stats.new_entries, 1);
        assert_eq!(stats.duplicates, 2);
        assert_eq!(stats.collisions, 0);
        assert_eq!(codec.hash_line("HeLLo WoRLD"), Xxh32Hasher.hash("hello world"));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn without_normalization_case_variants_are_distinct() {
        let mut store = ContentStore::new();
        LineCodec::new(&mut store)
            .seed(&b"Hello\nhello\n"[..])
            .unwrap();
        assert_eq!(store.size(), 2);
    }

    #[test]
    fn case_fold_turns_whitespace_lines_into_blanks() {
        let mut store = ContentStore::new();
        let mut codec =
            LineCodec::new(&mut store).with_normalization(Normalization::CaseFold);
        let mut encoded = Vec::new();
        codec.encode(&b"A\n   \nB\n"[..], &mut encoded).unwrap();
        assert_eq!(encoded[4], 0x00);
        assert_eq!(encoded.len(), 9);
    }

    #[test]
    fn marker_prefixed_hash_is_counted_as_ambiguous() {
        let mut store = ContentStore::new();
        let hash = LineHash([0x00, 0x01, 0x02, 0x03]);
        let stats = LineCodec::new(&mut store)
            .with_hasher(FixedHasher(hash))
            .encode(&b"unlucky\n"[..], Vec::new())
            .unwrap();
        assert_eq!(stats.ambiguous_refs, 1);
    }

    #[test]
    fn seed_stats_accumulate() {
        let mut total = SeedStats::default();
        total += SeedStats {
            sources: 1,
            lines_scanned: 3,
            new_entries: 2,
            ..Default::default()
        };
        total += SeedStats {
            sources: 1,
            lines_scanned: 4,
            collisions: 1,
            ..Default::default()
        };
        assert_eq!(total.sources, 2);
        assert_eq!(total.lines_scanned, 7);
        assert_eq!(total.new_entries, 2);
        assert_eq!(total.collisions, 1);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut store = ContentStore::new();
        LineCodec::new(&mut store).seed(&b"caf\xe9\n"[..]).unwrap();
        let hash = Xxh32Hasher.hash("caf\u{FFFD}");
        assert_eq!(store.lookup(&hash), Some("caf\u{FFFD}"));
    }

    /// Yields `data`, then fails every further read.
    struct FailingReader {
        data: &'static [u8],
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(io::ErrorKind::Other, "disk went away"));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn failed_source_keeps_partial_counts() {
        let mut store = ContentStore::new();
        let mut codec = LineCodec::new(&mut store);
        let mut stats = SeedStats::default();
        let source = io::BufReader::new(FailingReader {
            data: b"north\nsouth\nnorth\n",
        });
        let result = codec.seed_into(source, &mut stats);
        assert!(matches!(result, Err(LineRefError::Io(_))));
        assert_eq!(stats.sources, 1);
        assert_eq!(stats.lines_scanned, 3);
        assert_eq!(stats.new_entries, 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(codec.store().size(), 2);
    }

    #[test]
    fn store_reflects_encoded_lines() {
        let mut store = ContentStore::new();
        let mut codec = LineCodec::new(&mut store);
        codec.encode(&b"east\n\nwest\n"[..], Vec::new()).unwrap();
        assert_eq!(codec.store().size(), 2);
        assert_eq!(codec.store().lookup(&Xxh32Hasher.hash("west")), Some("west"));
    }
}
