//! Encoded stream framing.
//!
//! A stream is a bare sequence of records with no header or length prefix:
//! a single `0x00` byte is a blank line, any other leading byte starts a
//! 4-byte hash reference. Records are not self-delimiting, so a hash whose
//! first byte is `0x00` cannot be told apart from a blank marker followed by
//! three stray bytes. The format keeps that ambiguity; see
//! [`starts_with_marker`].

use crate::error::LineRefError;
use crate::fingerprint::LineHash;
use std::io::{self, Read, Write};

/// Reserved byte value representing an empty line
pub const BLANK_MARKER: u8 = 0x00;

/// Width of a hash reference record in bytes
pub const HASH_REF_LEN: usize = 4;

/// One record of an encoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    /// An empty line
    Blank,
    /// A reference to a stored line
    HashRef(LineHash),
}

impl Record {
    /// Number of bytes this record occupies on the wire
    pub fn encoded_len(&self) -> usize {
        match self {
            Record::Blank => 1,
            Record::HashRef(_) => HASH_REF_LEN,
        }
    }

    /// Write the record's wire bytes
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Record::Blank => out.write_all(&[BLANK_MARKER]),
            Record::HashRef(hash) => out.write_all(hash.as_bytes()),
        }
    }
}

/// True if a hash reference for `hash` would be mis-read as a blank marker on decode
pub fn starts_with_marker(hash: &LineHash) -> bool {
    hash.0[0] == BLANK_MARKER
}

/// Streaming record parser.
///
/// Reads one byte at a time to decide the record kind, then the remaining
/// three hash bytes. A short hash record ends the stream with
/// [`LineRefError::TruncatedRecord`]; no partial record is ever returned.
pub struct RecordReader<R> {
    inner: R,
    offset: u64,
    finished: bool,
}

impl<R: Read> RecordReader<R> {
    /// Wrap a byte source. Callers should pass a buffered reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            finished: false,
        }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Parse the next record. `Ok(None)` at a clean end of stream.
    pub fn next_record(&mut self) -> Result<Option<Record>, LineRefError> {
        if self.finished {
            return Ok(None);
        }
        let mut first = [0u8; 1];
        if self.read_up_to(&mut first)? == 0 {
            self.finished = true;
            return Ok(None);
        }
        let start = self.offset;
        self.offset += 1;
        if first[0] == BLANK_MARKER {
            return Ok(Some(Record::Blank));
        }

        let mut rest = [0u8; HASH_REF_LEN - 1];
        let available = self.read_up_to(&mut rest)?;
        self.offset += available as u64;
        if available < rest.len() {
            self.finished = true;
            return Err(LineRefError::TruncatedRecord {
                offset: start,
                available,
            });
        }
        Ok(Some(Record::HashRef(LineHash([
            first[0], rest[0], rest[1], rest[2],
        ]))))
    }

    fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record, LineRefError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
