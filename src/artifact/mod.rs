// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Binary artifact layout.
//!
//! Format (little-endian):
//! [32] Header (see `ArtifactHeader`)
//! [..] Parameter block (bincode, strategy specific)
//! For each vocabulary entry, in index order:
//!   [u32] Word byte length
//!   [..]  UTF-8 word
//!   [u64] Code offset in the code table
//!   [u32] Code length
//! [u64] Code table length
//! [..]  Code table
//! [u64] CRC-64 of every preceding byte

pub mod header;

use std::io::{self, Write};
use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use crc64fast::Digest;

use crate::error::{FormatError, Result};

pub use header::ArtifactHeader;

const TRAILER_SIZE: usize = 8;

/// Smallest possible encoded index entry (empty word).
const MIN_ENTRY_SIZE: usize = 4 + 8 + 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub word: String,
    pub offset: u64,
    pub len: u32,
}

/// Section boundaries of a validated artifact, relative to its first byte.
#[derive(Debug, Clone)]
pub struct Layout {
    pub header: ArtifactHeader,
    pub params: Range<usize>,
    pub entries: Vec<IndexEntry>,
    pub table: Range<usize>,
}

impl Layout {
    /// Code bytes of `entry`. Entries come from `parse`, which bounds-checks them.
    #[inline]
    pub fn code<'a>(&self, bytes: &'a [u8], entry: &IndexEntry) -> &'a [u8] {
        let start = self.table.start + entry.offset as usize;
        &bytes[start..start + entry.len as usize]
    }
}

/// Forwards writes while checksumming and counting them.
struct ChecksumWriter<W> {
    inner: W,
    digest: Digest,
    written: u64,
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.digest.write(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Writes a complete artifact. `records` are `(word, code)` in index order.
/// Returns the number of bytes written.
pub fn write_artifact<W: Write>(
    writer: W,
    header: &ArtifactHeader,
    params: &[u8],
    records: &[(&str, &[u8])],
) -> Result<u64> {
    let mut out = ChecksumWriter { inner: writer, digest: Digest::new(), written: 0 };

    out.write_all(&header.to_bytes())?;
    out.write_all(params)?;

    let mut offset = 0u64;
    for (word, code) in records {
        out.write_u32::<LittleEndian>(word.len() as u32)?;
        out.write_all(word.as_bytes())?;
        out.write_u64::<LittleEndian>(offset)?;
        out.write_u32::<LittleEndian>(code.len() as u32)?;
        offset += code.len() as u64;
    }

    out.write_u64::<LittleEndian>(offset)?;
    for (_, code) in records {
        out.write_all(code)?;
    }

    let checksum = out.digest.sum64();
    let mut inner = out.inner;
    inner.write_u64::<LittleEndian>(checksum)?;
    inner.flush()?;
    Ok(out.written + TRAILER_SIZE as u64)
}

/// Validates `bytes` as a whole artifact and locates its sections.
///
/// Checks header fields, then the CRC trailer, then every section boundary.
/// Code slots are checked against the table bounds only; width checks
/// belong to the codec.
pub fn parse(bytes: &[u8]) -> Result<Layout> {
    let header = ArtifactHeader::parse(bytes)?;
    if bytes.len() < ArtifactHeader::SIZE + TRAILER_SIZE {
        return Err(FormatError::Truncated("trailer").into());
    }

    let body_end = bytes.len() - TRAILER_SIZE;
    let expected = LittleEndian::read_u64(&bytes[body_end..]);
    let mut digest = Digest::new();
    digest.write(&bytes[..body_end]);
    let found = digest.sum64();
    if expected != found {
        return Err(FormatError::ChecksumMismatch { expected, found }.into());
    }

    let mut cursor = SectionCursor { bytes: &bytes[..body_end], pos: ArtifactHeader::SIZE };

    let params_len = usize::try_from(header.params_len)
        .map_err(|_| FormatError::Truncated("parameter block"))?;
    let params = cursor.take_range(params_len, "parameter block")?;

    let vocab_size = usize::try_from(header.vocab_size)
        .map_err(|_| FormatError::Truncated("vocabulary index"))?;
    let mut entries = Vec::with_capacity(vocab_size.min(cursor.remaining() / MIN_ENTRY_SIZE));
    for _ in 0..vocab_size {
        let word_len = cursor.read_u32("vocabulary index")? as usize;
        let word_bytes = cursor.take(word_len, "vocabulary index")?;
        let word = std::str::from_utf8(word_bytes)
            .map_err(|e| FormatError::Corrupt(format!("vocabulary entry {} is not UTF-8: {e}", entries.len())))?
            .to_string();
        let offset = cursor.read_u64("vocabulary index")?;
        let len = cursor.read_u32("vocabulary index")?;
        entries.push(IndexEntry { word, offset, len });
    }

    let table_len = cursor.read_u64("code table")?;
    let table_len = usize::try_from(table_len).map_err(|_| FormatError::Truncated("code table"))?;
    let table = cursor.take_range(table_len, "code table")?;
    if cursor.remaining() != 0 {
        return Err(FormatError::Corrupt(format!("{} trailing bytes after code table", cursor.remaining())).into());
    }

    for entry in &entries {
        let end = entry.offset.checked_add(entry.len as u64);
        if end.map_or(true, |end| end > table_len as u64) {
            return Err(FormatError::Corrupt(format!(
                "code slot of {:?} lies outside the code table",
                entry.word
            ))
            .into());
        }
    }

    Ok(Layout { header, params, entries, table })
}

struct SectionCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SectionCursor<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take_range(&mut self, len: usize, section: &'static str) -> Result<Range<usize>> {
        if len > self.remaining() {
            return Err(FormatError::Truncated(section).into());
        }
        let range = self.pos..self.pos + len;
        self.pos += len;
        Ok(range)
    }

    fn take(&mut self, len: usize, section: &'static str) -> Result<&'a [u8]> {
        let range = self.take_range(len, section)?;
        Ok(&self.bytes[range])
    }

    fn read_u32(&mut self, section: &'static str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, section)?))
    }

    fn read_u64(&mut self, section: &'static str) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8, section)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MembError;
    use crate::quant::StorageType;

    fn sample() -> Vec<u8> {
        let header = ArtifactHeader::new(2, StorageType::Full, 32, 2, 0);
        let a = [0u8, 0, 128, 63, 0, 0, 0, 64];
        let b = [0u8; 8];
        let mut buf = Vec::new();
        let written = write_artifact(&mut buf, &header, &[], &[("alpha", &a[..]), ("b", &b[..])]).unwrap();
        assert_eq!(written as usize, buf.len());
        buf
    }

    #[test]
    fn test_parse_locates_sections() {
        let bytes = sample();
        let layout = parse(&bytes).unwrap();
        assert_eq!(layout.header.vocab_size, 2);
        assert!(layout.params.is_empty());
        assert_eq!(layout.entries[0].word, "alpha");
        assert_eq!(layout.entries[1], IndexEntry { word: "b".into(), offset: 8, len: 8 });
        assert_eq!(layout.table.len(), 16);
        assert_eq!(layout.code(&bytes, &layout.entries[0]), &[0u8, 0, 128, 63, 0, 0, 0, 64]);
    }

    #[test]
    fn test_flipped_byte_fails_checksum() {
        let mut bytes = sample();
        let idx = bytes.len() - 12;
        bytes[idx] ^= 0x01;
        assert!(matches!(
            parse(&bytes),
            Err(MembError::Format(FormatError::ChecksumMismatch { .. }))
        ));
    }

    #[test]
    fn test_truncated_artifact_is_rejected() {
        let bytes = sample();
        for cut in [0, 10, ArtifactHeader::SIZE, ArtifactHeader::SIZE + 4, bytes.len() - 1] {
            assert!(matches!(parse(&bytes[..cut]), Err(MembError::Format(_))), "cut at {cut}");
        }
    }
}
