#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::dat::error::{DatError, DatResult};
use crate::dat::format::{table_len, Entry};
use crate::dat::io::write_record;

/// Where a blob's bytes come from when the archive is written.
#[derive(Debug, Clone)]
pub enum BlobSource {
    File(PathBuf),
    Memory(Vec<u8>),
}

impl BlobSource {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(match self {
            BlobSource::File(p) => Box::new(File::open(p)?),
            BlobSource::Memory(b) => Box::new(Cursor::new(b.as_slice())),
        })
    }

    fn describe(&self) -> String {
        match self {
            BlobSource::File(p) => p.display().to_string(),
            BlobSource::Memory(_) => "<memory>".into(),
        }
    }
}

/// An entry waiting for its offset.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub fingerprint: u32,
    pub size: u32,
    pub source: BlobSource,
}

/// Assigns offsets: blobs follow the table back to back, in input order.
pub(crate) fn layout(pending: &[PendingEntry]) -> DatResult<Vec<Entry>> {
    let mut offset = table_len(pending.len());
    let mut out = Vec::with_capacity(pending.len());

    for p in pending {
        let off = u32::try_from(offset)
            .map_err(|_| DatError::Invalid("archive exceeds the 4 GiB offset range".into()))?;
        out.push(Entry {
            fingerprint: p.fingerprint,
            offset: off,
            size: p.size,
        });
        offset += u64::from(p.size);
    }

    if offset > u64::from(u32::MAX) + 1 {
        return Err(DatError::Invalid(
            "archive exceeds the 4 GiB offset range".into(),
        ));
    }

    Ok(out)
}

/// Writes table, sentinel and blobs. Fingerprint uniqueness is not checked.
///
/// Each source is streamed and must yield exactly its declared size.
pub(crate) fn write_archive(out: &mut dyn Write, pending: &[PendingEntry]) -> DatResult<Vec<Entry>> {
    let entries = layout(pending)?;

    for e in &entries {
        write_record(out, e)?;
    }
    write_record(
        out,
        &Entry {
            fingerprint: 0,
            offset: 0,
            size: 0,
        },
    )?;

    for (p, e) in pending.iter().zip(&entries) {
        let src = p.source.open()?;
        let copied = io::copy(&mut src.take(u64::from(p.size)), &mut *out)?;
        if copied != u64::from(p.size) {
            return Err(DatError::Invalid(format!(
                "{} shrank while packing: expected {} bytes, got {copied}",
                p.source.describe(),
                p.size
            )));
        }
        debug!(fingerprint = e.fingerprint, offset = e.offset, size = e.size, "packed blob");
    }

    out.flush()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::read::{read_blob, read_table};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn mem(fingerprint: u32, bytes: &[u8]) -> PendingEntry {
        PendingEntry {
            fingerprint,
            size: bytes.len() as u32,
            source: BlobSource::Memory(bytes.to_vec()),
        }
    }

    #[test]
    fn exact_byte_layout() {
        let mut out: Vec<u8> = Vec::new();
        write_archive(&mut out, &[mem(0xAABBCCDD, b"hi"), mem(2, b"xyz")]).unwrap();

        let mut expected = Vec::new();
        for w in [0xAABBCCDDu32, 36, 2, 2, 38, 3, 0, 0, 0] {
            expected.extend_from_slice(&w.to_le_bytes());
        }
        expected.extend_from_slice(b"hixyz");
        assert_eq!(out, expected);
    }

    #[test]
    fn empty_archive_is_just_the_sentinel() {
        let mut out: Vec<u8> = Vec::new();
        let entries = write_archive(&mut out, &[]).unwrap();
        assert!(entries.is_empty());
        assert_eq!(out, vec![0u8; 12]);
    }

    #[test]
    fn written_archive_reads_back() {
        let pending = [mem(10, b"first"), mem(20, b""), mem(30, b"third blob")];
        let mut out: Vec<u8> = Vec::new();
        let written = write_archive(&mut out, &pending).unwrap();

        let mut cur = Cursor::new(out);
        let entries = read_table(&mut cur).unwrap();
        assert_eq!(entries, written);
        assert_eq!(read_blob(&mut cur, &entries[2]).unwrap(), b"third blob");
        assert_eq!(read_blob(&mut cur, &entries[1]).unwrap(), b"");
    }

    #[test]
    fn duplicate_fingerprints_are_written_as_given() {
        let mut out: Vec<u8> = Vec::new();
        let entries = write_archive(&mut out, &[mem(4, b"a"), mem(4, b"b")]).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(out.len(), 36 + 2);
    }

    #[test]
    fn short_source_is_rejected() {
        let mut bad = mem(1, b"abc");
        bad.size = 10;
        let err = write_archive(&mut Vec::<u8>::new(), &[bad]).unwrap_err();
        assert!(matches!(err, DatError::Invalid(_)));
    }

    #[test]
    fn offsets_beyond_u32_are_rejected() {
        let big = PendingEntry {
            fingerprint: 1,
            size: u32::MAX,
            source: BlobSource::Memory(Vec::new()),
        };
        assert!(layout(&[big.clone(), big]).is_err());
    }

    proptest! {
        #[test]
        fn offsets_are_contiguous(sizes in proptest::collection::vec(0u32..100_000, 0..64)) {
            let pending: Vec<_> = sizes
                .iter()
                .enumerate()
                .map(|(i, &size)| PendingEntry {
                    fingerprint: i as u32 + 1,
                    size,
                    source: BlobSource::Memory(Vec::new()),
                })
                .collect();

            let entries = layout(&pending).unwrap();
            prop_assert_eq!(entries.len(), sizes.len());
            if let Some(first) = entries.first() {
                prop_assert_eq!(u64::from(first.offset), 12 * (sizes.len() as u64 + 1));
            }
            for w in entries.windows(2) {
                prop_assert_eq!(w[1].offset, w[0].offset + w[0].size);
            }
        }
    }
}
