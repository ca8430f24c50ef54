#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::dat::error::{DatError, DatResult};
use crate::dat::format::{Entry, SENTINEL};
use crate::dat::io::read_record;

/// Reads the record table from the start of `r`.
///
/// Parsing stops at the sentinel record or at a short read; neither record
/// is returned. A record whose fingerprint was already seen is skipped, so
/// the first occurrence of a fingerprint wins.
pub(crate) fn read_table<R: Read + Seek>(r: &mut R) -> DatResult<Vec<Entry>> {
    r.seek(SeekFrom::Start(0))?;

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut slot = 0usize;

    while let Some(rec) = read_record(&mut *r)? {
        if rec.fingerprint == SENTINEL {
            debug!(slot, "sentinel record");
            break;
        }
        if !seen.insert(rec.fingerprint) {
            debug!(slot, fingerprint = rec.fingerprint, "duplicate table slot skipped");
        } else {
            out.push(rec);
        }
        slot += 1;
    }

    Ok(out)
}

/// Reads exactly `entry.size` bytes at `entry.offset`.
///
/// The buffer grows with the bytes actually present, so a corrupt size does
/// not allocate past the end of the stream.
pub(crate) fn read_blob<R: Read + Seek>(r: &mut R, entry: &Entry) -> DatResult<Vec<u8>> {
    r.seek(SeekFrom::Start(u64::from(entry.offset)))?;
    let mut data = Vec::new();
    (&mut *r).take(u64::from(entry.size)).read_to_end(&mut data)?;
    if data.len() as u64 != u64::from(entry.size) {
        return Err(DatError::Invalid(format!(
            "blob {} at {} is truncated: {} of {} bytes",
            entry.fingerprint,
            entry.offset,
            data.len(),
            entry.size
        )));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::io::write_record;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn rec(fingerprint: u32, offset: u32, size: u32) -> Entry {
        Entry {
            fingerprint,
            offset,
            size,
        }
    }

    fn table(records: &[Entry]) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        for r in records {
            write_record(&mut out, r).unwrap();
        }
        out
    }

    #[test]
    fn stops_at_sentinel_ignoring_trailing_bytes() {
        let mut bytes = table(&[rec(7, 36, 1), rec(9, 37, 2), rec(0, 0, 0)]);
        // Looks like more records, but must never be parsed.
        bytes.extend(table(&[rec(11, 0, 0), rec(12, 0, 0)]));

        let entries = read_table(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(entries, vec![rec(7, 36, 1), rec(9, 37, 2)]);
    }

    #[test]
    fn sentinel_offset_and_size_are_ignored() {
        let bytes = table(&[rec(5, 24, 3), rec(0, 99, 99)]);
        let entries = read_table(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(entries, vec![rec(5, 24, 3)]);
    }

    #[test]
    fn duplicate_fingerprint_keeps_first() {
        let bytes = table(&[rec(5, 36, 4), rec(5, 40, 8), rec(6, 48, 1), rec(0, 0, 0)]);
        let entries = read_table(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(entries, vec![rec(5, 36, 4), rec(6, 48, 1)]);
    }

    #[test]
    fn truncated_table_is_natural_end() {
        let mut bytes = table(&[rec(5, 24, 3)]);
        bytes.extend_from_slice(&[1, 2, 3, 4, 5]);
        let entries = read_table(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(entries, vec![rec(5, 24, 3)]);

        assert!(read_table(&mut Cursor::new(Vec::<u8>::new())).unwrap().is_empty());
    }

    #[test]
    fn blob_reads_are_random_access() {
        let mut bytes = table(&[rec(1, 24, 3), rec(0, 0, 0)]);
        bytes.extend_from_slice(b"abcXYZ");
        let mut cur = Cursor::new(bytes);

        assert_eq!(read_blob(&mut cur, &rec(2, 27, 3)).unwrap(), b"XYZ");
        assert_eq!(read_blob(&mut cur, &rec(1, 24, 3)).unwrap(), b"abc");
        assert_eq!(read_blob(&mut cur, &rec(3, 25, 0)).unwrap(), b"");
        assert!(read_blob(&mut cur, &rec(4, 28, 5)).is_err());
    }

    #[test]
    fn oversized_record_is_rejected_as_truncated() {
        let mut bytes = table(&[rec(1, 24, u32::MAX), rec(0, 0, 0)]);
        bytes.extend_from_slice(b"abc");
        let mut cur = Cursor::new(bytes);

        let err = read_blob(&mut cur, &rec(1, 24, u32::MAX)).unwrap_err();
        assert!(matches!(err, DatError::Invalid(_)));
        assert!(read_blob(&mut cur, &rec(2, u32::MAX, 1)).is_err());
    }
}
