#![forbid(unsafe_code)]

use std::io::{ErrorKind, Read, Write};

use crate::dat::error::DatResult;
use crate::dat::format::{Entry, RECORD_LEN};

pub fn write_u32(w: &mut dyn Write, v: u32) -> DatResult<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_record(w: &mut dyn Write, e: &Entry) -> DatResult<()> {
    write_u32(w, e.fingerprint)?;
    write_u32(w, e.offset)?;
    write_u32(w, e.size)?;
    Ok(())
}

/// Reads one table record. Returns `None` when fewer than 12 bytes remain.
pub fn read_record(r: &mut dyn Read) -> DatResult<Option<Entry>> {
    let mut buf = [0u8; RECORD_LEN as usize];
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => return Ok(None),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    let word = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
    Ok(Some(Entry {
        fingerprint: word(0),
        offset: word(4),
        size: word(8),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn record_layout_is_little_endian() {
        let mut out: Vec<u8> = Vec::new();
        write_record(
            &mut out,
            &Entry {
                fingerprint: 0x0403_0201,
                offset: 0x0807_0605,
                size: 0x0C0B_0A09,
            },
        )
        .unwrap();
        assert_eq!(out, (1u8..=12).collect::<Vec<_>>());
    }

    #[test]
    fn short_read_is_none() {
        let mut cur = Cursor::new(vec![1u8; 11]);
        assert!(read_record(&mut cur).unwrap().is_none());

        let mut cur = Cursor::new(Vec::<u8>::new());
        assert!(read_record(&mut cur).unwrap().is_none());
    }
}
