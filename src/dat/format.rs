#![forbid(unsafe_code)]

//! .dat layout:
//! - table: `n` records of `[u32 fingerprint][u32 offset][u32 size]`, LE
//! - sentinel record `[0][0][0]`
//! - blobs, concatenated in table order, offsets absolute from file start
//!
//! There is no header, alignment, compression or name storage.

/// Size of one table record in bytes.
pub const RECORD_LEN: u64 = 12;

/// Fingerprint value that terminates the table.
pub const SENTINEL: u32 = 0;

/// Table size for `count` real records plus the sentinel.
pub fn table_len(count: usize) -> u64 {
    RECORD_LEN * (count as u64 + 1)
}

/// One table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub fingerprint: u32,
    pub offset: u32,
    pub size: u32,
}

impl Entry {
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }
}

/// Public view of a table record with its catalog name, if known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub fingerprint: u32,
    pub offset: u32,
    pub size: u32,
    pub name: Option<String>,
}
