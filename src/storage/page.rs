use byteorder::{ByteOrder, LittleEndian};

use super::record::{Record, RECORD_WIDTH};
use crate::error::{PbError, Result};

/// Width in bytes of a heap page block on disk.
pub const PAGE_WIDTH: usize = 256;

/// Maximum number of records a heap page can hold.
pub const PAGE_CAPACITY: usize = (PAGE_WIDTH - 4) / RECORD_WIDTH;

/// A heap page: a count-prefixed, key-sorted array of [`Record`]s.
#[derive(Debug, Clone, Default)]
pub struct HeapPage {
    pub records: Vec<Record>,
}

impl HeapPage {
    pub fn empty() -> Self {
        HeapPage { records: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_underutilized(&self) -> bool {
        self.records.len() < PAGE_CAPACITY
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= PAGE_CAPACITY
    }

    fn find(&self, key: i32) -> std::result::Result<usize, usize> {
        self.records.binary_search_by_key(&key, |r| r.key)
    }

    pub fn get(&self, key: i32) -> Option<&Record> {
        self.find(key).ok().map(|i| &self.records[i])
    }

    /// Inserts `record` keeping the array sorted by key. Fails if the page is
    /// already at [`PAGE_CAPACITY`] or the key already exists on this page.
    pub fn insert(&mut self, record: Record) -> Result<()> {
        if self.records.len() >= PAGE_CAPACITY {
            return Err(PbError::InvariantViolation(format!(
                "heap page full (capacity {PAGE_CAPACITY})"
            )));
        }
        match self.find(record.key) {
            Ok(_) => Err(PbError::AlreadyExists(record.key)),
            Err(idx) => {
                self.records.insert(idx, record);
                Ok(())
            }
        }
    }

    pub fn remove(&mut self, key: i32) -> Result<Record> {
        match self.find(key) {
            Ok(idx) => Ok(self.records.remove(idx)),
            Err(_) => Err(PbError::NotFound(key)),
        }
    }

    pub fn update(&mut self, key: i32, p_a: f64, p_b: f64, p_aub: f64) -> Result<()> {
        match self.find(key) {
            Ok(idx) => {
                let r = &mut self.records[idx];
                r.p_a = p_a;
                r.p_b = p_b;
                r.p_aub = p_aub;
                Ok(())
            }
            Err(_) => Err(PbError::NotFound(key)),
        }
    }

    pub fn encode(&self) -> [u8; PAGE_WIDTH] {
        let mut buf = [0u8; PAGE_WIDTH];
        LittleEndian::write_i32(&mut buf[0..4], self.records.len() as i32);
        let mut offset = 4;
        for record in &self.records {
            record.encode(&mut buf[offset..offset + RECORD_WIDTH]);
            offset += RECORD_WIDTH;
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < 4 {
            return Err(PbError::StorageCorruption("heap page shorter than header".into()));
        }
        let n = LittleEndian::read_i32(&buf[0..4]);
        if n < 0 || n as usize > PAGE_CAPACITY {
            return Err(PbError::StorageCorruption(format!(
                "heap page record count {n} out of range"
            )));
        }
        let n = n as usize;
        let needed = 4 + n * RECORD_WIDTH;
        if buf.len() < needed {
            return Err(PbError::StorageCorruption("heap page truncated".into()));
        }
        let mut records = Vec::with_capacity(n);
        let mut offset = 4;
        for _ in 0..n {
            let record = Record::decode(&buf[offset..offset + RECORD_WIDTH])
                .ok_or_else(|| PbError::StorageCorruption("malformed record".into()))?;
            records.push(record);
            offset += RECORD_WIDTH;
        }
        Ok(HeapPage { records })
    }
}
