//! Side-files tracking the underutilized heap pages (`U`) and free node
//! slots (`F`). Each is a sorted, deduplicated `Vec<i32>` persisted whole as
//! `[i32 count][i32 values...]`.

use byteorder::{ByteOrder, LittleEndian};
use std::fs;
use std::path::Path;

use crate::error::{PbError, Result};

/// Loads a sorted-id list from `path`. A missing file is treated as empty.
pub fn load_list<P: AsRef<Path>>(path: P) -> Result<Vec<i32>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path)?;
    if bytes.len() < 4 {
        return Err(PbError::StorageCorruption(format!(
            "{} shorter than the list header",
            path.display()
        )));
    }
    let count = LittleEndian::read_i32(&bytes[0..4]);
    if count < 0 {
        return Err(PbError::StorageCorruption(format!("{} has negative count", path.display())));
    }
    let count = count as usize;
    let needed = 4 + count * 4;
    if bytes.len() < needed {
        return Err(PbError::StorageCorruption(format!("{} truncated", path.display())));
    }
    let mut list = Vec::with_capacity(count);
    for i in 0..count {
        let offset = 4 + i * 4;
        list.push(LittleEndian::read_i32(&bytes[offset..offset + 4]));
    }
    Ok(list)
}

/// Persists `list` whole, overwriting `path`.
pub fn save_list<P: AsRef<Path>>(path: P, list: &[i32]) -> Result<()> {
    let mut bytes = vec![0u8; 4 + list.len() * 4];
    LittleEndian::write_i32(&mut bytes[0..4], list.len() as i32);
    for (i, v) in list.iter().enumerate() {
        let offset = 4 + i * 4;
        LittleEndian::write_i32(&mut bytes[offset..offset + 4], *v);
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Inserts `v` into `list` keeping it sorted and free of duplicates.
pub fn insert_sorted_unique(list: &mut Vec<i32>, v: i32) {
    match list.binary_search(&v) {
        Ok(_) => {}
        Err(idx) => list.insert(idx, v),
    }
}

/// Removes and returns the smallest id in `list`, if any.
pub fn pop_smallest(list: &mut Vec<i32>) -> Option<i32> {
    if list.is_empty() {
        None
    } else {
        Some(list.remove(0))
    }
}

/// Removes `v` from `list` if present.
pub fn remove(list: &mut Vec<i32>, v: i32) {
    if let Ok(idx) = list.binary_search(&v) {
        list.remove(idx);
    }
}
