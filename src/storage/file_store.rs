//! Generic paged file I/O shared by the heap store and the node store.
//!
//! Mirrors the open/read/write-by-block-number shape of an InnoDB
//! tablespace, but writes back and creates files on demand instead of
//! assuming a pre-existing read-only data file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{PbError, Result};

/// A single fixed-width-block file, opened for read/write.
pub struct PagedFileStore {
    path: PathBuf,
    file: File,
    block_width: usize,
}

impl PagedFileStore {
    /// Opens `path`, creating it (with one empty block already written) if absent.
    pub fn ensure<P: AsRef<Path>>(path: P, block_width: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let mut store = PagedFileStore { path, file, block_width };
        if !existed {
            let empty = vec![0u8; block_width];
            store.write_block(0, &empty)?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn block_width(&self) -> usize {
        self.block_width
    }

    /// Number of whole blocks currently in the file.
    pub fn block_count(&self) -> Result<u64> {
        let len = self.file.metadata()?.len();
        Ok(len / self.block_width as u64)
    }

    /// Reads the block at `index`. A block past end-of-file reads as all-zero.
    pub fn read_block(&mut self, index: u64) -> Result<Vec<u8>> {
        let offset = index
            .checked_mul(self.block_width as u64)
            .ok_or_else(|| PbError::InvalidArgument("block index overflow".into()))?;
        let len = self.file.metadata()?.len();
        let mut buf = vec![0u8; self.block_width];
        if offset >= len {
            return Ok(buf);
        }
        self.file.seek(SeekFrom::Start(offset))?;
        let available = (len - offset).min(self.block_width as u64) as usize;
        self.file.read_exact(&mut buf[..available])?;
        Ok(buf)
    }

    /// Writes `bytes` (padded/truncated to `block_width`) at `index`, extending the file if needed.
    pub fn write_block(&mut self, index: u64, bytes: &[u8]) -> Result<()> {
        let offset = index
            .checked_mul(self.block_width as u64)
            .ok_or_else(|| PbError::InvalidArgument("block index overflow".into()))?;
        let mut block = vec![0u8; self.block_width];
        let copy_len = bytes.len().min(self.block_width);
        block[..copy_len].copy_from_slice(&bytes[..copy_len]);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&block)?;
        Ok(())
    }

    /// Appends a new block, returning its index.
    pub fn append_block(&mut self, bytes: &[u8]) -> Result<u64> {
        let index = self.block_count()?;
        self.write_block(index, bytes)?;
        Ok(index)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn ensure_creates_file_with_one_block() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::remove_file(tmp.path()).unwrap();
        let store = PagedFileStore::ensure(tmp.path(), 64).unwrap();
        assert_eq!(store.block_count().unwrap(), 1);
    }

    #[test]
    fn write_then_read_round_trips() {
        let tmp = NamedTempFile::new().unwrap();
        let mut store = PagedFileStore::ensure(tmp.path(), 16).unwrap();
        store.write_block(0, b"hello world12345").unwrap();
        let back = store.read_block(0).unwrap();
        assert_eq!(&back, b"hello world12345");
    }

    #[test]
    fn read_past_end_of_file_is_zeroed() {
        let tmp = NamedTempFile::new().unwrap();
        let mut store = PagedFileStore::ensure(tmp.path(), 16).unwrap();
        let back = store.read_block(5).unwrap();
        assert_eq!(back, vec![0u8; 16]);
    }

    #[test]
    fn append_grows_block_count() {
        let tmp = NamedTempFile::new().unwrap();
        let mut store = PagedFileStore::ensure(tmp.path(), 16).unwrap();
        let idx = store.append_block(&[1u8; 16]).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(store.block_count().unwrap(), 2);
    }
}
