//! Heap manager: places and removes records on fixed-width heap pages,
//! choosing a target page from the underutilized-page list before ever
//! allocating a fresh one.

use std::path::{Path, PathBuf};

use crate::counters::Counters;
use crate::error::Result;
use crate::storage::{metadata, HeapPage, LruCache, PagedFileStore, Record, PAGE_WIDTH};

pub struct HeapManager {
    store: PagedFileStore,
    cache: LruCache<HeapPage>,
    underutilized: Vec<i32>,
    metadata_path: PathBuf,
}

impl HeapManager {
    pub fn open<P: AsRef<Path>>(
        data_path: P,
        metadata_path: P,
        cache_capacity: usize,
        counters: &mut Counters,
    ) -> Result<Self> {
        let store = PagedFileStore::ensure(&data_path, PAGE_WIDTH)?;
        let metadata_path = metadata_path.as_ref().to_path_buf();
        let underutilized = metadata::load_list(&metadata_path)?;
        counters.metadata_loaded += 1;
        Ok(HeapManager { store, cache: LruCache::new(cache_capacity), underutilized, metadata_path })
    }

    pub fn underutilized(&self) -> &[i32] {
        &self.underutilized
    }

    pub fn block_count(&self) -> Result<u64> {
        self.store.block_count()
    }

    pub fn read_page(&mut self, index: i32, counters: &mut Counters) -> Result<HeapPage> {
        if let Some(page) = self.cache.lookup(index) {
            counters.pages_loaded_from_cache += 1;
            return Ok(page);
        }
        let bytes = self.store.read_block(index as u64)?;
        let page = HeapPage::decode(&bytes)?;
        counters.pages_loaded_from_disk += 1;
        let store = &mut self.store;
        self.cache.insert_after_miss(index, page.clone(), |id, p| {
            store.write_block(id as u64, &p.encode())
        })?;
        Ok(page)
    }

    fn write_page(&mut self, index: i32, page: HeapPage, counters: &mut Counters) -> Result<()> {
        counters.pages_saved_to_disk += 1;
        let store = &mut self.store;
        self.cache.store(index, page, |id, p| store.write_block(id as u64, &p.encode()))
    }

    /// Inserts `record`, choosing the page via the underutilized list, and
    /// returns the heap page it landed on.
    pub fn insert_record(&mut self, record: Record, counters: &mut Counters) -> Result<i32> {
        let page_index = match metadata::pop_smallest(&mut self.underutilized) {
            Some(idx) => idx,
            None => self.store.append_block(&HeapPage::empty().encode())? as i32,
        };
        let mut page = self.read_page(page_index, counters)?;
        page.insert(record)?;
        let became_full = page.is_full();
        self.write_page(page_index, page, counters)?;
        if !became_full {
            metadata::insert_sorted_unique(&mut self.underutilized, page_index);
        }
        Ok(page_index)
    }

    pub fn remove_record(&mut self, page_index: i32, key: i32, counters: &mut Counters) -> Result<Record> {
        let mut page = self.read_page(page_index, counters)?;
        let was_full = page.is_full();
        let removed = page.remove(key)?;
        self.write_page(page_index, page, counters)?;
        if was_full {
            metadata::insert_sorted_unique(&mut self.underutilized, page_index);
        }
        Ok(removed)
    }

    pub fn update_record(
        &mut self,
        page_index: i32,
        key: i32,
        p_a: f64,
        p_b: f64,
        p_aub: f64,
        counters: &mut Counters,
    ) -> Result<()> {
        let mut page = self.read_page(page_index, counters)?;
        page.update(key, p_a, p_b, p_aub)?;
        self.write_page(page_index, page, counters)
    }

    /// Iterates every heap page in file order, yielding `(page_index, HeapPage)`.
    pub fn for_each_page<F>(&mut self, counters: &mut Counters, mut f: F) -> Result<()>
    where
        F: FnMut(i32, &HeapPage) -> Result<()>,
    {
        let count = self.block_count()?;
        for idx in 0..count {
            let page = self.read_page(idx as i32, counters)?;
            f(idx as i32, &page)?;
        }
        Ok(())
    }

    /// Rebuilds the underutilized-page list by scanning every page.
    pub fn rebuild_underutilized(&mut self, counters: &mut Counters) -> Result<()> {
        let mut fresh = Vec::new();
        let count = self.block_count()?;
        for idx in 0..count {
            let page = self.read_page(idx as i32, counters)?;
            if page.is_underutilized() {
                fresh.push(idx as i32);
            }
        }
        self.underutilized = fresh;
        Ok(())
    }

    pub fn flush(&mut self, counters: &mut Counters) -> Result<()> {
        let store = &mut self.store;
        self.cache.flush(|id, p| {
            counters.pages_saved_to_disk += 1;
            store.write_block(id as u64, &p.encode())
        })?;
        self.store.flush()?;
        metadata::save_list(&self.metadata_path, &self.underutilized)?;
        counters.metadata_saved += 1;
        Ok(())
    }
}
