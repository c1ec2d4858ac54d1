//! Session façade: bundles the four active file paths for one database,
//! dispatches the operation vocabulary, and owns the counters snapshot.

use std::path::{Path, PathBuf};

use rand::RngExt;

use crate::btree::BTreeEngine;
use crate::counters::Counters;
use crate::error::{PbError, Result};
use crate::heap::HeapManager;
use crate::storage::Record;

/// A found key's home: which node holds it and which heap page its record lives on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Found {
    pub node_id: i32,
    pub heap_page: i32,
}

pub struct Session {
    base: PathBuf,
    heap: HeapManager,
    tree: BTreeEngine,
    counters: Counters,
}

fn derived_paths(base: &Path) -> (PathBuf, PathBuf, PathBuf, PathBuf) {
    let stem = base.to_string_lossy().into_owned();
    (
        PathBuf::from(format!("{stem}_data.dat")),
        PathBuf::from(format!("{stem}_nodes.dat")),
        PathBuf::from(format!("{stem}_metadata.dat")),
        PathBuf::from(format!("{stem}_nodes_metadata.dat")),
    )
}

impl Session {
    /// `CREATE <base>`: overwrites the four files with an empty database.
    pub fn create<P: AsRef<Path>>(base: P, node_cache: usize, page_cache: usize, d: usize) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let (data, nodes, data_meta, nodes_meta) = derived_paths(&base);
        for path in [&data, &nodes, &data_meta, &nodes_meta] {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        let mut counters = Counters::new();
        let heap = HeapManager::open(&data, &data_meta, page_cache, &mut counters)?;
        let mut tree = BTreeEngine::open(&nodes, &nodes_meta, node_cache, d, &mut counters)?;
        tree.create_empty_root(&mut counters)?;
        Ok(Session { base, heap, tree, counters })
    }

    /// `LOAD <base>`: rebuilds caches and the free-node/underutilized lists
    /// by rescanning the heap and reinserting every record into a fresh tree.
    pub fn load<P: AsRef<Path>>(base: P, node_cache: usize, page_cache: usize, d: usize) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let (data, nodes, data_meta, nodes_meta) = derived_paths(&base);
        if !data.exists() || !nodes.exists() {
            return Err(PbError::InvalidArgument(format!(
                "no database named {:?} to load",
                base.file_name().unwrap_or_default()
            )));
        }
        let mut counters = Counters::new();
        let mut heap = HeapManager::open(&data, &data_meta, page_cache, &mut counters)?;
        let mut tree = BTreeEngine::open(&nodes, &nodes_meta, node_cache, d, &mut counters)?;
        tree.create_empty_root(&mut counters)?;

        let mut pairs = Vec::new();
        heap.for_each_page(&mut counters, |page_index, page| {
            for record in &page.records {
                pairs.push((*record, page_index));
            }
            Ok(())
        })?;
        for (record, page_index) in pairs {
            tree.insert_key(record.key, page_index, &mut counters)?;
        }
        heap.rebuild_underutilized(&mut counters)?;

        Ok(Session { base, heap, tree, counters })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// `INSERT key pA pB pAuB`
    pub fn insert(&mut self, record: Record) -> Result<()> {
        let outcome = self.tree.search(record.key, &mut self.counters)?;
        if outcome.found {
            return Err(PbError::AlreadyExists(record.key));
        }
        let page = self.heap.insert_record(record, &mut self.counters)?;
        if let Err(e) = self.tree.insert_key(record.key, page, &mut self.counters) {
            self.heap.remove_record(page, record.key, &mut self.counters)?;
            return Err(e);
        }
        Ok(())
    }

    /// `DELETE key`
    pub fn delete(&mut self, key: i32) -> Result<()> {
        let heap_page = self.tree.delete_key(key, &mut self.counters)?;
        self.heap.remove_record(heap_page, key, &mut self.counters)?;
        Ok(())
    }

    /// `UPDATE key new_pA new_pB new_pAuB`
    pub fn update(&mut self, key: i32, p_a: f64, p_b: f64, p_aub: f64) -> Result<()> {
        let outcome = self.tree.search(key, &mut self.counters)?;
        let heap_page = outcome.heap_page.ok_or(PbError::NotFound(key))?;
        self.heap.update_record(heap_page, key, p_a, p_b, p_aub, &mut self.counters)
    }

    /// `SEARCH key`
    pub fn search(&mut self, key: i32) -> Result<Option<Found>> {
        let outcome = self.tree.search(key, &mut self.counters)?;
        if outcome.found {
            Ok(Some(Found { node_id: outcome.node_id, heap_page: outcome.heap_page.unwrap() }))
        } else {
            Ok(None)
        }
    }

    /// `PRINT`: all records, page by page, in heap file order.
    pub fn print_all(&mut self) -> Result<Vec<(i32, Record)>> {
        let mut out = Vec::new();
        self.heap.for_each_page(&mut self.counters, |page_index, page| {
            for record in &page.records {
                out.push((page_index, *record));
            }
            Ok(())
        })?;
        Ok(out)
    }

    /// `ADDRANDOM n`: inserts up to `n` unique random keys, reporting progress via `on_progress`.
    pub fn add_random<F: FnMut(usize, usize)>(&mut self, n: usize, mut on_progress: F) -> Result<usize> {
        let mut rng = rand::rng();
        let mut inserted = 0;
        let mut attempts = 0;
        let max_attempts = n.saturating_mul(20).max(1000);
        while inserted < n && attempts < max_attempts {
            attempts += 1;
            let key: i32 = rng.random_range(0..i32::MAX);
            let record = Record::new(key, rng.random::<f64>(), rng.random::<f64>(), rng.random::<f64>());
            match self.insert(record) {
                Ok(()) => {
                    inserted += 1;
                    on_progress(inserted, n);
                }
                Err(PbError::AlreadyExists(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(inserted)
    }

    /// `FLUSH`: writes back all dirty cache entries and persists metadata.
    pub fn flush(&mut self) -> Result<()> {
        self.heap.flush(&mut self.counters)?;
        self.tree.flush(&mut self.counters)?;
        Ok(())
    }
}
