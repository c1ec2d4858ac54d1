//! B-tree engine: search, insert with sibling compensation before split,
//! and delete with compensation (rotation) before merge. Node ids are
//! allocated from the free-node list; the root is recovered on open by
//! scanning for the unique node with `parent_id == NONE_ID`.

use std::path::{Path, PathBuf};

use crate::counters::Counters;
use crate::error::{PbError, Result};
use crate::storage::node::{KeyEntry, Node, NONE_ID};
use crate::storage::{metadata, LruCache, PagedFileStore, NODE_WIDTH};

/// Outcome of a [`BTreeEngine::search`].
pub struct SearchOutcome {
    pub node_id: i32,
    pub found: bool,
    pub heap_page: Option<i32>,
}

pub struct BTreeEngine {
    store: PagedFileStore,
    cache: LruCache<Node>,
    free_nodes: Vec<i32>,
    metadata_path: PathBuf,
    k_max: usize,
    k_min: usize,
    root_id: Option<i32>,
}

impl BTreeEngine {
    /// `d` is the branching factor: `k_max = 2d`, `k_min = d`.
    pub fn open<P: AsRef<Path>>(
        nodes_path: P,
        nodes_metadata_path: P,
        cache_capacity: usize,
        d: usize,
        counters: &mut Counters,
    ) -> Result<Self> {
        let k_max = 2 * d;
        if Node::required_width(k_max) > NODE_WIDTH {
            return Err(PbError::InvalidArgument(format!(
                "branching factor d={d} does not fit in a {NODE_WIDTH}-byte node slot"
            )));
        }
        let store = PagedFileStore::ensure(&nodes_path, NODE_WIDTH)?;
        let metadata_path = nodes_metadata_path.as_ref().to_path_buf();
        let free_nodes = metadata::load_list(&metadata_path)?;
        counters.metadata_loaded += 1;
        let mut engine = BTreeEngine {
            store,
            cache: LruCache::new(cache_capacity),
            free_nodes,
            metadata_path,
            k_max,
            k_min: d,
            root_id: None,
        };
        engine.recover_root(counters)?;
        Ok(engine)
    }

    fn recover_root(&mut self, counters: &mut Counters) -> Result<()> {
        let count = self.store.block_count()?;
        for idx in 0..count {
            if self.free_nodes.binary_search(&(idx as i32)).is_ok() {
                continue;
            }
            let node = self.read_node(idx as i32, counters)?;
            if node.parent_id == NONE_ID {
                self.root_id = Some(node.node_id);
                return Ok(());
            }
        }
        Ok(())
    }

    pub fn root_id(&self) -> Option<i32> {
        self.root_id
    }

    pub fn k_max(&self) -> usize {
        self.k_max
    }

    pub fn k_min(&self) -> usize {
        self.k_min
    }

    /// Discards any existing tree and writes a single empty leaf root at id 0.
    pub fn create_empty_root(&mut self, counters: &mut Counters) -> Result<()> {
        self.cache.invalidate();
        self.free_nodes.clear();
        let root = Node::new_leaf(0, NONE_ID);
        self.store.write_block(0, &root.encode(self.k_max)?)?;
        counters.nodes_saved_to_disk += 1;
        self.root_id = Some(0);
        self.save_metadata(counters)?;
        Ok(())
    }

    fn save_metadata(&mut self, counters: &mut Counters) -> Result<()> {
        metadata::save_list(&self.metadata_path, &self.free_nodes)?;
        counters.metadata_saved += 1;
        Ok(())
    }

    fn alloc_node_id(&mut self) -> Result<i32> {
        match metadata::pop_smallest(&mut self.free_nodes) {
            Some(id) => Ok(id),
            None => Ok(self.store.block_count()? as i32),
        }
    }

    fn free_node(&mut self, id: i32) {
        metadata::insert_sorted_unique(&mut self.free_nodes, id);
    }

    pub fn read_node(&mut self, id: i32, counters: &mut Counters) -> Result<Node> {
        if let Some(node) = self.cache.lookup(id) {
            counters.nodes_loaded_from_cache += 1;
            return Ok(node);
        }
        let bytes = self.store.read_block(id as u64)?;
        let node = Node::decode(&bytes, self.k_max)?;
        counters.nodes_loaded_from_disk += 1;
        let k_max = self.k_max;
        let store = &mut self.store;
        self.cache.insert_after_miss(id, node.clone(), |nid, n| {
            store.write_block(nid as u64, &n.encode(k_max)?)
        })?;
        Ok(node)
    }

    pub fn write_node(&mut self, node: Node, counters: &mut Counters) -> Result<()> {
        counters.nodes_saved_to_disk += 1;
        let id = node.node_id;
        let k_max = self.k_max;
        let store = &mut self.store;
        self.cache.store(id, node, |nid, n| store.write_block(nid as u64, &n.encode(k_max)?))
    }

    pub fn flush(&mut self, counters: &mut Counters) -> Result<()> {
        let k_max = self.k_max;
        let store = &mut self.store;
        self.cache.flush(|id, n| store.write_block(id as u64, &n.encode(k_max)?))?;
        self.store.flush()?;
        self.save_metadata(counters)
    }

    /// Descends from the root looking for `key`. On a miss the returned node
    /// is the leaf `key` would belong to.
    pub fn search(&mut self, key: i32, counters: &mut Counters) -> Result<SearchOutcome> {
        let mut current = match self.root_id {
            Some(id) => id,
            None => return Ok(SearchOutcome { node_id: -1, found: false, heap_page: None }),
        };
        loop {
            let node = self.read_node(current, counters)?;
            match node.binary_search(key) {
                Ok(idx) => {
                    return Ok(SearchOutcome {
                        node_id: current,
                        found: true,
                        heap_page: Some(node.keys[idx].heap_page),
                    });
                }
                Err(idx) => {
                    if node.is_leaf {
                        return Ok(SearchOutcome { node_id: current, found: false, heap_page: None });
                    }
                    current = node.children[idx];
                }
            }
        }
    }

    /// Inserts `(key, heap_page)` into the tree. Fails with [`PbError::AlreadyExists`]
    /// if `key` is already present.
    pub fn insert_key(&mut self, key: i32, heap_page: i32, counters: &mut Counters) -> Result<()> {
        if self.root_id.is_none() {
            let id = self.alloc_node_id()?;
            self.write_node(Node::new_leaf(id, NONE_ID), counters)?;
            self.root_id = Some(id);
        }
        let outcome = self.search(key, counters)?;
        if outcome.found {
            return Err(PbError::AlreadyExists(key));
        }
        let leaf_id = outcome.node_id;
        let mut leaf = self.read_node(leaf_id, counters)?;
        let pos = leaf.binary_search(key).unwrap_err();
        leaf.keys.insert(pos, KeyEntry { key, heap_page });
        let overflowed = leaf.keys.len() > self.k_max;
        self.write_node(leaf, counters)?;
        if overflowed {
            self.fix_overflow(leaf_id, counters)?;
        }
        Ok(())
    }

    fn fix_overflow(&mut self, node_id: i32, counters: &mut Counters) -> Result<()> {
        let node = self.read_node(node_id, counters)?;
        if node.keys.len() <= self.k_max {
            return Ok(());
        }
        if node.is_root() {
            self.split_root(node, counters)?;
            return Ok(());
        }
        let parent_id = node.parent_id;
        let parent = self.read_node(parent_id, counters)?;
        let idx = parent
            .children
            .iter()
            .position(|&c| c == node_id)
            .ok_or_else(|| PbError::InvariantViolation(format!("node {node_id} not found in parent {parent_id}")))?;

        if idx > 0 {
            let left = self.read_node(parent.children[idx - 1], counters)?;
            if left.keys.len() < self.k_max {
                self.compensate_left(node, parent, left, idx, counters)?;
                return Ok(());
            }
        }
        if idx + 1 < parent.children.len() {
            let right = self.read_node(parent.children[idx + 1], counters)?;
            if right.keys.len() < self.k_max {
                self.compensate_right(node, parent, right, idx, counters)?;
                return Ok(());
            }
        }
        self.split_nonroot(node, parent, idx, counters)
    }

    fn reparent_children(&mut self, node_id: i32, child_ids: &[i32], counters: &mut Counters) -> Result<()> {
        for &cid in child_ids {
            let mut child = self.read_node(cid, counters)?;
            child.parent_id = node_id;
            self.write_node(child, counters)?;
        }
        Ok(())
    }

    fn compensate_left(
        &mut self,
        mut node: Node,
        mut parent: Node,
        mut left: Node,
        idx: usize,
        counters: &mut Counters,
    ) -> Result<()> {
        let divider = parent.keys[idx - 1];
        let mut combined_keys: Vec<KeyEntry> = left.keys.clone();
        combined_keys.push(divider);
        combined_keys.extend(node.keys.clone());
        let combined_children: Vec<i32> = if !node.is_leaf {
            let mut c = left.children.clone();
            c.extend(node.children.clone());
            c
        } else {
            Vec::new()
        };

        let m = combined_keys.len() / 2;
        left.keys = combined_keys[..m].to_vec();
        parent.keys[idx - 1] = combined_keys[m];
        node.keys = combined_keys[m + 1..].to_vec();

        if !node.is_leaf {
            left.children = combined_children[..m + 1].to_vec();
            node.children = combined_children[m + 1..].to_vec();
        }

        let left_id = left.node_id;
        let node_id = node.node_id;
        let left_children = left.children.clone();
        let node_children = node.children.clone();
        self.write_node(left, counters)?;
        self.write_node(node, counters)?;
        self.write_node(parent, counters)?;
        self.reparent_children(left_id, &left_children, counters)?;
        self.reparent_children(node_id, &node_children, counters)
    }

    fn compensate_right(
        &mut self,
        mut node: Node,
        mut parent: Node,
        mut right: Node,
        idx: usize,
        counters: &mut Counters,
    ) -> Result<()> {
        let divider = parent.keys[idx];
        let mut combined_keys: Vec<KeyEntry> = node.keys.clone();
        combined_keys.push(divider);
        combined_keys.extend(right.keys.clone());
        let combined_children: Vec<i32> = if !node.is_leaf {
            let mut c = node.children.clone();
            c.extend(right.children.clone());
            c
        } else {
            Vec::new()
        };

        let m = combined_keys.len() / 2;
        node.keys = combined_keys[..m].to_vec();
        parent.keys[idx] = combined_keys[m];
        right.keys = combined_keys[m + 1..].to_vec();

        if !node.is_leaf {
            node.children = combined_children[..m + 1].to_vec();
            right.children = combined_children[m + 1..].to_vec();
        }

        let node_id = node.node_id;
        let right_id = right.node_id;
        let node_children = node.children.clone();
        let right_children = right.children.clone();
        self.write_node(node, counters)?;
        self.write_node(right, counters)?;
        self.write_node(parent, counters)?;
        self.reparent_children(node_id, &node_children, counters)?;
        self.reparent_children(right_id, &right_children, counters)
    }

    fn split_root(&mut self, mut node: Node, counters: &mut Counters) -> Result<()> {
        let mid = node.keys.len() / 2;
        let divider = node.keys[mid];
        let right_keys = node.keys[mid + 1..].to_vec();
        node.keys.truncate(mid);

        let right_id = self.alloc_node_id()?;
        let new_root_id = self.alloc_node_id()?;

        let mut right = Node { node_id: right_id, is_leaf: node.is_leaf, parent_id: new_root_id, keys: right_keys, children: Vec::new() };
        if !node.is_leaf {
            let right_children = node.children[mid + 1..].to_vec();
            node.children.truncate(mid + 1);
            right.children = right_children;
        }

        let left_id = node.node_id;
        node.parent_id = new_root_id;
        let new_root = Node::new_internal(new_root_id, NONE_ID, vec![divider], vec![left_id, right_id]);

        self.write_node(node, counters)?;
        let right_children_to_reparent = right.children.clone();
        self.write_node(right, counters)?;
        self.write_node(new_root, counters)?;
        self.reparent_children(right_id, &right_children_to_reparent, counters)?;
        self.root_id = Some(new_root_id);
        Ok(())
    }

    fn split_nonroot(&mut self, mut node: Node, mut parent: Node, idx: usize, counters: &mut Counters) -> Result<()> {
        let mid = node.keys.len() / 2;
        let divider = node.keys[mid];
        let right_keys = node.keys[mid + 1..].to_vec();
        node.keys.truncate(mid);

        let right_id = self.alloc_node_id()?;
        let mut right = Node { node_id: right_id, is_leaf: node.is_leaf, parent_id: parent.node_id, keys: right_keys, children: Vec::new() };
        if !node.is_leaf {
            let right_children = node.children[mid + 1..].to_vec();
            node.children.truncate(mid + 1);
            right.children = right_children;
        }

        parent.keys.insert(idx, divider);
        parent.children.insert(idx + 1, right_id);
        let parent_overflowed = parent.keys.len() > self.k_max;
        let parent_id = parent.node_id;

        self.write_node(node, counters)?;
        let right_children_to_reparent = right.children.clone();
        self.write_node(right, counters)?;
        self.write_node(parent, counters)?;
        self.reparent_children(right_id, &right_children_to_reparent, counters)?;

        if parent_overflowed {
            self.fix_overflow(parent_id, counters)?;
        }
        Ok(())
    }

    /// Deletes `key` from the tree structure, returning the heap page the
    /// physical record for `key` lives on (for the caller to remove from the heap).
    pub fn delete_key(&mut self, key: i32, counters: &mut Counters) -> Result<i32> {
        let outcome = self.search(key, counters)?;
        if !outcome.found {
            return Err(PbError::NotFound(key));
        }
        let mut node = self.read_node(outcome.node_id, counters)?;
        let idx = node.binary_search(key).map_err(|_| {
            PbError::InvariantViolation(format!("key {key} vanished between search and delete"))
        })?;

        if node.is_leaf {
            let heap_page = node.keys[idx].heap_page;
            node.keys.remove(idx);
            let node_id = node.node_id;
            self.write_node(node, counters)?;
            self.handle_underflow(node_id, counters)?;
            Ok(heap_page)
        } else {
            let original_heap_page = node.keys[idx].heap_page;
            let left_child = node.children[idx];
            let pred_leaf_id = self.descend_rightmost(left_child, counters)?;
            let mut pred_leaf = self.read_node(pred_leaf_id, counters)?;
            let pred_entry = *pred_leaf.keys.last().ok_or_else(|| {
                PbError::InvariantViolation(format!("predecessor leaf {pred_leaf_id} is empty"))
            })?;

            node.keys[idx] = pred_entry;
            let node_id = node.node_id;
            self.write_node(node, counters)?;

            pred_leaf.keys.pop();
            self.write_node(pred_leaf, counters)?;
            self.handle_underflow(pred_leaf_id, counters)?;
            let _ = node_id;
            Ok(original_heap_page)
        }
    }

    fn descend_rightmost(&mut self, start: i32, counters: &mut Counters) -> Result<i32> {
        let mut current = start;
        loop {
            let node = self.read_node(current, counters)?;
            if node.is_leaf {
                return Ok(current);
            }
            current = *node.children.last().ok_or_else(|| {
                PbError::InvariantViolation(format!("internal node {current} has no children"))
            })?;
        }
    }

    fn handle_underflow(&mut self, node_id: i32, counters: &mut Counters) -> Result<()> {
        let node = self.read_node(node_id, counters)?;
        if node.is_root() {
            if node.keys.is_empty() {
                if node.is_leaf {
                    self.root_id = None;
                    self.free_node(node_id);
                    self.save_metadata(counters)?;
                } else {
                    let child_id = *node.children.first().ok_or_else(|| {
                        PbError::InvariantViolation("empty root has no child to collapse into".into())
                    })?;
                    let mut child = self.read_node(child_id, counters)?;
                    child.parent_id = NONE_ID;
                    self.write_node(child, counters)?;
                    self.root_id = Some(child_id);
                    self.free_node(node_id);
                    self.save_metadata(counters)?;
                }
            }
            return Ok(());
        }

        if node.keys.len() >= self.k_min {
            return Ok(());
        }

        let parent_id = node.parent_id;
        let parent = self.read_node(parent_id, counters)?;
        let idx = parent
            .children
            .iter()
            .position(|&c| c == node_id)
            .ok_or_else(|| PbError::InvariantViolation(format!("node {node_id} not found in parent {parent_id}")))?;

        if idx > 0 {
            let left = self.read_node(parent.children[idx - 1], counters)?;
            if left.keys.len() > self.k_min {
                self.rotate_from_left(node, parent, left, idx, counters)?;
                return Ok(());
            }
        }
        if idx + 1 < parent.children.len() {
            let right = self.read_node(parent.children[idx + 1], counters)?;
            if right.keys.len() > self.k_min {
                self.rotate_from_right(node, parent, right, idx, counters)?;
                return Ok(());
            }
        }

        if idx > 0 {
            let left_id = parent.children[idx - 1];
            let left = self.read_node(left_id, counters)?;
            self.merge(left, node, parent, idx - 1, counters)?;
        } else {
            let right_id = parent.children[idx + 1];
            let right = self.read_node(right_id, counters)?;
            self.merge(node, right, parent, idx, counters)?;
        }
        self.handle_underflow(parent_id, counters)
    }

    fn rotate_from_left(
        &mut self,
        mut node: Node,
        mut parent: Node,
        mut left: Node,
        idx: usize,
        counters: &mut Counters,
    ) -> Result<()> {
        node.keys.insert(0, parent.keys[idx - 1]);
        parent.keys[idx - 1] = left.keys.pop().ok_or_else(|| {
            PbError::InvariantViolation("rotate_from_left: left sibling has no keys".into())
        })?;
        let mut moved_child = None;
        if !node.is_leaf {
            let child = left.children.pop().ok_or_else(|| {
                PbError::InvariantViolation("rotate_from_left: left sibling has no children".into())
            })?;
            node.children.insert(0, child);
            moved_child = Some(child);
        }
        let node_id = node.node_id;
        self.write_node(node, counters)?;
        self.write_node(left, counters)?;
        self.write_node(parent, counters)?;
        if let Some(child) = moved_child {
            let mut c = self.read_node(child, counters)?;
            c.parent_id = node_id;
            self.write_node(c, counters)?;
        }
        Ok(())
    }

    fn rotate_from_right(
        &mut self,
        mut node: Node,
        mut parent: Node,
        mut right: Node,
        idx: usize,
        counters: &mut Counters,
    ) -> Result<()> {
        node.keys.push(parent.keys[idx]);
        parent.keys[idx] = right.keys.remove(0);
        let mut moved_child = None;
        if !node.is_leaf {
            let child = right.children.remove(0);
            node.children.push(child);
            moved_child = Some(child);
        }
        let node_id = node.node_id;
        self.write_node(node, counters)?;
        self.write_node(right, counters)?;
        self.write_node(parent, counters)?;
        if let Some(child) = moved_child {
            let mut c = self.read_node(child, counters)?;
            c.parent_id = node_id;
            self.write_node(c, counters)?;
        }
        Ok(())
    }

    fn merge(&mut self, mut left: Node, right: Node, mut parent: Node, divider_idx: usize, counters: &mut Counters) -> Result<()> {
        left.keys.push(parent.keys[divider_idx]);
        left.keys.extend(right.keys.clone());
        let moved_children = right.children.clone();
        if !left.is_leaf {
            left.children.extend(right.children.clone());
        }
        let left_id = left.node_id;
        let right_id = right.node_id;

        parent.keys.remove(divider_idx);
        parent.children.remove(divider_idx + 1);

        self.write_node(left, counters)?;
        self.write_node(parent, counters)?;
        self.free_node(right_id);
        self.save_metadata(counters)?;

        for child in moved_children {
            let mut c = self.read_node(child, counters)?;
            c.parent_id = left_id;
            self.write_node(c, counters)?;
        }
        Ok(())
    }
}
