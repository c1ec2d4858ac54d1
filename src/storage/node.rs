use byteorder::{ByteOrder, LittleEndian};

use crate::error::{PbError, Result};

/// Width in bytes of a B-tree node slot on disk.
pub const NODE_WIDTH: usize = 555;

/// Sentinel written in place of an absent child slot or root `parent_id`.
pub const NONE_ID: i32 = -1;

/// A key entry inside a node: a key paired with the heap page holding its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEntry {
    pub key: i32,
    pub heap_page: i32,
}

/// An in-memory B-tree node. `children` only ever holds live child ids
/// (`children.len() == keys.len() + 1` for an internal node, `0` for a leaf).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub node_id: i32,
    pub is_leaf: bool,
    pub parent_id: i32,
    pub keys: Vec<KeyEntry>,
    pub children: Vec<i32>,
}

impl Node {
    pub fn new_leaf(node_id: i32, parent_id: i32) -> Self {
        Node { node_id, is_leaf: true, parent_id, keys: Vec::new(), children: Vec::new() }
    }

    pub fn new_internal(node_id: i32, parent_id: i32, keys: Vec<KeyEntry>, children: Vec<i32>) -> Self {
        Node { node_id, is_leaf: false, parent_id, keys, children }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id == NONE_ID
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Required on-disk footprint for a node with up to `k_max` keys. The
    /// node slot is always [`NODE_WIDTH`] bytes; this is only used to assert
    /// `k_max` was configured sanely for the fixed slot width.
    pub fn required_width(k_max: usize) -> usize {
        // node_id + leaf_flag + n + parent_id
        4 + 1 + 4 + 4
            // keys: (key, heap_page) as two i32 each, slots up to k_max
            + k_max * 8
            // children: up to k_max + 1 slots
            + (k_max + 1) * 4
    }

    pub fn binary_search(&self, key: i32) -> std::result::Result<usize, usize> {
        self.keys.binary_search_by_key(&key, |e| e.key)
    }

    pub fn encode(&self, k_max: usize) -> Result<Vec<u8>> {
        let needed = Self::required_width(k_max);
        if needed > NODE_WIDTH {
            return Err(PbError::InvariantViolation(format!(
                "k_max={k_max} requires {needed} bytes, exceeds NODE_WIDTH={NODE_WIDTH}"
            )));
        }
        if self.keys.len() > k_max {
            return Err(PbError::InvariantViolation(format!(
                "node {} has {} keys, exceeds k_max={k_max}",
                self.node_id,
                self.keys.len()
            )));
        }
        let mut buf = vec![0u8; NODE_WIDTH];
        LittleEndian::write_i32(&mut buf[0..4], self.node_id);
        buf[4] = if self.is_leaf { 1 } else { 0 };
        LittleEndian::write_i32(&mut buf[5..9], self.keys.len() as i32);
        LittleEndian::write_i32(&mut buf[9..13], self.parent_id);

        let mut offset = 13;
        for i in 0..k_max {
            if let Some(entry) = self.keys.get(i) {
                LittleEndian::write_i32(&mut buf[offset..offset + 4], entry.key);
                LittleEndian::write_i32(&mut buf[offset + 4..offset + 8], entry.heap_page);
            }
            offset += 8;
        }
        for i in 0..k_max + 1 {
            let child = self.children.get(i).copied().unwrap_or(NONE_ID);
            LittleEndian::write_i32(&mut buf[offset..offset + 4], child);
            offset += 4;
        }
        Ok(buf)
    }

    pub fn decode(buf: &[u8], k_max: usize) -> Result<Self> {
        let needed = Self::required_width(k_max);
        if buf.len() < needed {
            return Err(PbError::StorageCorruption(format!(
                "node slot shorter than required {needed} bytes"
            )));
        }
        let node_id = LittleEndian::read_i32(&buf[0..4]);
        let is_leaf = buf[4] != 0;
        let n = LittleEndian::read_i32(&buf[5..9]);
        let parent_id = LittleEndian::read_i32(&buf[9..13]);
        if n < 0 || n as usize > k_max {
            return Err(PbError::StorageCorruption(format!(
                "node {node_id} key count {n} out of range"
            )));
        }
        let n = n as usize;

        let mut offset = 13;
        let mut keys = Vec::with_capacity(n);
        for i in 0..k_max {
            if i < n {
                let key = LittleEndian::read_i32(&buf[offset..offset + 4]);
                let heap_page = LittleEndian::read_i32(&buf[offset + 4..offset + 8]);
                keys.push(KeyEntry { key, heap_page });
            }
            offset += 8;
        }

        let mut children_raw = Vec::with_capacity(k_max + 1);
        for _ in 0..k_max + 1 {
            children_raw.push(LittleEndian::read_i32(&buf[offset..offset + 4]));
            offset += 4;
        }

        // A slot value of -1 denotes absent; the live children are the
        // prefix of non-(-1) slots. Anything other than -1 past that prefix
        // is a corrupt child reference into a slot that should be empty.
        let live_count = children_raw.iter().take_while(|&&c| c != NONE_ID).count();
        if children_raw[live_count..].iter().any(|&c| c != NONE_ID) {
            return Err(PbError::StorageCorruption(format!(
                "node {node_id} has a live child reference past a -1 sentinel slot"
            )));
        }
        let children = children_raw[..live_count].to_vec();

        if is_leaf {
            if live_count != 0 {
                return Err(PbError::StorageCorruption(format!(
                    "leaf node {node_id} has {live_count} child reference(s), expected none"
                )));
            }
        } else if children.len() != n + 1 {
            return Err(PbError::StorageCorruption(format!(
                "node {node_id} expected {} live children, found {}",
                n + 1,
                children.len()
            )));
        }

        Ok(Node { node_id, is_leaf, parent_id, keys, children })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const K_MAX: usize = 4;

    #[test]
    fn leaf_round_trips() {
        let mut node = Node::new_leaf(3, 0);
        node.keys.push(KeyEntry { key: 10, heap_page: 1 });
        node.keys.push(KeyEntry { key: 20, heap_page: 2 });
        let buf = node.encode(K_MAX).unwrap();
        assert_eq!(buf.len(), NODE_WIDTH);
        let back = Node::decode(&buf, K_MAX).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn internal_round_trips() {
        let node = Node::new_internal(
            0,
            NONE_ID,
            vec![KeyEntry { key: 30, heap_page: 5 }],
            vec![1, 2],
        );
        let buf = node.encode(K_MAX).unwrap();
        let back = Node::decode(&buf, K_MAX).unwrap();
        assert_eq!(back, node);
        assert!(back.is_root());
    }

    #[test]
    fn encode_rejects_overflowing_keys() {
        let mut node = Node::new_leaf(0, NONE_ID);
        for k in 0..(K_MAX as i32 + 1) {
            node.keys.push(KeyEntry { key: k, heap_page: 0 });
        }
        assert!(node.encode(K_MAX).is_err());
    }

    #[test]
    fn required_width_fits_node_width_for_default_d() {
        assert!(Node::required_width(K_MAX) <= NODE_WIDTH);
    }

    #[test]
    fn decode_rejects_live_child_past_sentinel_gap() {
        let node = Node::new_internal(
            0,
            NONE_ID,
            vec![KeyEntry { key: 30, heap_page: 5 }],
            vec![1, 2],
        );
        let mut buf = node.encode(K_MAX).unwrap();
        // Corrupt a slot beyond the declared live-child prefix (index n+1,
        // which should hold -1) with a bogus live-looking child id.
        let children_offset = 13 + K_MAX * 8;
        let corrupt_slot = children_offset + (node.keys.len() + 1) * 4;
        LittleEndian::write_i32(&mut buf[corrupt_slot..corrupt_slot + 4], 7);
        assert!(matches!(Node::decode(&buf, K_MAX), Err(PbError::StorageCorruption(_))));
    }

    #[test]
    fn decode_rejects_leaf_with_live_child_slot() {
        let node = Node::new_leaf(1, NONE_ID);
        let mut buf = node.encode(K_MAX).unwrap();
        let children_offset = 13 + K_MAX * 8;
        LittleEndian::write_i32(&mut buf[children_offset..children_offset + 4], 9);
        assert!(matches!(Node::decode(&buf, K_MAX), Err(PbError::StorageCorruption(_))));
    }
}
