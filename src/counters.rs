use serde::Serialize;

/// I/O event tally kept by a [`crate::session::Session`] and updated by the
/// heap manager and B-tree engine as they read and write through their
/// caches. Serializable so the CLI can emit it as JSON for `--json` runs.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Counters {
    pub nodes_saved_to_disk: u64,
    pub nodes_loaded_from_disk: u64,
    pub nodes_loaded_from_cache: u64,
    pub pages_saved_to_disk: u64,
    pub pages_loaded_from_disk: u64,
    pub pages_loaded_from_cache: u64,
    pub metadata_loaded: u64,
    pub metadata_saved: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }
}
