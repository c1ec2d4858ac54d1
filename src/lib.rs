//! Paged B-tree index over a paged heap file.
//!
//! `probtree` persists fixed-size probability records (`key: i32`, three
//! `f64` fields) on a paged heap file and indexes them by key in a paged
//! B-tree. Both files grow by appending fixed-width blocks and shrink only
//! by marking slots reusable in two small side-files — there is no
//! compaction.
//!
//! ## Quick example
//!
//! ```no_run
//! use probtree::session::Session;
//! use probtree::storage::Record;
//!
//! let mut session = Session::create("demo", 16, 16, 2).unwrap();
//! session.insert(Record::new(1, 0.2, 0.3, 0.4)).unwrap();
//! let found = session.search(1).unwrap();
//! println!("{found:?}");
//! session.flush().unwrap();
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`storage`] | Binary codecs, paged file I/O, metadata side-files, LRU caches |
//! | [`heap`] | Heap page placement and record lifecycle |
//! | [`btree`] | Search/insert/delete with compensation-before-split/merge |
//! | [`session`] | The façade every driver (CLI, tests) talks to |
//! | [`counters`] | I/O event tally, serializable for `--json` output |
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | Enables the `probtree` binary: clap-driven REPL/batch runner. |

pub mod btree;
#[cfg(feature = "cli")]
pub mod cli;
pub mod counters;
pub mod error;
pub mod heap;
pub mod session;
pub mod storage;

pub use counters::Counters;
pub use error::{PbError, Result};
pub use session::Session;
