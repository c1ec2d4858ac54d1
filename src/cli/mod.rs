//! Ambient CLI layer: argument parsing, the REPL/batch dispatcher, and
//! signal-triggered flush-then-exit. Every command here does nothing but
//! call into [`crate::session::Session`].

pub mod app;
pub mod dispatch;

pub use app::{Cli, ColorMode};
pub use dispatch::{dispatch_line, DispatchOptions, Outcome};
