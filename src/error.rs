use thiserror::Error;

/// Unified error type for every fallible core operation.
///
/// `NotFound`, `AlreadyExists`, and `InvalidArgument` are routine outcomes a
/// caller is expected to handle. `StorageCorruption`, `Io`, and
/// `InvariantViolation` are fatal for the operation in progress and are
/// surfaced rather than repaired.
#[derive(Debug, Error)]
pub enum PbError {
    #[error("key {0} not found")]
    NotFound(i32),

    #[error("key {0} already exists")]
    AlreadyExists(i32),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage corruption: {0}")]
    StorageCorruption(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, PbError>;
