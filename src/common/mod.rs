pub mod constants;

use std::fmt;
use std::sync::PoisonError;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes surfaced by the storage layer. Programmer errors (index out
/// of range, wrong page kind) abort instead; see the message constants in
/// [`constants`].
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Bytes could not be decoded into the expected shape.
    InvalidData(String),
    /// A caller-supplied argument refers to something that does not exist.
    InvalidInput(String),
    OutOfBounds,
    /// A resource (page, table) could not be created.
    CreationError,
    /// Every frame in the buffer pool is pinned.
    PoolExhausted,
    /// A lock guarding shared storage state was poisoned by a panic.
    LockPoisoned,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidData(detail) => write!(f, "invalid data: {}", detail),
            Error::InvalidInput(detail) => write!(f, "invalid input: {}", detail),
            Error::OutOfBounds => write!(f, "index out of bounds"),
            Error::CreationError => write!(f, "resource could not be created"),
            Error::PoolExhausted => write!(f, "all buffer pool frames are pinned"),
            Error::LockPoisoned => write!(f, "storage lock poisoned"),
        }
    }
}

impl std::error::Error for Error {}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::LockPoisoned
    }
}

/// Asserts that evaluating the expression panics.
#[macro_export]
macro_rules! assert_errors {
    ($expr:expr) => {
        assert!(
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let _ = $expr;
            }))
            .is_err(),
            "expected expression to panic: {}",
            stringify!($expr)
        )
    };
}
