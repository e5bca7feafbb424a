//! This file contains common type definitions and utilities used in other parts of the project.
use std::fmt;

pub type Result<T> = std::result::Result<T, StrError>;

/// What to do when the scratch buffer cannot obtain memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OomPolicy {
    /// Treat exhaustion as unrecoverable: `std::alloc::handle_alloc_error`.
    Abort,
    /// Surface exhaustion as `StrError::Exhausted`.
    Report,
}

impl Default for OomPolicy {
    fn default() -> OomPolicy {
        OomPolicy::Abort
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StrError {
    /// An allocation of `bytes` bytes failed (or its size overflowed).
    Exhausted { bytes: usize },
    /// A search pattern of length zero was passed to replace.
    EmptyPattern,
    /// Two views that must share an element width did not.
    WidthMismatch { expected: usize, got: usize },
    /// A byte region was not a whole number of elements.
    Misaligned { len: usize, width: usize },
    /// A printf template or its arguments were malformed.
    Format(String),
}

impl fmt::Display for StrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StrError::Exhausted { bytes } => write!(f, "failed to allocate {} bytes", bytes),
            StrError::EmptyPattern => write!(f, "cannot replace an empty pattern"),
            StrError::WidthMismatch { expected, got } => write!(
                f,
                "element width mismatch: expected {} bytes, got {}",
                expected, got
            ),
            StrError::Misaligned { len, width } => write!(
                f,
                "{} bytes is not a whole number of {}-byte elements",
                len, width
            ),
            StrError::Format(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for StrError {}

macro_rules! err {
    ($head:expr) => {
        Err($crate::common::StrError::Format(
                format!(concat!("[", file!(), ":", line!(), ":", column!(), "] ", $head))
        ))
    };
    ($head:expr, $($t:expr),+) => {
        Err($crate::common::StrError::Format(
                format!(concat!("[", file!(), ":", line!(), ":", column!(), "] ", $head), $($t),*)
        ))
    };
}
