//! Width-agnostic string algorithms.
//!
//! Every string is a sequence of elements of one of four widths (see `Width`). The routines here
//! copy between widths, search, compare, replace, trim, parse and format without caring which
//! width they were handed, so the same code serves byte strings, UTF-16 and UTF-32 code units and
//! 64-bit element strings.
#[macro_use]
pub mod common;
pub mod runtime;

pub use common::{OomPolicy, Result, StrError};
pub use runtime::*;

/// Format Rust-style arguments into an exactly sized, zero-terminated narrow `OwnedBuf`.
/// Evaluates to `None` if allocation fails.
#[macro_export]
macro_rules! format_buf {
    ($($t:tt)*) => {
        $crate::runtime::printf::format_buf(format_args!($($t)*))
    };
}

/// printf into an exactly sized, zero-terminated narrow `OwnedBuf`. Each argument is converted
/// with `FormatArg::from`.
#[macro_export]
macro_rules! sprintf {
    ($spec:expr) => {
        $crate::runtime::printf::sprintf($spec, &[])
    };
    ($spec:expr, $($arg:expr),+ $(,)?) => {
        $crate::runtime::printf::sprintf(
            $spec,
            &[$($crate::runtime::printf::FormatArg::from($arg)),+],
        )
    };
}
