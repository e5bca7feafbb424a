//! String algorithms over 1, 2, 4 and 8 byte elements.
//!
//! Strings are either borrowed (`StrView`) or owned and zero-terminated (`OwnedBuf`). Both carry
//! their element width, and every operation taking more than one string requires the widths to
//! agree, except for the copy routines whose job is to change it.
pub mod copy;
pub mod number;
pub mod printf;
pub mod replace;
pub mod str_impl;
pub mod string_search;
pub mod trim;
pub mod view;
pub mod width;

pub use copy::{convert, copy_into, strcp, try_convert};
pub use number::{from_number, to_number, Number, STAGING_LIMIT};
pub use printf::{format_buf, printf, sprintf, FormatArg};
pub use replace::{replace, replace_with, try_replace, ReplaceMode};
pub use str_impl::{DynamicBuf, OwnedBuf, ScratchBuf, MIN_CAPACITY};
pub use string_search::{
    index_of, index_of_units, last_index_of, last_index_of_units, memcmp, strlen, strlen_bytes,
};
pub use trim::{is_space, trim, trim_end, trim_start, WHITESPACE};
pub use view::StrView;
pub use width::{is_big_endian, Element, Width};
