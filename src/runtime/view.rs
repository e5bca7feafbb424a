use super::string_search::strlen;
use super::width::{load, Element, Width};
use crate::common::{Result, StrError};

use std::fmt;
use std::slice;

/// A borrowed string of `width`-byte elements.
///
/// Views never own memory and carry no terminator; `len` counts elements, not bytes.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct StrView<'a> {
    bytes: &'a [u8],
    width: Width,
}

impl<'a> StrView<'a> {
    pub fn new(bytes: &'a [u8], width: Width) -> Result<StrView<'a>> {
        if bytes.len() % width.size() != 0 {
            return Err(StrError::Misaligned {
                len: bytes.len(),
                width: width.size(),
            });
        }
        Ok(StrView { bytes, width })
    }

    pub fn empty(width: Width) -> StrView<'a> {
        StrView { bytes: &[], width }
    }

    pub fn from_units<T: Element>(units: &'a [T]) -> StrView<'a> {
        StrView {
            bytes: bytemuck::cast_slice(units),
            width: T::WIDTH,
        }
    }

    pub fn from_str(s: &'a str) -> StrView<'a> {
        StrView {
            bytes: s.as_bytes(),
            width: Width::W1,
        }
    }

    /// # Safety
    /// Unless `len` is 0, `ptr` must be valid for reads of `len * width` bytes for `'a`. A null
    /// `ptr` is allowed when `len` is 0.
    pub unsafe fn from_raw_parts(ptr: *const u8, len: usize, width: Width) -> StrView<'a> {
        if len == 0 || ptr.is_null() {
            return StrView::empty(width);
        }
        StrView {
            bytes: slice::from_raw_parts(ptr, len * width.size()),
            width,
        }
    }

    /// # Safety
    /// `ptr` must be null or point to a sequence of `width`-byte elements ending in a zero
    /// element, valid for `'a`.
    pub unsafe fn from_nul_terminated(ptr: *const u8, width: Width) -> StrView<'a> {
        let len = strlen(ptr, width);
        StrView::from_raw_parts(ptr, len, width)
    }

    #[inline]
    pub fn width(&self) -> Width {
        self.width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / self.width.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// The element at `ix`, zero-extended.
    pub fn get(&self, ix: usize) -> Option<u64> {
        if ix >= self.len() {
            return None;
        }
        let w = self.width.size();
        Some(load(&self.bytes[ix * w..], self.width))
    }

    /// Elements `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> StrView<'a> {
        let w = self.width.size();
        StrView {
            bytes: &self.bytes[start * w..end * w],
            width: self.width,
        }
    }

    pub fn units(&self) -> impl DoubleEndedIterator<Item = u64> + ExactSizeIterator + 'a {
        let width = self.width;
        self.bytes
            .chunks_exact(width.size())
            .map(move |c| load(c, width))
    }

    pub(crate) fn check_width(&self, other: &StrView) -> Result<()> {
        if self.width != other.width {
            return Err(StrError::WidthMismatch {
                expected: self.width.size(),
                got: other.width.size(),
            });
        }
        Ok(())
    }
}

impl<'a> fmt::Debug for StrView<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "StrView({}, [", self.width)?;
        for (i, u) in self.units().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match std::char::from_u32(u as u32) {
                Some(c) if u <= 0x10FFFF && !c.is_control() => write!(f, "{:?}", c)?,
                _ => write!(f, "{:#x}", u)?,
            }
        }
        write!(f, "])")
    }
}
