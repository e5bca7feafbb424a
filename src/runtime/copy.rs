//! Narrowing and widening copies between element widths.
use super::str_impl::OwnedBuf;
use super::view::StrView;
use super::width::{assign, is_big_endian, low_order_offsets, Width};
use crate::common::{OomPolicy, Result};

use std::cmp;
use std::ptr;

/// Copy `len` elements of width `size_i` from `i` into `o` as elements of width `size_o`, then
/// write a zero element after them.
///
/// Narrowing keeps the low-order bytes of each element; widening zero-extends. Nothing is written
/// when `len` is 0 or `i` is null.
///
/// # Safety
/// `i` must be readable for `len * size_i` bytes and `o` writable for `(len + 1) * size_o` bytes.
/// The regions must not overlap. The destination size is not checked.
pub unsafe fn strcp(o: *mut u8, size_o: Width, i: *const u8, size_i: Width, len: usize) {
    if len == 0 || i.is_null() {
        return;
    }
    let (wo, wi) = (size_o.size(), size_i.size());
    if wo == wi {
        ptr::copy_nonoverlapping(i, o, len * wo);
        ptr::write_bytes(o.add(len * wo), 0, wo);
        return;
    }
    let min = cmp::min(wo, wi);
    let (src_off, dst_off) = low_order_offsets(wi, wo, is_big_endian());
    let widen = wo > wi;
    let (mut o, mut i) = (o, i);
    for _ in 0..len {
        if widen {
            ptr::write_bytes(o, 0, wo);
        }
        assign(o.add(dst_off), i.add(src_off), min);
        o = o.add(wo);
        i = i.add(wi);
    }
    ptr::write_bytes(o, 0, wo);
}

/// Copy `src` into `dst` as `width`-byte elements, terminated. Returns the number of elements
/// copied.
///
/// Panics if `dst` cannot hold `src.len() + 1` elements.
pub fn copy_into(dst: &mut [u8], width: Width, src: &StrView) -> usize {
    let len = src.len();
    let needed = (len + 1) * width.size();
    assert!(
        dst.len() >= needed,
        "destination holds {} bytes, {} needed",
        dst.len(),
        needed
    );
    unsafe {
        strcp(dst.as_mut_ptr(), width, src.as_ptr(), src.width(), len);
    }
    if len == 0 {
        for b in &mut dst[..width.size()] {
            *b = 0;
        }
    }
    len
}

/// A copy of `src` re-encoded with `width`-byte elements.
pub fn convert(src: &StrView, width: Width) -> OwnedBuf {
    let mut res = OwnedBuf::with_capacity(src.len() + 1, width);
    fill(&mut res, src);
    res
}

pub fn try_convert(src: &StrView, width: Width, policy: OomPolicy) -> Result<OwnedBuf> {
    let mut res = match policy {
        OomPolicy::Abort => OwnedBuf::with_capacity(src.len() + 1, width),
        OomPolicy::Report => OwnedBuf::try_with_capacity(src.len() + 1, width)?,
    };
    fill(&mut res, src);
    Ok(res)
}

fn fill(dst: &mut OwnedBuf, src: &StrView) {
    let len = src.len();
    unsafe {
        strcp(dst.as_mut_ptr(), dst.width(), src.as_ptr(), src.width(), len);
        dst.set_len(len);
    }
}
