/// Buffers produced by the string algorithms.
///
/// There are two types here. `ScratchBuf` is the growable allocation that algorithms write their
/// output into when they cannot know its size in advance. `OwnedBuf` is what callers get back:
/// an exclusively owned allocation with a capacity, a logical length and a zero terminator, which
/// a caller either reads directly or takes apart with `into_raw_parts` to wrap in its own
/// container type.
///
/// Both are thin wrappers around `std::alloc` so that growth can `realloc` in place, and so that
/// the raw parts handed to callers describe exactly one allocation.
use super::view::StrView;
use super::width::{Element, Width};
use crate::common::{OomPolicy, Result, StrError};

use log::trace;

use std::alloc::{alloc, dealloc, handle_alloc_error, realloc, Layout};
use std::cmp;
use std::fmt;
use std::io;
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;

/// The smallest capacity, in elements, a scratch buffer will allocate.
pub const MIN_CAPACITY: usize = 8;

fn layout(capacity: usize, width: Width) -> Option<Layout> {
    let bytes = capacity.checked_mul(width.size())?;
    Layout::from_size_align(bytes, width.size()).ok()
}

fn exhausted(capacity: usize, width: Width) -> StrError {
    StrError::Exhausted {
        bytes: capacity.saturating_mul(width.size()),
    }
}

// Turn a reported exhaustion into the process-level failure `OomPolicy::Abort` asks for.
fn abort_on_exhaustion<T>(res: Result<T>, width: Width) -> T {
    match res {
        Ok(t) => t,
        Err(StrError::Exhausted { bytes }) => match Layout::from_size_align(bytes, width.size()) {
            Ok(l) => handle_alloc_error(l),
            Err(_) => panic!("capacity overflow"),
        },
        Err(e) => panic!("allocation failed: {}", e),
    }
}

fn enforce<T>(res: Result<T>, policy: OomPolicy, width: Width) -> Result<T> {
    match policy {
        OomPolicy::Abort => Ok(abort_on_exhaustion(res, width)),
        OomPolicy::Report => res,
    }
}

/// A growable, uninitialized allocation of `width`-byte elements.
///
/// Capacity is zero before the first allocation; afterwards it is always a power of two and at
/// least `MIN_CAPACITY`.
pub struct ScratchBuf {
    ptr: *mut u8,
    capacity: usize,
    width: Width,
}

unsafe impl Send for ScratchBuf {}
unsafe impl Sync for ScratchBuf {}

impl ScratchBuf {
    pub fn new(width: Width) -> ScratchBuf {
        ScratchBuf {
            ptr: ptr::null_mut(),
            capacity: 0,
            width,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn width(&self) -> Width {
        self.width
    }

    /// Ensure room for `requested` elements, aborting the process if memory runs out.
    pub fn reallocate(&mut self, requested: usize) {
        abort_on_exhaustion(self.try_reallocate(requested), self.width)
    }

    pub fn reallocate_with(&mut self, requested: usize, policy: OomPolicy) -> Result<()> {
        enforce(self.try_reallocate(requested), policy, self.width)
    }

    /// Ensure room for `requested` elements.
    ///
    /// The buffer only moves if the request exceeds the current capacity or drops below a quarter
    /// of it; the new capacity is the next power of two. Existing contents are preserved up to the
    /// smaller of the two capacities. On failure the buffer is left unchanged.
    pub fn try_reallocate(&mut self, requested: usize) -> Result<()> {
        let target = cmp::max(requested, MIN_CAPACITY);
        let shrink = target.saturating_mul(4) < self.capacity;
        if target <= self.capacity && !shrink {
            return Ok(());
        }
        let new_cap = target
            .checked_next_power_of_two()
            .ok_or_else(|| exhausted(target, self.width))?;
        let new_layout = layout(new_cap, self.width).ok_or_else(|| exhausted(new_cap, self.width))?;
        let new_ptr = unsafe {
            if self.ptr.is_null() {
                alloc(new_layout)
            } else {
                // The current layout was valid when it was allocated.
                let old = Layout::from_size_align_unchecked(
                    self.capacity * self.width.size(),
                    self.width.size(),
                );
                realloc(self.ptr, old, new_layout.size())
            }
        };
        if new_ptr.is_null() {
            return Err(exhausted(new_cap, self.width));
        }
        trace!(
            "scratch buffer ({}) resized {} -> {} elements",
            self.width,
            self.capacity,
            new_cap
        );
        self.ptr = new_ptr;
        self.capacity = new_cap;
        Ok(())
    }

    /// Copy `src` to element offset `at`.
    pub fn write_at(&mut self, at: usize, src: &[u8]) {
        if src.is_empty() {
            return;
        }
        let w = self.width.size();
        assert!(
            at * w + src.len() <= self.capacity * w,
            "write past scratch buffer capacity"
        );
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.add(at * w), src.len()) }
    }

    /// Write a zero element at element offset `at`.
    pub fn terminate_at(&mut self, at: usize) {
        let w = self.width.size();
        assert!(at < self.capacity, "terminator past scratch buffer capacity");
        unsafe { ptr::write_bytes(self.ptr.add(at * w), 0, w) }
    }

    /// Hand the allocation to the caller.
    ///
    /// # Safety
    /// Elements `[0, len)` must have been written and element `len` must be zero.
    pub unsafe fn into_owned(mut self, len: usize) -> OwnedBuf {
        debug_assert!(len < self.capacity);
        let res = OwnedBuf {
            ptr: NonNull::new_unchecked(self.ptr),
            capacity: self.capacity,
            len,
            width: self.width,
        };
        self.ptr = ptr::null_mut();
        res
    }
}

impl Drop for ScratchBuf {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                dealloc(
                    self.ptr,
                    Layout::from_size_align_unchecked(
                        self.capacity * self.width.size(),
                        self.width.size(),
                    ),
                )
            }
        }
    }
}

/// A `Write` sink for narrow text that grows a `ScratchBuf`.
pub struct DynamicBuf {
    data: ScratchBuf,
    write_head: usize,
    policy: OomPolicy,
}

impl DynamicBuf {
    pub fn new(size: usize, policy: OomPolicy) -> Result<DynamicBuf> {
        let mut data = ScratchBuf::new(Width::W1);
        data.reallocate_with(size + 1, policy)?;
        Ok(DynamicBuf {
            data,
            write_head: 0,
            policy,
        })
    }

    pub fn len(&self) -> usize {
        self.write_head
    }

    /// Terminate the contents and shrink the allocation to fit them.
    pub fn into_buf(mut self) -> Result<OwnedBuf> {
        self.data.terminate_at(self.write_head);
        let mut res = unsafe { self.data.into_owned(self.write_head) };
        enforce(res.shrink_to_fit(), self.policy, Width::W1)?;
        Ok(res)
    }
}

impl io::Write for DynamicBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Leave room for the terminator.
        let needed = self.write_head + buf.len() + 1;
        if needed > self.data.capacity() {
            self.data
                .reallocate_with(needed, self.policy)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        }
        self.data.write_at(self.write_head, buf);
        self.write_head += buf.len();
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An owned, zero-terminated string of `width`-byte elements.
///
/// `capacity` counts elements and is always greater than `len`; element `len` is zero.
pub struct OwnedBuf {
    ptr: NonNull<u8>,
    capacity: usize,
    len: usize,
    width: Width,
}

// OwnedBuf is the sole owner of its allocation.
unsafe impl Send for OwnedBuf {}
unsafe impl Sync for OwnedBuf {}

impl OwnedBuf {
    /// An empty, terminated buffer with room for `capacity` elements (at least 1).
    pub fn with_capacity(capacity: usize, width: Width) -> OwnedBuf {
        abort_on_exhaustion(OwnedBuf::try_with_capacity(capacity, width), width)
    }

    pub fn try_with_capacity(capacity: usize, width: Width) -> Result<OwnedBuf> {
        let capacity = cmp::max(capacity, 1);
        let l = layout(capacity, width).ok_or_else(|| exhausted(capacity, width))?;
        let ptr = NonNull::new(unsafe { alloc(l) }).ok_or_else(|| exhausted(capacity, width))?;
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, width.size()) };
        Ok(OwnedBuf {
            ptr,
            capacity,
            len: 0,
            width,
        })
    }

    pub fn from_view(s: &StrView) -> OwnedBuf {
        let mut res = OwnedBuf::with_capacity(s.len() + 1, s.width());
        unsafe {
            ptr::copy_nonoverlapping(s.as_ptr(), res.as_mut_ptr(), s.as_bytes().len());
            res.set_len(s.len());
        }
        res
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn width(&self) -> Width {
        self.width
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len * self.width.size()) }
    }

    pub fn as_bytes_with_nul(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.as_ptr(), (self.len + 1) * self.width.size()) }
    }

    pub fn view(&self) -> StrView<'_> {
        unsafe { StrView::from_raw_parts(self.as_ptr(), self.len, self.width) }
    }

    /// The contents as typed code units, if `T` has this buffer's width.
    pub fn as_units<T: Element>(&self) -> Option<&[T]> {
        if T::WIDTH != self.width {
            return None;
        }
        // Allocations are aligned to the element width.
        Some(bytemuck::cast_slice(self.as_bytes()))
    }

    /// Set the logical length and write the terminator after it.
    ///
    /// # Safety
    /// `len < capacity`, and elements `[0, len)` must be initialized.
    pub unsafe fn set_len(&mut self, len: usize) {
        debug_assert!(len < self.capacity);
        let w = self.width.size();
        ptr::write_bytes(self.as_mut_ptr().add(len * w), 0, w);
        self.len = len;
    }

    /// Reallocate so that `capacity == len + 1`.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        let target = self.len + 1;
        if target == self.capacity {
            return Ok(());
        }
        let w = self.width.size();
        let new_ptr = unsafe {
            realloc(
                self.as_mut_ptr(),
                Layout::from_size_align_unchecked(self.capacity * w, w),
                target * w,
            )
        };
        self.ptr = NonNull::new(new_ptr).ok_or_else(|| exhausted(target, self.width))?;
        self.capacity = target;
        Ok(())
    }

    /// Release the allocation as `(pointer, capacity, len)`.
    ///
    /// The pointer must eventually come back through `from_raw_parts` with the same width.
    pub fn into_raw_parts(self) -> (*mut u8, usize, usize) {
        let res = (self.ptr.as_ptr(), self.capacity, self.len);
        mem::forget(self);
        res
    }

    /// # Safety
    /// The arguments must come from `into_raw_parts` on a buffer of the same `width`.
    pub unsafe fn from_raw_parts(ptr: *mut u8, capacity: usize, len: usize, width: Width) -> OwnedBuf {
        OwnedBuf {
            ptr: NonNull::new_unchecked(ptr),
            capacity,
            len,
            width,
        }
    }
}

impl Drop for OwnedBuf {
    fn drop(&mut self) {
        let w = self.width.size();
        unsafe {
            dealloc(
                self.ptr.as_ptr(),
                Layout::from_size_align_unchecked(self.capacity * w, w),
            )
        }
    }
}

impl Clone for OwnedBuf {
    fn clone(&self) -> OwnedBuf {
        OwnedBuf::from_view(&self.view())
    }
}

impl PartialEq for OwnedBuf {
    fn eq(&self, other: &OwnedBuf) -> bool {
        self.view() == other.view()
    }
}

impl Eq for OwnedBuf {}

impl fmt::Debug for OwnedBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "OwnedBuf {{ capacity: {}, len: {}, contents: {:?} }}",
            self.capacity,
            self.len,
            self.view()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn exhaustion_policies() {
        let exhausted = || -> Result<usize> { Err(StrError::Exhausted { bytes: 64 }) };
        assert_eq!(abort_on_exhaustion(Ok(3usize), Width::W1), 3);
        assert_eq!(enforce(Ok(5usize), OomPolicy::Abort, Width::W4), Ok(5));
        assert_eq!(
            enforce(exhausted(), OomPolicy::Report, Width::W2),
            Err(StrError::Exhausted { bytes: 64 })
        );
    }

    #[test]
    #[should_panic(expected = "allocation failed")]
    fn abort_rejects_other_errors() {
        abort_on_exhaustion::<()>(Err(StrError::EmptyPattern), Width::W1);
    }

    #[test]
    fn scratch_growth() {
        let mut s = ScratchBuf::new(Width::W2);
        assert_eq!(s.capacity(), 0);
        s.reallocate(1);
        assert_eq!(s.capacity(), MIN_CAPACITY);
        s.reallocate(9);
        assert_eq!(s.capacity(), 16);
        s.reallocate(16);
        assert_eq!(s.capacity(), 16);
        s.reallocate(1000);
        assert_eq!(s.capacity(), 1024);
    }

    #[test]
    fn scratch_hysteresis() {
        let mut s = ScratchBuf::new(Width::W1);
        s.reallocate(1024);
        // Anything at or above a quarter keeps the allocation.
        s.reallocate(256);
        assert_eq!(s.capacity(), 1024);
        s.reallocate(300);
        assert_eq!(s.capacity(), 1024);
        s.reallocate(255);
        assert_eq!(s.capacity(), 256);
        s.reallocate(2);
        assert_eq!(s.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn scratch_preserves_contents() {
        let mut s = ScratchBuf::new(Width::W4);
        s.reallocate(8);
        let data: Vec<u32> = (1..=8).collect();
        s.write_at(0, bytemuck::cast_slice(&data[..]));
        s.reallocate(100);
        s.terminate_at(8);
        let owned = unsafe { s.into_owned(8) };
        assert_eq!(owned.as_units::<u32>().unwrap(), &data[..]);
        assert_eq!(owned.capacity(), 128);
    }

    #[test]
    fn scratch_reports_exhaustion() {
        let mut s = ScratchBuf::new(Width::W8);
        match s.try_reallocate(usize::MAX / 2) {
            Err(StrError::Exhausted { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(s.capacity(), 0);
        assert!(s.reallocate_with(usize::MAX / 4, OomPolicy::Report).is_err());
    }

    #[test]
    #[should_panic(expected = "write past scratch buffer capacity")]
    fn scratch_bounds() {
        let mut s = ScratchBuf::new(Width::W1);
        s.reallocate(8);
        s.write_at(4, &[0u8; 5]);
    }

    #[test]
    fn dynamic_string() {
        let mut d = DynamicBuf::new(0, OomPolicy::Abort).unwrap();
        write!(
            &mut d,
            "This is the first part of the string {}\n",
            "with formatting and everything!"
        )
        .unwrap();
        write!(&mut d, "And this is the second part").unwrap();
        let s = d.into_buf().unwrap();
        assert_eq!(
            s.as_bytes(),
            &b"This is the first part of the string with formatting and everything!
And this is the second part"[..]
        );
        assert_eq!(s.capacity(), s.len() + 1);
        assert_eq!(*s.as_bytes_with_nul().last().unwrap(), 0);
    }

    #[test]
    fn owned_basics() {
        let units: Vec<u16> = "wide".encode_utf16().collect();
        let b = OwnedBuf::from_view(&StrView::from_units(&units));
        assert_eq!(b.len(), 4);
        assert_eq!(b.capacity(), 5);
        assert_eq!(b.as_units::<u16>().unwrap(), &units[..]);
        assert!(b.as_units::<u8>().is_none());
        assert_eq!(&b.as_bytes_with_nul()[8..], &[0, 0]);
        assert_eq!(b.clone(), b);

        let (ptr, cap, len) = b.into_raw_parts();
        let b = unsafe { OwnedBuf::from_raw_parts(ptr, cap, len, Width::W2) };
        assert_eq!(b.as_units::<u16>().unwrap(), &units[..]);

        let e = OwnedBuf::with_capacity(0, Width::W8);
        assert!(e.is_empty());
        assert_eq!(e.as_bytes_with_nul(), &[0u8; 8]);
    }
}
