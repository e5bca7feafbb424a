//! Element widths and the fixed-size load/store helpers used wherever an algorithm has to touch
//! memory at a size only known at run time.
use lazy_static::lazy_static;

use std::fmt;
use std::ptr;

/// The byte size of one code unit.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(usize)]
pub enum Width {
    W1 = 1,
    W2 = 2,
    W4 = 4,
    W8 = 8,
}

impl Width {
    pub const ALL: [Width; 4] = [Width::W1, Width::W2, Width::W4, Width::W8];

    pub fn from_size(size: usize) -> Option<Width> {
        match size {
            1 => Some(Width::W1),
            2 => Some(Width::W2),
            4 => Some(Width::W4),
            8 => Some(Width::W8),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn size(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-byte", self.size())
    }
}

/// Fixed-width unsigned code units.
pub trait Element: bytemuck::Pod + Eq + Default + fmt::Debug {
    const WIDTH: Width;
    fn from_u64(v: u64) -> Self;
    fn to_u64(self) -> u64;
}

macro_rules! impl_element {
    ($ty:ty, $w:expr) => {
        impl Element for $ty {
            const WIDTH: Width = $w;
            #[inline(always)]
            fn from_u64(v: u64) -> $ty {
                v as $ty
            }
            #[inline(always)]
            fn to_u64(self) -> u64 {
                self as u64
            }
        }
    };
}

impl_element!(u8, Width::W1);
impl_element!(u16, Width::W2);
impl_element!(u32, Width::W4);
impl_element!(u64, Width::W8);

lazy_static! {
    /// Whether the host stores the most significant byte first.
    pub static ref IS_BIG_ENDIAN: bool = {
        let probe: [u8; 4] = [1, 0, 0, 0];
        u32::from_ne_bytes(probe) != 1
    };
}

#[inline]
pub fn is_big_endian() -> bool {
    *IS_BIG_ENDIAN
}

/// Byte offsets into a source element of `size_i` bytes and a destination element of `size_o`
/// bytes at which the `min(size_i, size_o)` low-order bytes live.
pub fn low_order_offsets(size_i: usize, size_o: usize, big_endian: bool) -> (usize, usize) {
    let min = std::cmp::min(size_i, size_o);
    if big_endian {
        (size_i - min, size_o - min)
    } else {
        (0, 0)
    }
}

/// Copy `len` bytes from `r` to `l`, using a single load and store for the common widths.
///
/// # Safety
/// `r` must be valid for reads and `l` for writes of `len` bytes. Neither needs to be aligned.
#[inline(always)]
pub unsafe fn assign(l: *mut u8, r: *const u8, len: usize) {
    match len {
        1 => *l = *r,
        2 => ptr::write_unaligned(l as *mut u16, ptr::read_unaligned(r as *const u16)),
        4 => ptr::write_unaligned(l as *mut u32, ptr::read_unaligned(r as *const u32)),
        8 => ptr::write_unaligned(l as *mut u64, ptr::read_unaligned(r as *const u64)),
        _ => ptr::copy_nonoverlapping(r, l, len),
    }
}

/// Read the element at `bs[..width]` as an integer.
#[inline(always)]
pub fn load(bs: &[u8], width: Width) -> u64 {
    assert!(bs.len() >= width.size());
    unsafe {
        let p = bs.as_ptr();
        match width {
            Width::W1 => *p as u64,
            Width::W2 => ptr::read_unaligned(p as *const u16) as u64,
            Width::W4 => ptr::read_unaligned(p as *const u32) as u64,
            Width::W8 => ptr::read_unaligned(p as *const u64),
        }
    }
}

/// Write `v` truncated to `width` into `bs[..width]`.
#[inline(always)]
pub fn store(bs: &mut [u8], width: Width, v: u64) {
    assert!(bs.len() >= width.size());
    unsafe {
        let p = bs.as_mut_ptr();
        match width {
            Width::W1 => *p = v as u8,
            Width::W2 => ptr::write_unaligned(p as *mut u16, v as u16),
            Width::W4 => ptr::write_unaligned(p as *mut u32, v as u32),
            Width::W8 => ptr::write_unaligned(p as *mut u64, v),
        }
    }
}
