//! Length, comparison and substring searches over any element width.
//!
//! Searches run `memmem` from the `memchr` crate over the byte image of both strings. A hit that
//! does not start on an element boundary is skipped by searching again from the next boundary.
use super::view::StrView;
use super::width::{load, Element, Width};

use memchr::memmem;

use std::cmp::{self, Ordering};
use std::ffi::CStr;
use std::os::raw::c_char;

/// Number of elements before the first all-zero element. Returns 0 for a null pointer.
///
/// # Safety
/// `s` must be null or point to a readable sequence of `width`-byte elements terminated by a zero
/// element.
pub unsafe fn strlen(s: *const u8, width: Width) -> usize {
    if s.is_null() {
        return 0;
    }
    if let Width::W1 = width {
        return CStr::from_ptr(s as *const c_char).to_bytes().len();
    }
    let w = width.size();
    let mut rev = 0;
    let mut cur = s;
    loop {
        let elt = std::slice::from_raw_parts(cur, w);
        if load(elt, width) == 0 {
            return rev;
        }
        rev += 1;
        cur = cur.add(w);
    }
}

/// Like `strlen`, but stops at the end of `bs` if no zero element is found.
pub fn strlen_bytes(bs: &[u8], width: Width) -> usize {
    if let Width::W1 = width {
        return memchr::memchr(0, bs).unwrap_or(bs.len());
    }
    let w = width.size();
    bs.chunks_exact(w)
        .position(|c| load(c, width) == 0)
        .unwrap_or(bs.len() / w)
}

/// Byte-wise comparison of the first `len` elements of both strings.
///
/// This is a raw comparison in memory order; it makes no attempt at collation.
///
/// # Panics
/// If the widths differ or either string is shorter than `len` elements.
pub fn memcmp(s1: &StrView, s2: &StrView, len: usize) -> Ordering {
    assert_eq!(s1.width(), s2.width(), "memcmp across element widths");
    assert!(
        len <= s1.len() && len <= s2.len(),
        "memcmp of {} elements, strings hold {} and {}",
        len,
        s1.len(),
        s2.len()
    );
    let n = len * s1.width().size();
    s1.as_bytes()[..n].cmp(&s2.as_bytes()[..n])
}

// Both views must agree on width for byte offsets to mean anything.
fn elt_width(s1: &StrView, s2: &StrView) -> usize {
    assert_eq!(
        s1.width(),
        s2.width(),
        "substring search across element widths"
    );
    s1.width().size()
}

/// Index of the leftmost occurrence of `s2` in `s1` at or after `start`.
pub fn index_of(s1: &StrView, s2: &StrView, start: usize) -> Option<usize> {
    let w = elt_width(s1, s2);
    let (s1_len, s2_len) = (s1.len(), s2.len());
    if s1_len < s2_len {
        return None;
    }
    match start.checked_add(s2_len) {
        Some(end) if end <= s1_len => {}
        _ => return None,
    }
    let haystack = &s1.as_bytes()[start * w..];
    let finder = memmem::Finder::new(s2.as_bytes());
    // An unaligned hit can overlap an aligned one, so resume at the next element boundary rather
    // than after the hit.
    let mut pos = 0;
    while pos <= haystack.len() {
        let off = pos + finder.find(&haystack[pos..])?;
        if off % w == 0 {
            return Some(start + off / w);
        }
        pos = off - off % w + w;
    }
    None
}

/// Index of the rightmost occurrence of `s2` in `s1` starting at or before `bound`.
///
/// `bound` is clamped to `s1.len() - s2.len()`.
pub fn last_index_of(s1: &StrView, s2: &StrView, bound: usize) -> Option<usize> {
    let w = elt_width(s1, s2);
    let (s1_len, s2_len) = (s1.len(), s2.len());
    if s1_len < s2_len {
        return None;
    }
    let start = cmp::min(bound, s1_len - s2_len);
    let needle = s2.as_bytes();
    let haystack = &s1.as_bytes()[..(start + s2_len) * w];
    let finder = memmem::FinderRev::new(needle);
    let mut end = haystack.len();
    loop {
        let off = finder.rfind(&haystack[..end])?;
        if off % w == 0 {
            return Some(off / w);
        }
        // Only matches starting at or before the previous element boundary remain.
        end = off - off % w + needle.len();
    }
}

pub fn index_of_units<T: Element>(s1: &[T], s2: &[T], start: usize) -> Option<usize> {
    index_of(&StrView::from_units(s1), &StrView::from_units(s2), start)
}

pub fn last_index_of_units<T: Element>(s1: &[T], s2: &[T], bound: usize) -> Option<usize> {
    last_index_of(&StrView::from_units(s1), &StrView::from_units(s2), bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn widen<T: Element>(s: &str) -> Vec<T> {
        s.bytes().map(|b| T::from_u64(b as u64)).collect()
    }

    fn check_examples<T: Element>() {
        let h = widen::<T>("abcabc");
        let n = widen::<T>("bc");
        assert_eq!(index_of_units(&h, &n, 0), Some(1));
        assert_eq!(index_of_units(&h, &n, 2), Some(4));
        assert_eq!(index_of_units(&h, &n, 5), None);
        assert_eq!(last_index_of_units(&h, &n, 5), Some(4));
        assert_eq!(last_index_of_units(&h, &n, 3), Some(1));
        assert_eq!(last_index_of_units(&h, &n, 0), None);
        assert_eq!(last_index_of_units(&h, &n, usize::MAX), Some(4));
        let long = widen::<T>("abcabcabc");
        assert_eq!(index_of_units(&h, &long, 0), None);
        assert_eq!(last_index_of_units(&h, &long, 10), None);
        assert_eq!(index_of_units(&h, &n, usize::MAX), None);
    }

    #[test]
    fn examples_all_widths() {
        check_examples::<u8>();
        check_examples::<u16>();
        check_examples::<u32>();
        check_examples::<u64>();
    }

    #[test]
    fn unaligned_hits_are_ignored() {
        // 0x0100 0x0002 in little endian is [00 01 02 00]; the needle 0x0201 sits at byte 1.
        let h: Vec<u16> = vec![u16::from_ne_bytes([0, 1]), u16::from_ne_bytes([2, 0]), 7];
        let n: Vec<u16> = vec![u16::from_ne_bytes([1, 2])];
        assert_eq!(index_of_units(&h, &n, 0), None);
        assert_eq!(last_index_of_units(&h, &n, 3), None);
        let h2: Vec<u16> = vec![u16::from_ne_bytes([0, 1]), u16::from_ne_bytes([2, 0]), n[0]];
        assert_eq!(index_of_units(&h2, &n, 0), Some(2));
        assert_eq!(last_index_of_units(&h2, &n, 2), Some(2));
    }

    #[test]
    fn lengths() {
        for &w in Width::ALL.iter() {
            let mut bs = vec![0u8; 4 * w.size()];
            for i in 0..3 {
                bs[i * w.size()] = b'x';
            }
            assert_eq!(unsafe { strlen(bs.as_ptr(), w) }, 3);
            assert_eq!(strlen_bytes(&bs, w), 3);
            assert_eq!(strlen_bytes(&bs[..2 * w.size()], w), 2);
        }
        assert_eq!(unsafe { strlen(std::ptr::null(), Width::W2) }, 0);
    }

    #[test]
    fn compare() {
        let a: Vec<u32> = vec![1, 2, 3];
        let b: Vec<u32> = vec![1, 2, 4];
        let (va, vb) = (StrView::from_units(&a), StrView::from_units(&b));
        assert_eq!(memcmp(&va, &vb, 2), Ordering::Equal);
        assert_eq!(memcmp(&va, &vb, 3), Ordering::Less);
        assert_eq!(memcmp(&vb, &va, 3), Ordering::Greater);
    }

    #[test]
    #[should_panic(expected = "memcmp of 4 elements")]
    fn compare_past_end() {
        let a: Vec<u32> = vec![1, 2, 3];
        memcmp(&StrView::from_units(&a), &StrView::from_units(&a), 4);
    }

    fn naive_index(h: &[u16], n: &[u16], start: usize) -> Option<usize> {
        if start + n.len() > h.len() {
            return None;
        }
        (start..=h.len() - n.len()).find(|&i| &h[i..i + n.len()] == n)
    }

    fn naive_last(h: &[u16], n: &[u16], bound: usize) -> Option<usize> {
        if n.len() > h.len() {
            return None;
        }
        let start = cmp::min(bound, h.len() - n.len());
        (0..=start).rev().find(|&i| &h[i..i + n.len()] == n)
    }

    #[test]
    fn overlapping_unaligned_hits() {
        // Little endian [00 01 01 01]: the needle's bytes also occur at byte 1.
        let h: Vec<u16> = vec![0x0100, 0x0101];
        assert_eq!(index_of_units(&h, &[0x0101], 0), Some(1));
        assert_eq!(last_index_of_units(&h, &[0x0101], 1), Some(1));
        let h: Vec<u16> = vec![0x0101, 0x0001];
        assert_eq!(last_index_of_units(&h, &[0x0101], 1), Some(0));
        assert_eq!(index_of_units(&h, &[0x0101], 0), Some(0));
        let h: Vec<u32> = vec![0x0101_0100, 0x0101_0101, 0x0101_0101];
        assert_eq!(index_of_units(&h, &[0x0101_0101, 0x0101_0101], 0), Some(1));
        assert_eq!(last_index_of_units(&h, &[0x0101_0101], 2), Some(2));
    }

    // Units whose bytes differ, so byte-level hits land off element boundaries.
    const MIXED: [u16; 5] = [0x0001, 0x0100, 0x0101, 0x0102, 0x0201];

    #[test]
    fn random_against_naive() {
        let mut rng = rand::thread_rng();
        for i in 0..1000 {
            let unit = |rng: &mut rand::rngs::ThreadRng| {
                if i % 2 == 0 {
                    MIXED[rng.gen_range(0..MIXED.len())]
                } else {
                    rng.gen_range(0..3u16) * 0x0101
                }
            };
            let h: Vec<u16> = (0..rng.gen_range(0..40)).map(|_| unit(&mut rng)).collect();
            let n: Vec<u16> = (0..rng.gen_range(1..4)).map(|_| unit(&mut rng)).collect();
            let start = rng.gen_range(0..45);
            assert_eq!(
                index_of_units(&h, &n, start),
                naive_index(&h, &n, start),
                "h={:?} n={:?} start={}",
                h,
                n,
                start
            );
            assert_eq!(
                last_index_of_units(&h, &n, start),
                naive_last(&h, &n, start),
                "h={:?} n={:?} bound={}",
                h,
                n,
                start
            );
        }
    }
}
