//! Whitespace trimming for any element width.
use super::view::StrView;

/// Elements treated as whitespace: TAB, LF, VT, FF, CR and SPACE.
pub const WHITESPACE: [u8; 6] = [0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x20];

#[inline]
pub fn is_space(u: u64) -> bool {
    u == 0x20 || (0x09..=0x0D).contains(&u)
}

pub fn trim_start<'a>(s: &StrView<'a>) -> StrView<'a> {
    let skip = s.units().take_while(|u| is_space(*u)).count();
    s.slice(skip, s.len())
}

pub fn trim_end<'a>(s: &StrView<'a>) -> StrView<'a> {
    let skip = s.units().rev().take_while(|u| is_space(*u)).count();
    s.slice(0, s.len() - skip)
}

pub fn trim<'a>(s: &StrView<'a>) -> StrView<'a> {
    trim_end(&trim_start(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table() {
        for u in 0..=0x100u64 {
            assert_eq!(is_space(u), u < 0x100 && WHITESPACE.contains(&(u as u8)), "{:#x}", u);
        }
        // NBSP is not in the table.
        assert!(!is_space(0xA0));
    }

    #[test]
    fn trims_wide() {
        let units: Vec<u32> = " \t wide\u{3000} \r\n".chars().map(|c| c as u32).collect();
        let v = StrView::from_units(&units);
        let want: Vec<u32> = "wide\u{3000}".chars().map(|c| c as u32).collect();
        assert_eq!(trim(&v), StrView::from_units(&want));
        assert_eq!(trim_start(&v).len(), units.len() - 3);
        assert_eq!(trim_end(&v).len(), units.len() - 3);
    }

    #[test]
    fn all_space_and_empty() {
        let v = StrView::from_str(" \x0b\x0c ");
        assert!(trim(&v).is_empty());
        assert!(trim_start(&v).is_empty());
        assert!(trim(&StrView::from_str("")).is_empty());
        assert_eq!(trim(&StrView::from_str("a b")), StrView::from_str("a b"));
    }
}
