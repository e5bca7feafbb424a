//! Conversions between strings of any element width and numbers.
//!
//! Parsing follows scanf: leading whitespace is skipped, then the longest numeral prefix is read
//! and anything after it is ignored. Wide input is first narrowed into a small stack buffer, so
//! only the first `STAGING_LIMIT` elements are ever considered.
use super::copy::{convert, copy_into};
use super::printf::{format_buf, sprintf, FormatArg};
use super::str_impl::OwnedBuf;
use super::trim::is_space;
use super::view::StrView;
use super::width::Width;

pub const STAGING_LIMIT: usize = 64;

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        const I64_FORMAT: &str = "%ld";
        const U64_FORMAT: &str = "%lu";
    } else {
        const I64_FORMAT: &str = "%lld";
        const U64_FORMAT: &str = "%llu";
    }
}

fn skip_space(bs: &[u8]) -> &[u8] {
    let n = bs.iter().take_while(|b| is_space(**b as u64)).count();
    &bs[n..]
}

/// A decimal integer prefix of `bs` as (negative, magnitude). Fails if there are no digits or the
/// magnitude does not fit in 64 bits.
pub(crate) fn parse_int(bs: &[u8]) -> Option<(bool, u64)> {
    let bs = skip_space(bs);
    let (neg, digits) = split_sign(bs);
    let mut mag = 0u64;
    let mut any = false;
    for b in digits.iter().cloned().take_while(u8::is_ascii_digit) {
        mag = mag.checked_mul(10)?.checked_add((b - b'0') as u64)?;
        any = true;
    }
    if any {
        Some((neg, mag))
    } else {
        None
    }
}

fn split_sign(bs: &[u8]) -> (bool, &[u8]) {
    match bs.first() {
        Some(b'-') => (true, &bs[1..]),
        Some(b'+') => (false, &bs[1..]),
        _ => (false, bs),
    }
}

// `v * 2^exp`, stepping so that no intermediate power of two overflows.
fn scale(mut v: f64, mut exp: i64) -> f64 {
    while exp > 1000 {
        v *= 2f64.powi(1000);
        exp -= 1000;
    }
    while exp < -1000 {
        v *= 2f64.powi(-1000);
        exp += 1000;
    }
    v * 2f64.powi(exp as i32)
}

/// A C99 hexadecimal float (`0x1.8p3`) at the start of `bs`. Returns `None` unless `bs` starts
/// with an optional sign, `0x` and at least one hex digit.
fn parse_hex_float(bs: &[u8]) -> Option<f64> {
    let (neg, rest) = split_sign(bs);
    if rest.len() < 2 || rest[0] != b'0' || (rest[1] | 0x20) != b'x' {
        return None;
    }
    let rest = &rest[2..];
    let mut mant = 0u64;
    let mut exp = 0i64;
    let mut any = false;
    let mut seen_dot = false;
    let mut ix = 0;
    while ix < rest.len() {
        let b = rest[ix];
        ix += 1;
        if b == b'.' && !seen_dot {
            seen_dot = true;
            continue;
        }
        let d = match (b as char).to_digit(16) {
            Some(d) => d as u64,
            None => {
                ix -= 1;
                break;
            }
        };
        any = true;
        if mant >> 60 == 0 {
            mant = mant << 4 | d;
            if seen_dot {
                exp -= 4;
            }
        } else {
            // Out of mantissa bits: keep a sticky bit and the magnitude.
            mant |= (d != 0) as u64;
            if !seen_dot {
                exp += 4;
            }
        }
    }
    if !any {
        return None;
    }
    if ix < rest.len() && (rest[ix] | 0x20) == b'p' {
        let (eneg, digits) = split_sign(&rest[ix + 1..]);
        let mut e = 0i64;
        for b in digits.iter().cloned().take_while(u8::is_ascii_digit) {
            e = std::cmp::min(e * 10 + (b - b'0') as i64, 100_000);
        }
        if digits.first().map_or(false, u8::is_ascii_digit) {
            exp += if eneg { -e } else { e };
        }
    }
    let v = scale(mant as f64, exp);
    Some(if neg { -v } else { v })
}

pub(crate) fn parse_float(bs: &[u8]) -> Option<f64> {
    <f64 as Number>::parse_narrow(bs)
}

/// Numbers that can be read from and written to strings.
pub trait Number: Copy + Sized {
    /// The printf directive for this type.
    const FORMAT: &'static str;
    fn parse_narrow(bs: &[u8]) -> Option<Self>;
    fn render(self) -> Option<OwnedBuf>;
}

macro_rules! impl_int {
    ($ty:ty, $fmt:expr) => {
        impl Number for $ty {
            const FORMAT: &'static str = $fmt;
            fn parse_narrow(bs: &[u8]) -> Option<$ty> {
                let (neg, mag) = parse_int(bs)?;
                let v = if neg { -(mag as i128) } else { mag as i128 };
                if v < <$ty>::MIN as i128 || v > <$ty>::MAX as i128 {
                    return None;
                }
                Some(v as $ty)
            }
            fn render(self) -> Option<OwnedBuf> {
                sprintf(Self::FORMAT, &[FormatArg::from(self)])
            }
        }
    };
}

impl_int!(i32, "%d");
impl_int!(u32, "%u");
impl_int!(i64, I64_FORMAT);
impl_int!(u64, U64_FORMAT);

macro_rules! impl_float {
    ($ty:ty, $fmt:expr) => {
        impl Number for $ty {
            const FORMAT: &'static str = $fmt;
            fn parse_narrow(bs: &[u8]) -> Option<$ty> {
                let bs = skip_space(bs);
                if let Some(v) = parse_hex_float(bs) {
                    return Some(v as $ty);
                }
                match fast_float::parse_partial::<$ty, _>(bs) {
                    Ok((v, n)) if n > 0 => Some(v),
                    _ => None,
                }
            }
            fn render(self) -> Option<OwnedBuf> {
                if self.is_finite() {
                    let mut ryubuf = ryu::Buffer::new();
                    format_buf(format_args!("{}", ryubuf.format_finite(self)))
                } else {
                    sprintf(Self::FORMAT, &[FormatArg::from(self)])
                }
            }
        }
    };
}

impl_float!(f32, "%f");
impl_float!(f64, "%lf");

/// Parse the numeral at the start of `s`.
pub fn to_number<T: Number>(s: &StrView) -> Option<T> {
    if let Width::W1 = s.width() {
        return T::parse_narrow(s.as_bytes());
    }
    // Stop at the first non-ASCII element: truncating it could produce a digit.
    let len = s
        .units()
        .take(STAGING_LIMIT)
        .take_while(|u| *u < 0x80)
        .count();
    let mut staging = [0u8; STAGING_LIMIT + 1];
    copy_into(&mut staging, Width::W1, &s.slice(0, len));
    T::parse_narrow(&staging[..len])
}

/// Render `v` as a string of `width`-byte elements.
pub fn from_number<T: Number>(v: T, width: Width) -> Option<OwnedBuf> {
    let narrow = v.render()?;
    if let Width::W1 = width {
        return Some(narrow);
    }
    Some(convert(&narrow.view(), width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::width::Element;

    fn wide<T: Element>(s: &str) -> Vec<T> {
        s.bytes().map(|b| T::from_u64(b as u64)).collect()
    }

    fn parse_all_widths<N: Number + PartialEq + std::fmt::Debug>(s: &str, want: Option<N>) {
        assert_eq!(to_number::<N>(&StrView::from_str(s)), want, "{:?} (1)", s);
        let w2 = wide::<u16>(s);
        assert_eq!(to_number::<N>(&StrView::from_units(&w2)), want, "{:?} (2)", s);
        let w4 = wide::<u32>(s);
        assert_eq!(to_number::<N>(&StrView::from_units(&w4)), want, "{:?} (4)", s);
        let w8 = wide::<u64>(s);
        assert_eq!(to_number::<N>(&StrView::from_units(&w8)), want, "{:?} (8)", s);
    }

    #[test]
    fn integers() {
        parse_all_widths::<i32>("123", Some(123));
        parse_all_widths::<i32>("  -42xyz", Some(-42));
        parse_all_widths::<i32>("+7", Some(7));
        parse_all_widths::<i32>("-2147483648", Some(i32::MIN));
        parse_all_widths::<i32>("2147483648", None);
        parse_all_widths::<i32>("", None);
        parse_all_widths::<i32>("-", None);
        parse_all_widths::<i32>("abc", None);
        parse_all_widths::<u32>("4294967295", Some(u32::MAX));
        parse_all_widths::<u32>("-1", None);
        parse_all_widths::<u32>("-0", Some(0));
        parse_all_widths::<i64>("-9223372036854775808", Some(i64::MIN));
        parse_all_widths::<u64>("18446744073709551615", Some(u64::MAX));
        parse_all_widths::<u64>("18446744073709551616", None);
    }

    #[test]
    fn floats() {
        parse_all_widths::<f64>("1.234", Some(1.234));
        parse_all_widths::<f64>("\t1.234E70hello", Some(1.234E70));
        parse_all_widths::<f64>("-0.5", Some(-0.5));
        parse_all_widths::<f64>(".", None);
        parse_all_widths::<f32>("3.25", Some(3.25));
        assert!(to_number::<f64>(&StrView::from_str("nan")).unwrap().is_nan());
        assert_eq!(to_number::<f64>(&StrView::from_str("inf")), Some(f64::INFINITY));
    }

    #[test]
    fn hex_floats() {
        parse_all_widths::<f64>("0x1p3", Some(8.0));
        parse_all_widths::<f64>("  -0x1.8p1", Some(-3.0));
        parse_all_widths::<f64>("0X10", Some(16.0));
        parse_all_widths::<f64>("0xAp-2xyz", Some(2.5));
        parse_all_widths::<f64>("+0x.8", Some(0.5));
        parse_all_widths::<f64>("0x1p", Some(1.0));
        parse_all_widths::<f32>("0x1p-1", Some(0.5));
        // No hex digits: only the leading "0" is a numeral.
        parse_all_widths::<f64>("0x", Some(0.0));
        parse_all_widths::<f64>("0xg", Some(0.0));
        assert_eq!(parse_float(b"0x1p99999"), Some(f64::INFINITY));
        assert_eq!(parse_float(b"0x1p-99999"), Some(0.0));
        assert_eq!(parse_float(b"0x1p-1074"), Some(f64::from_bits(1)));
        assert_eq!(parse_float(b"0xffffffffffffffffff"), Some(2f64.powi(72)));
        // Integers stop at the 'x'.
        parse_all_widths::<i32>("0x1p3", Some(0));
    }

    #[test]
    fn staging_limit() {
        let mut s = "0".repeat(STAGING_LIMIT - 1);
        s.push('7');
        parse_all_widths::<i32>(&s, Some(7));
        let mut s = "0".repeat(STAGING_LIMIT);
        s.push('7');
        // The 1-byte path sees the whole string; wide paths stop at the limit.
        assert_eq!(to_number::<i32>(&StrView::from_str(&s)), Some(7));
        let w: Vec<u16> = wide(&s);
        assert_eq!(to_number::<i32>(&StrView::from_units(&w)), Some(0));
    }

    #[test]
    fn non_ascii_is_not_a_digit() {
        // U+0131 truncates to '1'.
        let w: Vec<u16> = vec![0x0131];
        assert_eq!(to_number::<i32>(&StrView::from_units(&w)), None);
        let w: Vec<u16> = vec![b'4' as u16, 0x0132];
        assert_eq!(to_number::<i32>(&StrView::from_units(&w)), Some(4));
    }

    #[test]
    fn formats_follow_word_size() {
        if cfg!(target_pointer_width = "64") {
            assert_eq!(<i64 as Number>::FORMAT, "%ld");
            assert_eq!(<u64 as Number>::FORMAT, "%lu");
        } else {
            assert_eq!(<i64 as Number>::FORMAT, "%lld");
            assert_eq!(<u64 as Number>::FORMAT, "%llu");
        }
    }

    fn round_trip<N: Number + PartialEq + std::fmt::Debug>(vals: &[N]) {
        for &v in vals {
            for &w in Width::ALL.iter() {
                let buf = from_number(v, w).unwrap();
                assert_eq!(buf.width(), w);
                assert_eq!(to_number::<N>(&buf.view()), Some(v), "{:?} at {}", v, w);
            }
        }
    }

    #[test]
    fn render_round_trip() {
        round_trip(&[0i32, -1, 42, i32::MIN, i32::MAX]);
        round_trip(&[0u32, 7, u32::MAX]);
        round_trip(&[0i64, -99, i64::MIN, i64::MAX]);
        round_trip(&[0u64, u64::MAX]);
        round_trip(&[0.0f64, -2.5, 1e300, 0.1]);
        round_trip(&[1.5f32, -0.125]);
    }

    #[test]
    fn render_text() {
        let b = from_number(-17i32, Width::W1).unwrap();
        assert_eq!(b.as_bytes(), b"-17");
        assert_eq!(b.capacity(), 4);
        let b = from_number(0.5f64, Width::W2).unwrap();
        assert_eq!(b.as_units::<u16>().unwrap(), &wide::<u16>("0.5")[..]);
        let b = from_number(f64::NEG_INFINITY, Width::W1).unwrap();
        assert_eq!(b.as_bytes(), b"-inf");
    }
}
