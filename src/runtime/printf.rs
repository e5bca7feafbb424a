//! printf-style formatted construction.
//!
//! `FormatArg` slices stand in for C varargs. Every integer argument is carried as 64 bits, so
//! length modifiers (`l`, `ll`, `h`, ...) are accepted and ignored. Arguments of the "wrong" kind
//! are coerced the way awk would: strings are parsed as numbers, numbers are printed for `%s`.
use super::number::{parse_float, parse_int};
use super::str_impl::{DynamicBuf, OwnedBuf};
use super::width::Width;
use crate::common::{OomPolicy, Result};

use log::debug;
use smallvec::SmallVec;

use std::fmt;
use std::io;
use std::ptr;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FormatArg<'a> {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(&'a [u8]),
    Char(u32),
}

macro_rules! impl_from_arg {
    ($($ty:ty => |$v:ident| $e:expr),* $(,)?) => {
        $(
            impl<'a> From<$ty> for FormatArg<'a> {
                fn from($v: $ty) -> FormatArg<'a> {
                    $e
                }
            }
        )*
    };
}

impl_from_arg!(
    i8 => |v| FormatArg::Int(v as i64),
    i16 => |v| FormatArg::Int(v as i64),
    i32 => |v| FormatArg::Int(v as i64),
    i64 => |v| FormatArg::Int(v),
    isize => |v| FormatArg::Int(v as i64),
    u8 => |v| FormatArg::UInt(v as u64),
    u16 => |v| FormatArg::UInt(v as u64),
    u32 => |v| FormatArg::UInt(v as u64),
    u64 => |v| FormatArg::UInt(v),
    usize => |v| FormatArg::UInt(v as u64),
    f32 => |v| FormatArg::Float(v as f64),
    f64 => |v| FormatArg::Float(v),
    char => |v| FormatArg::Char(v as u32),
);

impl<'a> From<&'a str> for FormatArg<'a> {
    fn from(s: &'a str) -> FormatArg<'a> {
        FormatArg::Str(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for FormatArg<'a> {
    fn from(bs: &'a [u8]) -> FormatArg<'a> {
        FormatArg::Str(bs)
    }
}

impl<'a> FormatArg<'a> {
    // (negative, magnitude)
    fn to_signed(&self) -> (bool, u64) {
        let i = match *self {
            FormatArg::Int(i) => i,
            FormatArg::UInt(u) => return (false, u),
            FormatArg::Float(f) => f as i64,
            FormatArg::Str(s) => match parse_int(s) {
                Some((neg, mag)) => return (neg && mag != 0, mag),
                None => 0,
            },
            FormatArg::Char(c) => c as i64,
        };
        (i < 0, i.unsigned_abs())
    }

    // Negative values wrap, as they would when passed to %u in C.
    fn to_unsigned(&self) -> u64 {
        match self.to_signed() {
            (true, mag) => mag.wrapping_neg(),
            (false, mag) => mag,
        }
    }

    fn to_float(&self) -> f64 {
        match *self {
            FormatArg::Int(i) => i as f64,
            FormatArg::UInt(u) => u as f64,
            FormatArg::Float(f) => f,
            FormatArg::Str(s) => parse_float(s).unwrap_or(0.0),
            FormatArg::Char(c) => c as f64,
        }
    }
}

#[derive(Default, Debug, PartialEq)]
struct FormatSpec {
    // '-': left-justify
    minus: bool,
    // '+': always print a sign
    plus: bool,
    // ' ': space in place of a '+'
    space: bool,
    // '0': pad numbers with zeros
    zero: bool,
    // '#': alternate form
    alt: bool,
    width: Option<usize>,
    prec: Option<usize>,
    // conversion character: e.g. d, s, x, g.
    conv: u8,
}

struct Args<'a, 'b> {
    args: &'b [FormatArg<'a>],
}

impl<'a, 'b> Args<'a, 'b> {
    fn next(&mut self) -> Result<FormatArg<'a>> {
        match self.args.split_first() {
            Some((first, rest)) => {
                self.args = rest;
                Ok(*first)
            }
            None => err!("not enough arguments for format string"),
        }
    }
}

fn parse_num(spec: &[u8], mut ix: usize) -> (usize, usize) {
    let mut n = 0usize;
    while ix < spec.len() && spec[ix].is_ascii_digit() {
        n = n.saturating_mul(10).saturating_add((spec[ix] - b'0') as usize);
        ix += 1;
    }
    (n, ix)
}

// Largest width or precision accepted. Rust's formatter takes precisions up to `u16::MAX`, and
// `%g` may add four to the requested one.
const MAX_FIELD: u64 = u16::MAX as u64 - 4;

fn field(n: u64, what: &str) -> Result<usize> {
    if n > MAX_FIELD {
        return err!("{} {} exceeds {}", what, n, MAX_FIELD);
    }
    Ok(n as usize)
}

// Parse the directive starting at the '%' at `start`. Returns the spec and the index one past it.
fn parse_spec(spec: &[u8], start: usize, args: &mut Args) -> Result<(FormatSpec, usize)> {
    let mut fs = FormatSpec::default();
    let mut ix = start + 1;
    while ix < spec.len() {
        match spec[ix] {
            b'-' => fs.minus = true,
            b'+' => fs.plus = true,
            b' ' => fs.space = true,
            b'0' => fs.zero = true,
            b'#' => fs.alt = true,
            _ => break,
        }
        ix += 1;
    }
    if ix < spec.len() && spec[ix] == b'*' {
        let (neg, mag) = args.next()?.to_signed();
        fs.minus |= neg;
        fs.width = Some(field(mag, "field width")?);
        ix += 1;
    } else if ix < spec.len() && spec[ix].is_ascii_digit() {
        let (n, next) = parse_num(spec, ix);
        fs.width = Some(field(n as u64, "field width")?);
        ix = next;
    }
    if ix < spec.len() && spec[ix] == b'.' {
        ix += 1;
        if ix < spec.len() && spec[ix] == b'*' {
            let (neg, mag) = args.next()?.to_signed();
            // A negative precision is taken as if it were omitted.
            fs.prec = if neg {
                None
            } else {
                Some(field(mag, "precision")?)
            };
            ix += 1;
        } else {
            let (n, next) = parse_num(spec, ix);
            fs.prec = Some(field(n as u64, "precision")?);
            ix = next;
        }
    }
    while ix < spec.len() && b"hlLqjzt".contains(&spec[ix]) {
        ix += 1;
    }
    if ix >= spec.len() {
        return err!(
            "incomplete format directive {:?}",
            String::from_utf8_lossy(&spec[start..])
        );
    }
    match spec[ix] {
        c if b"diuxXocsfFeEgG%".contains(&c) => {
            fs.conv = c;
            Ok((fs, ix + 1))
        }
        c => err!("unsupported conversion {:?} in format string", c as char),
    }
}

fn write_bytes(mut w: impl io::Write, bs: &[u8]) -> Result<()> {
    match w.write_all(bs) {
        Ok(()) => Ok(()),
        Err(e) => err!("formatter: {}", e),
    }
}

fn write_fill(mut w: impl io::Write, c: u8, n: usize) -> Result<()> {
    const CHUNK: usize = 32;
    let fill = [c; CHUNK];
    let mut n = n;
    while n > 0 {
        let k = std::cmp::min(n, CHUNK);
        write_bytes(&mut w, &fill[..k])?;
        n -= k;
    }
    Ok(())
}

// Emit sign, prefix and body padded out to the field width.
fn pad(
    mut w: impl io::Write,
    fs: &FormatSpec,
    sign: &[u8],
    prefix: &[u8],
    body: &[u8],
    zero_ok: bool,
) -> Result<()> {
    let len = sign.len() + prefix.len() + body.len();
    let fill = fs.width.unwrap_or(0).saturating_sub(len);
    if fs.minus {
        write_bytes(&mut w, sign)?;
        write_bytes(&mut w, prefix)?;
        write_bytes(&mut w, body)?;
        write_fill(&mut w, b' ', fill)
    } else if fs.zero && zero_ok {
        write_bytes(&mut w, sign)?;
        write_bytes(&mut w, prefix)?;
        write_fill(&mut w, b'0', fill)?;
        write_bytes(&mut w, body)
    } else {
        write_fill(&mut w, b' ', fill)?;
        write_bytes(&mut w, sign)?;
        write_bytes(&mut w, prefix)?;
        write_bytes(&mut w, body)
    }
}

fn sign_of(fs: &FormatSpec, negative: bool) -> &'static [u8] {
    if negative {
        b"-"
    } else if fs.plus {
        b"+"
    } else if fs.space {
        b" "
    } else {
        b""
    }
}

type Digits = SmallVec<[u8; 32]>;

fn digits(conv: u8, v: u64) -> Digits {
    let mut res = Digits::new();
    match conv {
        b'x' => res.extend_from_slice(format!("{:x}", v).as_bytes()),
        b'X' => res.extend_from_slice(format!("{:X}", v).as_bytes()),
        b'o' => res.extend_from_slice(format!("{:o}", v).as_bytes()),
        _ => res.extend_from_slice(itoa::Buffer::new().format(v).as_bytes()),
    }
    res
}

fn format_int(w: impl io::Write, fs: &FormatSpec, arg: FormatArg) -> Result<()> {
    let (negative, mag) = match fs.conv {
        b'd' | b'i' => arg.to_signed(),
        _ => (false, arg.to_unsigned()),
    };
    let mut body = if mag == 0 && fs.prec == Some(0) {
        Digits::new()
    } else {
        digits(fs.conv, mag)
    };
    if let Some(prec) = fs.prec {
        if body.len() < prec {
            let missing = prec - body.len();
            body.insert_many(0, std::iter::repeat(b'0').take(missing));
        }
    }
    let prefix: &[u8] = match fs.conv {
        b'x' if fs.alt && mag != 0 => b"0x",
        b'X' if fs.alt && mag != 0 => b"0X",
        b'o' if fs.alt && body.first() != Some(&b'0') => b"0",
        _ => b"",
    };
    let sign: &[u8] = match fs.conv {
        b'd' | b'i' => sign_of(fs, negative),
        _ => b"",
    };
    pad(w, fs, sign, prefix, &body[..], fs.prec.is_none())
}

// Rust renders `{:e}` as "1.5e2"; C wants at least two exponent digits and an explicit sign.
fn c_exponent(rendered: &str, upper: bool) -> String {
    let (mantissa, exp) = match rendered.find('e') {
        Some(ix) => (&rendered[..ix], &rendered[ix + 1..]),
        None => (rendered, "0"),
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    format!(
        "{}{}{}{:02}",
        mantissa,
        if upper { 'E' } else { 'e' },
        if exp < 0 { '-' } else { '+' },
        exp.abs()
    )
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn format_general(a: f64, prec: usize, alt: bool, upper: bool) -> String {
    let p = if prec == 0 { 1 } else { prec };
    let x = if a == 0.0 {
        0
    } else {
        let rendered = format!("{:.*e}", p - 1, a);
        rendered
            .find('e')
            .and_then(|ix| rendered[ix + 1..].parse::<i64>().ok())
            .unwrap_or(0)
    };
    if (p as i64) > x && x >= -4 {
        let fixed = format!("{:.*}", (p as i64 - 1 - x) as usize, a);
        if alt {
            fixed
        } else {
            strip_fraction_zeros(&fixed).to_string()
        }
    } else {
        let exp = c_exponent(&format!("{:.*e}", p - 1, a), upper);
        if alt {
            return exp;
        }
        let ix = exp.find(|c| c == 'e' || c == 'E').unwrap_or(exp.len());
        format!("{}{}", strip_fraction_zeros(&exp[..ix]), &exp[ix..])
    }
}

fn format_float(w: impl io::Write, fs: &FormatSpec, arg: FormatArg) -> Result<()> {
    let f = arg.to_float();
    let upper = fs.conv.is_ascii_uppercase();
    let negative = f.is_sign_negative() && !f.is_nan();
    let a = f.abs();
    if !a.is_finite() {
        let body: &[u8] = match (a.is_nan(), upper) {
            (true, false) => b"nan",
            (true, true) => b"NAN",
            (false, false) => b"inf",
            (false, true) => b"INF",
        };
        return pad(w, fs, sign_of(fs, negative), b"", body, false);
    }
    let prec = fs.prec.unwrap_or(6);
    let body = match fs.conv {
        b'f' | b'F' => {
            let mut s = format!("{:.*}", prec, a);
            if fs.alt && prec == 0 {
                s.push('.');
            }
            s
        }
        b'e' | b'E' => c_exponent(&format!("{:.*e}", prec, a), upper),
        _ => format_general(a, prec, fs.alt, upper),
    };
    pad(w, fs, sign_of(fs, negative), b"", body.as_bytes(), true)
}

fn format_char(w: impl io::Write, fs: &FormatSpec, arg: FormatArg) -> Result<()> {
    let mut utf8 = [0u8; 4];
    let body: &[u8] = match arg {
        FormatArg::Str(s) => &s[..std::cmp::min(1, s.len())],
        other => {
            let code = other.to_unsigned();
            match std::char::from_u32(code as u32) {
                Some(c) if code <= 0x10FFFF => c.encode_utf8(&mut utf8).as_bytes(),
                _ => {
                    utf8[0] = code as u8;
                    &utf8[..1]
                }
            }
        }
    };
    pad(w, fs, b"", b"", body, false)
}

fn format_str(w: impl io::Write, fs: &FormatSpec, arg: FormatArg) -> Result<()> {
    let mut scratch = Digits::new();
    let body: &[u8] = match arg {
        FormatArg::Str(s) => s,
        FormatArg::Int(i) => {
            scratch.extend_from_slice(itoa::Buffer::new().format(i).as_bytes());
            &scratch[..]
        }
        FormatArg::UInt(u) => {
            scratch.extend_from_slice(itoa::Buffer::new().format(u).as_bytes());
            &scratch[..]
        }
        FormatArg::Float(f) => {
            let mut ryubuf = ryu::Buffer::new();
            scratch.extend_from_slice(ryubuf.format(f).as_bytes());
            &scratch[..]
        }
        FormatArg::Char(_) => return format_char(w, fs, arg),
    };
    let body = match fs.prec {
        Some(p) if p < body.len() => &body[..p],
        _ => body,
    };
    pad(w, fs, b"", b"", body, false)
}

fn process_format(w: impl io::Write, fs: &FormatSpec, arg: FormatArg) -> Result<()> {
    match fs.conv {
        b'd' | b'i' | b'u' | b'x' | b'X' | b'o' => format_int(w, fs, arg),
        b'c' => format_char(w, fs, arg),
        b's' => format_str(w, fs, arg),
        _ => format_float(w, fs, arg),
    }
}

/// Render `spec` with `args` into `w`.
///
/// Fails if the template is malformed or refers to more arguments than were passed. Extra
/// arguments are ignored.
pub fn printf(mut w: impl io::Write, spec: &[u8], args: &[FormatArg]) -> Result<()> {
    #[derive(Copy, Clone)]
    enum State {
        // Byte index of start of literal text
        Raw(usize),
        // Byte index of percent sign
        Format(usize),
    }

    use State::*;
    let mut args = Args { args };
    let mut state = Raw(0);
    let mut ix = 0;
    loop {
        match state {
            Raw(start) => match memchr::memchr(b'%', &spec[ix..]) {
                Some(off) => {
                    write_bytes(&mut w, &spec[start..ix + off])?;
                    ix += off;
                    state = Format(ix);
                }
                None => return write_bytes(&mut w, &spec[start..]),
            },
            Format(start) => {
                let (fs, next) = parse_spec(spec, start, &mut args)?;
                if fs.conv == b'%' {
                    write_bytes(&mut w, b"%")?;
                } else {
                    let arg = args.next()?;
                    process_format(&mut w, &fs, arg)?;
                }
                ix = next;
                state = Raw(ix);
            }
        }
    }
}

/// Render a printf template into a newly allocated, exactly sized narrow buffer.
///
/// Returns `None` if formatting or allocation fails; callers treat that as an empty result.
pub fn sprintf(spec: impl AsRef<[u8]>, args: &[FormatArg]) -> Option<OwnedBuf> {
    let spec = spec.as_ref();
    let res = DynamicBuf::new(spec.len(), OomPolicy::Report).and_then(|mut buf| {
        printf(&mut buf, spec, args)?;
        buf.into_buf()
    });
    match res {
        Ok(buf) => Some(buf),
        Err(e) => {
            debug!("sprintf failed: {}", e);
            None
        }
    }
}

struct Counter(usize);

impl fmt::Write for Counter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

struct Fill<'a> {
    buf: &'a mut OwnedBuf,
    pos: usize,
}

impl<'a> fmt::Write for Fill<'a> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // Element `capacity - 1` is reserved for the terminator.
        if self.pos + s.len() >= self.buf.capacity() {
            return Err(fmt::Error);
        }
        unsafe {
            ptr::copy_nonoverlapping(
                s.as_ptr(),
                self.buf.as_mut_ptr().add(self.pos),
                s.len(),
            )
        };
        self.pos += s.len();
        Ok(())
    }
}

/// Render `args` into a newly allocated narrow buffer of exactly `len + 1` bytes.
///
/// The arguments are formatted twice: once to measure, once into the allocation.
pub fn format_buf(args: fmt::Arguments) -> Option<OwnedBuf> {
    let mut counter = Counter(0);
    fmt::write(&mut counter, args).ok()?;
    let mut buf = match OwnedBuf::try_with_capacity(counter.0 + 1, Width::W1) {
        Ok(buf) => buf,
        Err(e) => {
            debug!("format_buf: {}", e);
            return None;
        }
    };
    let mut fill = Fill {
        buf: &mut buf,
        pos: 0,
    };
    if fmt::write(&mut fill, args).is_err() {
        debug!("format_buf: output changed between passes");
        return None;
    }
    let len = fill.pos;
    unsafe { buf.set_len(len) };
    Some(buf)
}
