//! Substring replacement.
use super::str_impl::{OwnedBuf, ScratchBuf};
use super::string_search::index_of;
use super::view::StrView;
use crate::common::{OomPolicy, Result, StrError};

use log::debug;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReplaceMode {
    First,
    All,
}

/// `s1` with occurrences of `s2` replaced by `rep`. Allocation failure aborts.
pub fn replace(s1: &StrView, s2: &StrView, rep: &StrView, mode: ReplaceMode) -> Result<OwnedBuf> {
    replace_with(s1, s2, rep, mode, OomPolicy::Abort)
}

/// Like `replace`, but allocation failure is returned as `StrError::Exhausted`.
pub fn try_replace(
    s1: &StrView,
    s2: &StrView,
    rep: &StrView,
    mode: ReplaceMode,
) -> Result<OwnedBuf> {
    replace_with(s1, s2, rep, mode, OomPolicy::Report)
}

pub fn replace_with(
    s1: &StrView,
    s2: &StrView,
    rep: &StrView,
    mode: ReplaceMode,
    policy: OomPolicy,
) -> Result<OwnedBuf> {
    s1.check_width(s2)?;
    s1.check_width(rep)?;
    if s2.is_empty() {
        debug!("rejecting replace with an empty pattern");
        return Err(StrError::EmptyPattern);
    }
    let w = s1.width().size();
    let (s1_len, s2_len, rep_len) = (s1.len(), s2.len(), rep.len());
    let (hay, rep_bytes) = (s1.as_bytes(), rep.as_bytes());

    let mut tmp = ScratchBuf::new(s1.width());
    // Elements written to `tmp` and elements consumed from `s1`.
    let mut to = 0;
    let mut from = 0;

    while let Some(find) = index_of(s1, s2, from) {
        let before_len = find - from;
        tmp.reallocate_with(to + before_len + rep_len + 1, policy)?;
        tmp.write_at(to, &hay[from * w..find * w]);
        to += before_len;
        tmp.write_at(to, rep_bytes);
        to += rep_len;
        from = find + s2_len;
        if let ReplaceMode::First = mode {
            break;
        }
    }

    let before_len = s1_len - from;
    tmp.reallocate_with(to + before_len + 1, policy)?;
    tmp.write_at(to, &hay[from * w..]);
    to += before_len;
    tmp.terminate_at(to);

    Ok(unsafe { tmp.into_owned(to) })
}
