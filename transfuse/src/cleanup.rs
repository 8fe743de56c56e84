//! Interim text normalization
//!
//! A fixed sequence of rewrites over the styled form that tightens inline
//! boundaries before the text meets the translator: letter runs touching
//! a span boundary move inside the span, whitespace at the inner edges of
//! a span moves outside, and adjacent identical spans merge. The passes
//! are ordered so whitespace migration sees stable boundaries, and one
//! full application is a fixpoint.
//!
//! Kind-`P` spans carry promoted protected markup as their close tag, so
//! moving text or merging across their close delimiter would shift that
//! markup relative to the surrounding words. The suffix and merge passes
//! leave them alone.

use crate::error::TransfuseError;
use crate::sentinel::{TFI_CLOSE, TFI_OPEN_B, TFI_OPEN_E};
use regex::Regex;

/// Applies the cleanup passes to interim text in place.
pub fn cleanup_styles(text: &mut String) -> Result<(), TransfuseError> {
    // If an inline span starts with a letter and is preceded by an
    // alphanumeric run ending in a letter, move that run inside
    let rx_alpha_prefix = Regex::new(&format!(
        r"([\p{{L}}\p{{N}}\p{{M}}]*?[\p{{L}}\p{{M}}])({TFI_OPEN_B}[^{TFI_OPEN_E}]+{TFI_OPEN_E})(\p{{L}}+)"
    ))?;
    *text = rx_alpha_prefix.replace_all(text, "$2$1$3").into_owned();

    migrate_alpha_suffixes(text)?;

    // Leading whitespace inside a span moves before it
    let rx_spc_prefix = Regex::new(&format!(
        r"({TFI_OPEN_B}[^{TFI_OPEN_E}]+{TFI_OPEN_E})([\s\p{{Zs}}]+)"
    ))?;
    *text = rx_spc_prefix.replace_all(text, "$2$1").into_owned();

    // Trailing whitespace inside a span moves after it
    let rx_spc_suffix = Regex::new(&format!(r"([\s\p{{Zs}}]+)({TFI_CLOSE})"))?;
    *text = rx_spc_suffix.replace_all(text, "$2$1").into_owned();

    merge_identical_spans(text)?;
    Ok(())
}

/// If an inline span ends with a letter and is followed by a letter run,
/// moves that run inside. The close delimiter does not name its span, so
/// the walk keeps a stack of open kinds to know which close belongs to a
/// promoted `P` span and must not attract text.
fn migrate_alpha_suffixes(text: &mut String) -> Result<(), TransfuseError> {
    let rx_pre = Regex::new(r"(\p{L}[\p{L}\p{M}]*)$")?;
    let rx_post = Regex::new(r"^(\p{L}[\p{L}\p{N}\p{M}]*)")?;

    let s = text.as_str();
    let mut out = String::with_capacity(s.len());
    let mut kinds: Vec<String> = Vec::new();
    let mut last = 0usize;
    let mut i = 0usize;

    while i < s.len() {
        let c = s[i..].chars().next().unwrap();
        if c == TFI_OPEN_B {
            let rest = &s[i + c.len_utf8()..];
            if let Some(e) = rest.find(TFI_OPEN_E) {
                let kind = rest[..e].split(':').next().unwrap_or("").to_string();
                kinds.push(kind);
                i += c.len_utf8() + e + TFI_OPEN_E.len_utf8();
                continue;
            }
            i += c.len_utf8();
        } else if c == TFI_CLOSE {
            let kind = kinds.pop().unwrap_or_default();
            let close_end = i + c.len_utf8();
            if kind != "P" {
                if let (Some(_), Some(post)) =
                    (rx_pre.find(&s[..i]), rx_post.find(&s[close_end..]))
                {
                    out.push_str(&s[last..i]);
                    out.push_str(post.as_str());
                    out.push(TFI_CLOSE);
                    last = close_end + post.end();
                    i = last;
                    continue;
                }
            }
            i = close_end;
        } else {
            i += c.len_utf8();
        }
    }
    out.push_str(&s[last..]);
    *text = out;
    Ok(())
}

/// Merges identical inline spans that have nothing or only whitespace
/// between them, keeping the whitespace between the bodies. Repeats until
/// a sweep merges nothing, so chains of three or more spans collapse in
/// one call. Promoted `P` spans never merge.
fn merge_identical_spans(text: &mut String) -> Result<(), TransfuseError> {
    let rx_span = Regex::new(&format!(
        r"({TFI_OPEN_B}[^{TFI_OPEN_E}]+{TFI_OPEN_E})([^{TFI_OPEN_B}-{TFI_CLOSE}]+){TFI_CLOSE}([\s\p{{Zs}}]*)"
    ))?;
    let p_head = format!("{TFI_OPEN_B}P:");

    loop {
        let mut out = String::with_capacity(text.len());
        let mut last = 0usize;
        let mut merged = false;

        while let Some(caps) = rx_span.captures_at(text, last) {
            let m0 = caps.get(0).unwrap();
            let open = caps.get(1).unwrap().as_str();
            // The following span must repeat the exact same open delimiter
            if !open.starts_with(&p_head) && text[m0.end()..].starts_with(open) {
                out.push_str(&text[last..m0.start()]);
                out.push_str(open);
                out.push_str(caps.get(2).unwrap().as_str());
                out.push_str(caps.get(3).unwrap().as_str());
                last = m0.end() + open.len();
                merged = true;
            } else {
                out.push_str(&text[last..m0.end()]);
                last = m0.end();
            }
        }
        out.push_str(&text[last..]);
        *text = out;

        if !merged {
            break;
        }
    }
    Ok(())
}
