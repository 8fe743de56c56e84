//! Injection pipeline
//!
//! The reverse path: reads translated blocks from a stream, splices them
//! over the sentinel pairs in the interim document, reverses the inline
//! encoding through the style store, restores saved whitespace, and hands
//! the reconstructed tree back to the format adapter. Missing blocks and
//! unknown styles are logged and survive as their original content; only
//! structural problems abort.

use crate::cleanup::cleanup_styles;
use crate::error::TransfuseError;
use crate::project::Project;
use crate::sentinel::{
    block_close_mark, block_open_mark, TFB_CLOSE_E, TFB_MARK, TFB_OPEN_E, TFI_CLOSE, TFI_OPEN_B,
    TFI_OPEN_E, TFP_OPEN_B, TFP_OPEN_E,
};
use crate::spaces::restore_spaces;
use crate::store::StyleStore;
use crate::stream::{self, StreamVariant};
use crate::tags::TagPolicy;
use crate::tree::{append_xml, Tree};
use log::{debug, warn};
use regex::Regex;
use std::io::BufRead;
use std::path::PathBuf;

/// Options for one injection run.
#[derive(Debug, Clone, Default)]
pub struct InjectOptions {
    /// Project directory; read from the stream header when absent
    pub dir: Option<PathBuf>,
    /// Wire format; `Detect` sniffs the header line
    pub variant: StreamVariant,
    /// The format adapter's tag policy tables
    pub tags: TagPolicy,
}

/// Result of an injection run.
pub struct Injected {
    /// The project directory the stream referred to
    pub dir: PathBuf,
    /// Format name recorded at extraction time
    pub format: String,
    /// The reconstructed document, ready for the format adapter
    pub tree: Tree,
}

/// Reads a translated stream and rebuilds the document.
pub fn inject(
    input: &mut dyn BufRead,
    opts: &InjectOptions,
) -> Result<Injected, TransfuseError> {
    let mut header = String::new();
    if input.read_line(&mut header)? == 0 {
        return Err(TransfuseError::Stream("input stream was empty".to_string()));
    }

    let codec = match opts.variant {
        StreamVariant::Detect => stream::detect(&header)?,
        explicit => explicit.codec()?,
    };
    let dir = opts
        .dir
        .clone()
        .or_else(|| codec.get_tmpdir(&header))
        .ok_or_else(|| {
            TransfuseError::Stream(
                "could not read project directory from stream header".to_string(),
            )
        })?;

    let project = Project::open(&dir)?;
    project.expect_state()?;
    let mut content = project.load_content()?;

    // Splice every streamed block over its sentinel pairs
    let mut body = String::new();
    let mut bid = String::new();
    while codec.get_block(input, &mut body, &mut bid)? {
        if bid.is_empty() {
            continue;
        }
        let mut escaped = String::with_capacity(body.len());
        append_xml(&mut escaped, body.trim(), true);
        content = splice_block(&content, &bid, &escaped);
    }

    // Untranslated blocks fall back to the value preserved at extraction
    strip_block_marks(&mut content);
    cleanup_styles(&mut content)?;

    let store = project.open_store()?;
    expand_styles(&mut content, &store)?;

    let mut tree = Tree::parse(&content).map_err(|e| {
        TransfuseError::Parse(format!("could not parse injected document: {e}"))
    })?;
    restore_spaces(&mut tree, &opts.tags)?;
    project.save_injected(&tree.to_xml())?;

    let format = store.format()?;
    debug!("injected stream into {} (format {format})", dir.display());
    Ok(Injected { dir, format, tree })
}

/// Replaces every sentinel-delimited occurrence of block `bid` with
/// `replacement`. A block may occur more than once when the extractor
/// deduplicated; an id with no occurrence is logged and skipped.
fn splice_block(content: &str, bid: &str, replacement: &str) -> String {
    let open = block_open_mark(bid);
    let close = block_close_mark(bid);

    let mut out = String::with_capacity(content.len());
    let mut last = 0usize;
    while let Some(b) = content[last..].find(&open).map(|p| p + last) {
        let after_open = b + open.len();
        let Some(e) = content[after_open..].find(&close).map(|p| p + after_open) else {
            break;
        };
        out.push_str(&content[last..b]);
        out.push_str(replacement);
        last = e + close.len();
    }
    if last == 0 {
        warn!("block {bid} did not exist in this document");
        return content.to_string();
    }
    out.push_str(&content[last..]);
    out
}

/// Removes remaining block markers, leaving the preserved original
/// values in place.
fn strip_block_marks(content: &mut String) {
    let mut out = String::with_capacity(content.len());
    let mut last = 0usize;
    while let Some(b) = content[last..].find(TFB_MARK).map(|p| p + last) {
        out.push_str(&content[last..b]);
        let rest = &content[b..];
        let open_e = rest.find(TFB_OPEN_E);
        let close_e = rest.find(TFB_CLOSE_E);
        let tail = match (open_e, close_e) {
            (Some(o), Some(c)) => Some(o.min(c)),
            (Some(o), None) => Some(o),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        };
        match tail {
            Some(t) => last = b + t + TFB_OPEN_E.len(),
            None => {
                // Dangling lead-in; keep it and move on
                out.push_str(TFB_MARK);
                last = b + TFB_MARK.len();
            }
        }
    }
    out.push_str(&content[last..]);
    *content = out;
}

/// Expands inline and protected-inline delimiters back into original
/// markup, looping because expanded markup may itself carry style
/// references recorded during protect promotion.
fn expand_styles(content: &mut String, store: &StyleStore) -> Result<(), TransfuseError> {
    let rx_inlines = Regex::new(&format!(
        r"{TFI_OPEN_B}([^{TFI_OPEN_E}]+?):([^{TFI_OPEN_E}:]+){TFI_OPEN_E}([^{TFI_OPEN_B}-{TFI_CLOSE}]*){TFI_CLOSE}"
    ))?;
    let rx_prots = Regex::new(&format!(
        r"{TFP_OPEN_B}([^{TFP_OPEN_E}]+?):([^{TFP_OPEN_E}:]+){TFP_OPEN_E}"
    ))?;

    let mut did = true;
    while did {
        did = false;

        let mut out = String::with_capacity(content.len());
        let mut last = 0usize;
        for caps in rx_inlines.captures_iter(content) {
            let m0 = caps.get(0).unwrap();
            out.push_str(&content[last..m0.start()]);
            last = m0.end();
            did = true;

            let kind = caps.get(1).unwrap().as_str();
            let id = caps.get(2).unwrap().as_str();
            let (open, close) = store.style_get(kind, id)?;
            if open.is_empty() && close.is_empty() {
                warn!("inline tag {kind}:{id} did not exist in this document");
            }
            out.push_str(&open);
            out.push_str(caps.get(3).unwrap().as_str());
            out.push_str(&close);
        }
        out.push_str(&content[last..]);
        *content = out;

        let mut out = String::with_capacity(content.len());
        let mut last = 0usize;
        for caps in rx_prots.captures_iter(content) {
            let m0 = caps.get(0).unwrap();
            out.push_str(&content[last..m0.start()]);
            last = m0.end();
            did = true;

            let kind = caps.get(1).unwrap().as_str();
            let id = caps.get(2).unwrap().as_str();
            let (open, close) = store.style_get(kind, id)?;
            if open.is_empty() && close.is_empty() {
                warn!("protected inline tag {kind}:{id} did not exist in this document");
            }
            out.push_str(&open);
            out.push_str(&close);
        }
        out.push_str(&content[last..]);
        *content = out;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_replaces_every_occurrence() {
        let open = block_open_mark("1-x");
        let close = block_close_mark("1-x");
        let content = format!("<p>{open}old{close}</p><q>{open}old{close}</q>");
        let spliced = splice_block(&content, "1-x", "new");
        assert_eq!(spliced, "<p>new</p><q>new</q>");
    }

    #[test]
    fn splice_keeps_content_for_unknown_id() {
        let content = "<p>untouched</p>".to_string();
        assert_eq!(splice_block(&content, "9-z", "new"), content);
    }

    #[test]
    fn stripping_marks_leaves_fallback_value() {
        let open = block_open_mark("1-x");
        let close = block_close_mark("1-x");
        let mut content = format!("<p>{open}original{close}</p>");
        strip_block_marks(&mut content);
        assert_eq!(content, "<p>original</p>");
    }

    #[test]
    fn expand_restores_markup_from_store() {
        let mut store = StyleStore::open_in_memory().unwrap();
        let id = store.style_put("b", "<b>", "</b>").unwrap();
        let mut content =
            format!("<p>{TFI_OPEN_B}b:{id}{TFI_OPEN_E}bold{TFI_CLOSE}</p>");
        expand_styles(&mut content, &store).unwrap();
        assert_eq!(content, "<p><b>bold</b></p>");
    }

    #[test]
    fn expand_handles_nested_style_references() {
        let mut store = StyleStore::open_in_memory().unwrap();
        let inner_id = store.style_put("b", "<b>", "</b>").unwrap();
        // A promoted style whose close markup itself contains a style
        // reference is expanded on the next sweep
        let close = format!("{TFI_OPEN_B}b:{inner_id}{TFI_OPEN_E}x{TFI_CLOSE}");
        let outer_id = store.style_put("P", "", &close).unwrap();
        let mut content =
            format!("{TFI_OPEN_B}P:{outer_id}{TFI_OPEN_E}tok{TFI_CLOSE}");
        expand_styles(&mut content, &store).unwrap();
        assert_eq!(content, "tok<b>x</b>");
    }

    #[test]
    fn expand_empty_style_preserves_body() {
        let store = StyleStore::open_in_memory().unwrap();
        let mut content =
            format!("<p>{TFI_OPEN_B}b:0-none{TFI_OPEN_E}body{TFI_CLOSE}</p>");
        expand_styles(&mut content, &store).unwrap();
        assert_eq!(content, "<p>body</p>");
    }

    #[test]
    fn expand_protected_inline_emits_markup_without_body() {
        let mut store = StyleStore::open_in_memory().unwrap();
        let id = store.style_put("br", "<br/>", "").unwrap();
        let mut content = format!("<p>a{TFP_OPEN_B}br:{id}{TFP_OPEN_E}b</p>");
        expand_styles(&mut content, &store).unwrap();
        assert_eq!(content, "<p>a<br/>b</p>");
    }
}
