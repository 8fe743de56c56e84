//! The interim sentinel alphabet
//!
//! Inline substitutions use Unicode private-use codepoints; block markers
//! use control bytes that cannot appear in well-formed XML text. Neither
//! set may occur in a source document, so extraction starts by scanning
//! for them and rejecting the document if any are found.

use crate::error::TransfuseError;
use crate::tree::{NodeData, Tree};

/// Opens an inline style reference: `TFI_OPEN_B kind ':' id TFI_OPEN_E`
pub const TFI_OPEN_B: char = '\u{E011}';
/// Closes the head of an inline style reference
pub const TFI_OPEN_E: char = '\u{E012}';
/// Closes an inline style body
pub const TFI_CLOSE: char = '\u{E013}';

/// Opens a self-closing protected-inline reference: `TFP_OPEN_B kind ':' id TFP_OPEN_E`
pub const TFP_OPEN_B: char = '\u{E020}';
/// Closes a protected-inline reference
pub const TFP_OPEN_E: char = '\u{E021}';

/// Shared lead-in of both block markers
pub const TFB_MARK: &str = "\u{1}[";
/// Tail of a block-open marker
pub const TFB_OPEN_E: &str = "]\u{2}";
/// Tail of a block-close marker
pub const TFB_CLOSE_E: &str = "]\u{3}";

/// Full open marker for a block id
pub fn block_open_mark(id: &str) -> String {
    format!("{TFB_MARK}{id}{TFB_OPEN_E}")
}

/// Full close marker for a block id
pub fn block_close_mark(id: &str) -> String {
    format!("{TFB_MARK}{id}{TFB_CLOSE_E}")
}

fn is_reserved(c: char) -> bool {
    matches!(c, '\u{1}'..='\u{3}' | '\u{E011}'..='\u{E013}' | '\u{E020}'..='\u{E021}')
}

/// Checks one string for reserved bytes or codepoints.
pub fn check_text(text: &str) -> Result<(), TransfuseError> {
    if let Some(c) = text.chars().find(|c| is_reserved(*c)) {
        return Err(TransfuseError::Parse(format!(
            "document contains reserved sentinel character U+{:04X}",
            c as u32
        )));
    }
    Ok(())
}

/// Walks every text node and attribute value of a parsed document and
/// rejects it if the sentinel alphabet already occurs in it.
pub fn check_document(tree: &Tree) -> Result<(), TransfuseError> {
    let mut pending = vec![tree.root()];
    while let Some(node) = pending.pop() {
        match tree.data(node) {
            NodeData::Text(content) => check_text(content)?,
            NodeData::Element(el) => {
                for attr in &el.attrs {
                    check_text(&attr.1)?;
                }
                pending.extend_from_slice(tree.children(node));
            }
            _ => pending.extend_from_slice(tree.children(node)),
        }
    }
    Ok(())
}
