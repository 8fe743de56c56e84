//! Whitespace preservation
//!
//! Translators routinely collapse or strip whitespace, so before a
//! document's text is handed off, every whitespace run that matters is
//! recorded as a `tf-space-*` sidecar attribute on a nearby anchor: the
//! parent for runs at the edge of an element, a sibling for runs between
//! elements. After injection the attributes are folded back into the text
//! and consumed, and any leftover annotation materializes as a new text
//! node at the position implied by its name.

use crate::error::TransfuseError;
use crate::tags::TagPolicy;
use crate::tree::{NodeId, Tree};
use regex::Regex;

/// Regexes shared by the save and restore walks. Compiled on entry,
/// dropped on exit; a compilation failure is fatal.
pub(crate) struct SpaceRx {
    pub blank_only: Regex,
    pub blank_head: Regex,
    pub blank_tail: Regex,
}

impl SpaceRx {
    pub fn new() -> Result<SpaceRx, TransfuseError> {
        Ok(SpaceRx {
            blank_only: Regex::new(r"^[\s\r\n\p{Z}]+$")?,
            blank_head: Regex::new(r"^[\s\r\n\p{Z}]+")?,
            blank_tail: Regex::new(r"[\s\r\n\p{Z}]+$")?,
        })
    }

    /// `text` with its leading whitespace run removed.
    pub fn ltrim<'a>(&self, text: &'a str) -> &'a str {
        match self.blank_head.find(text) {
            Some(m) => &text[m.end()..],
            None => text,
        }
    }

    /// `text` with its trailing whitespace run removed.
    pub fn rtrim<'a>(&self, text: &'a str) -> &'a str {
        match self.blank_tail.find(text) {
            Some(m) => &text[..m.start()],
            None => text,
        }
    }
}

/// Records whitespace around and inside elements as sidecar attributes.
///
/// Text content itself is not modified; the text will be replaced by
/// block sentinels later, and the sidecars are what survives.
pub fn save_spaces(tree: &mut Tree, tags: &TagPolicy) -> Result<(), TransfuseError> {
    let rx = SpaceRx::new()?;
    walk_save(tree, tags, &rx, tree.root());
    Ok(())
}

fn walk_save(tree: &mut Tree, tags: &TagPolicy, rx: &SpaceRx, node: NodeId) {
    let kids = tree.children(node).to_vec();
    for child in kids {
        let lname = tree.name(child).to_ascii_lowercase();
        if tags.is_protected(&lname) {
            continue;
        }
        if !tree.is_text(child) {
            walk_save(tree, tags, rx, child);
            continue;
        }
        let Some(parent) = tree.parent(child) else {
            continue;
        };
        let content = match tree.text(child) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => continue,
        };

        if rx.blank_only.is_match(&content) {
            let prev = tree.prev_sibling(child);
            let next = tree.next_sibling(child);
            if prev.is_none() {
                tree.set_attr(parent, "tf-space-prefix", &content);
            } else if next.is_none() {
                tree.set_attr(parent, "tf-space-suffix", &content);
            } else if let Some(anchor) = prev.filter(|p| tree.is_element(*p)) {
                tree.set_attr(anchor, "tf-space-after", &content);
            } else if let Some(anchor) = next.filter(|n| tree.is_element(*n)) {
                tree.set_attr(anchor, "tf-space-before", &content);
            }
            // A whole-whitespace node needs no leading/trailing analysis
            continue;
        }

        if let Some(m) = rx.blank_head.find(&content) {
            let run = &content[..m.end()];
            match tree.prev_sibling(child) {
                Some(prev) => {
                    if tree.is_element(prev) {
                        tree.set_attr(prev, "tf-space-after", run);
                    }
                }
                None => tree.set_attr(parent, "tf-space-prefix", run),
            }
        }

        if let Some(m) = rx.blank_tail.find(&content) {
            let run = &content[m.start()..];
            match tree.next_sibling(child) {
                Some(next) => {
                    if tree.is_element(next) {
                        tree.set_attr(next, "tf-space-before", run);
                    }
                }
                None => tree.set_attr(parent, "tf-space-suffix", run),
            }
        }
    }
}

/// Folds saved whitespace back into the document.
///
/// Runs two passes: first the saved runs are spliced into adjacent text
/// nodes, replacing whatever whitespace the translator left on the side
/// being restored; then any annotation without an adjacent text node
/// becomes a new text node of its own. Every sidecar attribute is
/// consumed on use, so a clean round-trip leaves none behind.
pub fn restore_spaces(tree: &mut Tree, tags: &TagPolicy) -> Result<(), TransfuseError> {
    let rx = SpaceRx::new()?;
    walk_restore(tree, tags, &rx, tree.root());
    walk_create(tree, tags, tree.root());
    Ok(())
}

fn walk_restore(tree: &mut Tree, tags: &TagPolicy, rx: &SpaceRx, node: NodeId) {
    let kids = tree.children(node).to_vec();
    for child in kids {
        let lname = tree.name(child).to_ascii_lowercase();
        if tags.is_protected(&lname) {
            continue;
        }
        if !tree.is_text(child) {
            walk_restore(tree, tags, rx, child);
            continue;
        }
        let Some(parent) = tree.parent(child) else {
            continue;
        };

        if let Some(prev) = tree.prev_sibling(child) {
            if let Some(ws) = tree.take_attr(prev, "tf-space-after") {
                let content = tree.text(child).unwrap_or("").to_string();
                let merged = format!("{ws}{}", rx.ltrim(&content));
                tree.set_text(child, &merged);
            }
        }
        if tree.first_child(parent) == Some(child) {
            if let Some(ws) = tree.take_attr(parent, "tf-space-prefix") {
                let content = tree.text(child).unwrap_or("").to_string();
                let merged = format!("{ws}{}", rx.ltrim(&content));
                tree.set_text(child, &merged);
            }
        }
        if let Some(next) = tree.next_sibling(child) {
            if let Some(ws) = tree.take_attr(next, "tf-space-before") {
                let content = tree.text(child).unwrap_or("").to_string();
                let merged = format!("{}{ws}", rx.rtrim(&content));
                tree.set_text(child, &merged);
            }
        }
        if tree.last_child(parent) == Some(child) {
            if let Some(ws) = tree.take_attr(parent, "tf-space-suffix") {
                let content = tree.text(child).unwrap_or("").to_string();
                let merged = format!("{}{ws}", rx.rtrim(&content));
                tree.set_text(child, &merged);
            }
        }
    }
}

fn walk_create(tree: &mut Tree, tags: &TagPolicy, node: NodeId) {
    let kids = tree.children(node).to_vec();
    for child in kids {
        let lname = tree.name(child).to_ascii_lowercase();
        if tags.is_protected(&lname) {
            continue;
        }
        if !tree.is_element(child) {
            continue;
        }
        walk_create(tree, tags, child);

        if let Some(ws) = tree.take_attr(child, "tf-space-after") {
            tree.insert_text_after(child, &ws);
        }
        if let Some(ws) = tree.take_attr(child, "tf-space-prefix") {
            tree.prepend_text_child(child, &ws);
        }
        if let Some(ws) = tree.take_attr(child, "tf-space-before") {
            tree.insert_text_before(child, &ws);
        }
        if let Some(ws) = tree.take_attr(child, "tf-space-suffix") {
            tree.append_text_child(child, &ws);
        }
    }
}
