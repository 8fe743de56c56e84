//! Block extraction
//!
//! Walks the styled tree, emits every translatable text run to the output
//! stream, and replaces it in place with unique sentinel markers the
//! injector can later search for. The original value stays between the
//! markers so a block the translator drops falls back to its source text.

use crate::error::TransfuseError;
use crate::sentinel::{block_close_mark, block_open_mark};
use crate::store::short_hash;
use crate::stream::StreamCodec;
use crate::tags::TagPolicy;
use crate::tree::{NodeId, Tree};
use regex::Regex;

struct Extractor<'a> {
    tags: &'a TagPolicy,
    codec: &'a dyn StreamCodec,
    any_alnum: Regex,
    blocks: u32,
}

/// Extracts translatable blocks from `tree` into the stream `out`,
/// replacing them with sentinel markers. Returns the number of blocks
/// emitted.
pub fn extract_blocks(
    tree: &mut Tree,
    tags: &TagPolicy,
    codec: &dyn StreamCodec,
    out: &mut String,
) -> Result<u32, TransfuseError> {
    let mut extractor = Extractor {
        tags,
        codec,
        any_alnum: Regex::new(r"[\w\p{L}\p{N}\p{M}]")?,
        blocks: 0,
    };
    let root = tree.root();
    let txt = tags.parents_allow.is_empty();
    extractor.walk(tree, out, root, txt);
    Ok(extractor.blocks)
}

impl<'a> Extractor<'a> {
    fn next_id(&mut self, value: &str) -> String {
        self.blocks += 1;
        format!("{}-{}", self.blocks, short_hash(value))
    }

    fn emit(&mut self, out: &mut String, value: &str) -> String {
        let bid = self.next_id(value);
        self.codec.block_open(out, &bid);
        self.codec.block_body(out, value);
        self.codec.block_close(out, &bid);
        format!(
            "{}{}{}",
            block_open_mark(&bid),
            value,
            block_close_mark(&bid)
        )
    }

    fn walk(&mut self, tree: &mut Tree, out: &mut String, node: NodeId, txt: bool) {
        let kids = tree.children(node).to_vec();
        for child in kids {
            let lname = tree.name(child).to_ascii_lowercase();
            if self.tags.is_protected(&lname) {
                continue;
            }

            if tree.is_element(child) {
                // Textual attributes are extracted regardless of the
                // text-parent gates
                let attr_names: Vec<String> = tree
                    .element(child)
                    .map(|el| {
                        el.attrs
                            .iter()
                            .map(|(name, _)| name.clone())
                            .filter(|name| {
                                self.tags.text_attrs.contains(&name.to_ascii_lowercase())
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                for name in attr_names {
                    let Some(value) = tree.attr(child, &name).map(ToOwned::to_owned) else {
                        continue;
                    };
                    if !self.any_alnum.is_match(&value) {
                        continue;
                    }
                    let wrapped = self.emit(out, &value);
                    tree.set_attr(child, &name, &wrapped);
                }
            }

            if self.tags.parents_allow.contains(&lname) {
                self.walk(tree, out, child, true);
            } else if tree.is_element(child) {
                self.walk(tree, out, child, txt);
            } else if let Some(content) = tree.text(child).map(ToOwned::to_owned) {
                if content.is_empty() || !txt {
                    continue;
                }
                let Some(parent) = tree.parent(child) else {
                    continue;
                };
                if tree.attr(parent, "tf-protect").is_some() {
                    continue;
                }
                let pname = tree.name(parent).to_ascii_lowercase();
                if !self.tags.parents_direct.is_empty()
                    && !self.tags.parents_direct.contains(&pname)
                {
                    continue;
                }
                if !self.any_alnum.is_match(&content) {
                    continue;
                }
                let wrapped = self.emit(out, &content);
                tree.set_text(child, &wrapped);
            }
        }
    }
}
