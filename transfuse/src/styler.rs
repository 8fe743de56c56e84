//! Styling serializer
//!
//! Serializes the element tree to the interim textual form: block
//! structure stays as real markup, inline formatting collapses to
//! private-use delimiters keyed to the style store, and protected
//! regions are wrapped in a literal `<tf-protect>` element for the
//! promotion pass to deal with.
//!
//! Two predicates guard the inline collapse. An inline that is the sole
//! meaningful child of its parent (through chains of inline parents) adds
//! no translator-visible structure and is left as markup. An inline with
//! a block descendant cannot be collapsed without producing ill-formed
//! interim text.

use crate::error::TransfuseError;
use crate::sentinel::{TFI_CLOSE, TFI_OPEN_B, TFI_OPEN_E};
use crate::store::StyleStore;
use crate::tags::TagPolicy;
use crate::tree::{append_xml, NodeData, NodeId, Tree};
use regex::Regex;

/// Per-depth scratch buffers for open/close tag assembly, so a deep walk
/// does not reallocate on every element.
#[derive(Default)]
struct Scratch {
    otag: String,
    ctag: String,
}

struct Styler<'a> {
    tree: &'a Tree,
    tags: &'a TagPolicy,
    store: &'a mut StyleStore,
    space_only: Regex,
    scratch: Vec<Scratch>,
}

/// Serializes `tree` to the interim styled form, cataloguing collapsed
/// inline markup in `store`.
pub fn save_styles(
    tree: &Tree,
    tags: &TagPolicy,
    store: &mut StyleStore,
) -> Result<String, TransfuseError> {
    let mut styler = Styler {
        tree,
        tags,
        store,
        space_only: Regex::new(r"^[\s\p{Zs}]+$")?,
        scratch: Vec::new(),
    };
    let mut out = String::with_capacity(tree.prolog().len() + 256);
    out.push_str(tree.prolog());
    styler.walk(&mut out, tree.root(), 0, false)?;
    out.push_str(tree.epilog());
    Ok(out)
}

impl<'a> Styler<'a> {
    fn walk(
        &mut self,
        out: &mut String,
        node: NodeId,
        depth: usize,
        protect: bool,
    ) -> Result<(), TransfuseError> {
        let tree = self.tree;
        if self.scratch.len() <= depth {
            self.scratch.resize_with(depth + 1, Scratch::default);
        }

        for &child in tree.children(node) {
            let el = match tree.data(child) {
                NodeData::Text(content) => {
                    let raw_parent = tree
                        .parent(child)
                        .map(|p| self.tags.raw.contains(&tree.name(p).to_ascii_lowercase()))
                        .unwrap_or(false);
                    if raw_parent {
                        out.push_str(content);
                    } else {
                        append_xml(out, content, false);
                    }
                    continue;
                }
                NodeData::Element(el) => el,
                _ => continue,
            };

            let lname = el.name.to_ascii_lowercase();
            let mut l_protect = protect || self.tags.is_protected(&lname);
            if tree.attr(child, "tf-protect").is_some() {
                l_protect = true;
            }

            let mut otag = std::mem::take(&mut self.scratch[depth].otag);
            otag.clear();
            otag.push('<');
            otag.push_str(&el.name);
            for (prefix, uri) in &el.ns_decls {
                if prefix.is_empty() {
                    otag.push_str(" xmlns=\"");
                } else {
                    otag.push_str(" xmlns:");
                    otag.push_str(prefix);
                    otag.push_str("=\"");
                }
                append_xml(&mut otag, uri, true);
                otag.push('"');
            }
            for (name, value) in &el.attrs {
                otag.push(' ');
                otag.push_str(name);
                otag.push_str("=\"");
                append_xml(&mut otag, value, true);
                otag.push('"');
            }

            if tree.children(child).is_empty() {
                otag.push_str("/>");
                if self.tags.prot_inline.contains(&lname) && !protect {
                    out.push_str("<tf-protect>");
                    out.push_str(&otag);
                    out.push_str("</tf-protect>");
                } else {
                    out.push_str(&otag);
                }
                self.scratch[depth].otag = otag;
                continue;
            }
            otag.push('>');

            let mut ctag = std::mem::take(&mut self.scratch[depth].ctag);
            ctag.clear();
            ctag.push_str("</");
            ctag.push_str(&el.name);
            ctag.push('>');

            if self.tags.prot_inline.contains(&lname) && !protect {
                out.push_str("<tf-protect>");
                out.push_str(&otag);
                self.walk(out, child, depth + 1, true)?;
                out.push_str(&ctag);
                out.push_str("</tf-protect>");
            } else if !l_protect
                && self.tags.inline_tags.contains(&lname)
                && !self.first_child_protected(child)
                && !self.is_only_child(child)
                && !self.has_block_child(child)
            {
                let kind = local_name(&el.name).to_ascii_lowercase();
                let id = self.store.style_put(&kind, &otag, &ctag)?;
                out.push(TFI_OPEN_B);
                out.push_str(&kind);
                out.push(':');
                out.push_str(&id);
                out.push(TFI_OPEN_E);
                self.walk(out, child, depth + 1, false)?;
                out.push(TFI_CLOSE);
            } else {
                out.push_str(&otag);
                self.walk(out, child, depth + 1, l_protect)?;
                out.push_str(&ctag);
            }

            self.scratch[depth].otag = otag;
            self.scratch[depth].ctag = ctag;
        }
        Ok(())
    }

    fn first_child_protected(&self, node: NodeId) -> bool {
        self.tree
            .first_child(node)
            .map(|fc| {
                let lname = self.tree.name(fc).to_ascii_lowercase();
                !lname.is_empty() && self.tags.is_protected(&lname)
            })
            .unwrap_or(false)
    }

    /// Whether `node` is the sole meaningful child of its parent,
    /// looking through chains of inline parents and ignoring
    /// whitespace-only text siblings at the edges.
    fn is_only_child(&self, node: NodeId) -> bool {
        let tree = self.tree;
        let Some(parent) = tree.parent(node) else {
            return true;
        };
        let kids = tree.children(parent);

        let is_space = |id: NodeId| {
            tree.text(id)
                .map(|t| self.space_only.is_match(t))
                .unwrap_or(false)
        };
        let first_ok = kids.first() == Some(&node)
            || (kids.get(1) == Some(&node) && is_space(kids[0]));
        let last_ok = kids.last() == Some(&node)
            || (kids.len() >= 2 && kids[kids.len() - 2] == node && is_space(kids[kids.len() - 1]));

        if first_ok && last_ok {
            let pname = tree.name(parent).to_ascii_lowercase();
            if self.tags.inline_tags.contains(&pname) {
                return self.is_only_child(parent);
            }
        }
        first_ok && last_ok
    }

    /// Whether any descendant element is neither inline nor
    /// protected-inline.
    fn has_block_child(&self, node: NodeId) -> bool {
        let tree = self.tree;
        for &cn in tree.children(node) {
            if !tree.is_element(cn) {
                continue;
            }
            let lname = tree.name(cn).to_ascii_lowercase();
            if !(self.tags.inline_tags.contains(&lname) || self.tags.prot_inline.contains(&lname))
                || self.has_block_child(cn)
            {
                return true;
            }
        }
        false
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Promotes protected inlines sitting in running text to style
/// attachments on the neighboring token or inline, so the literal
/// `<tf-protect>` wrappers do not break the translator's tokenization.
///
/// Protections at a block edge stay in place. The pass iterates until a
/// sweep finds no protection left, with a fixed bound against
/// pathological inputs; realistic documents converge in a few sweeps.
pub fn protect_to_styles(
    styled: &mut String,
    store: &mut StyleStore,
) -> Result<(), TransfuseError> {
    // Merge protected regions separated only by whitespace
    let rx_merge = Regex::new(r"</tf-protect>([\s\r\n\p{Z}]*)<tf-protect>")?;
    *styled = rx_merge.replace_all(styled, "$1").into_owned();

    let rx_prots = Regex::new(r"(?s)<tf-protect>(.*?)</tf-protect>")?;
    let rx_block_start = Regex::new(r">[\s\p{Zs}]*$")?;
    let rx_block_end = Regex::new(r"^[\s\p{Zs}]*<")?;
    let rx_pfx_style = Regex::new(&format!(r"{TFI_CLOSE}[\s\p{{Zs}}]*$"))?;
    let rx_pfx_token = Regex::new(&format!(r"[^>\s\p{{Z}}{TFI_OPEN_E}]+[\s\p{{Zs}}]*$"))?;
    let rx_ifx_start = Regex::new(&format!(
        r"({TFI_OPEN_B}[^{TFI_OPEN_E}]+{TFI_OPEN_E})[\s\p{{Zs}}]*$"
    ))?;

    for _ in 0..100 {
        let mut ns = String::with_capacity(styled.len());
        let mut last = 0usize;
        let mut matched = false;

        while let Some(caps) = rx_prots.captures_at(styled, last) {
            let m0 = caps.get(0).unwrap();
            ns.push_str(&styled[last..m0.start()]);
            let body = caps.get(1).unwrap().as_str();
            last = m0.end();
            matched = true;

            // At the beginning or end of a block tag the protection can
            // stand as-is
            if rx_block_start.is_match(&ns) || rx_block_end.is_match(&styled[last..]) {
                ns.push_str(body);
                continue;
            }

            if let Some(ic) = rx_ifx_start.captures(&ns) {
                // Right after an inline open: wrap the whole inline body
                let id = store.style_put("P", body, "")?;
                let open_end = ic.get(1).unwrap().end();
                let tail = ns[open_end..].to_string();
                ns.truncate(open_end);
                push_style_head(&mut ns, &id);
                ns.push_str(&tail);
                match styled[last..].find(TFI_CLOSE) {
                    Some(off) => {
                        ns.push_str(&styled[last..last + off]);
                        ns.push(TFI_CLOSE);
                        last += off;
                    }
                    None => ns.push(TFI_CLOSE),
                }
                continue;
            }

            if rx_pfx_style.is_match(&ns) {
                // Right after an inline close: wrap the preceding style
                let id = store.style_put("P", "", body)?;
                if let Some(pos) = ns.rfind(TFI_OPEN_B) {
                    let tail = ns[pos..].to_string();
                    ns.truncate(pos);
                    push_style_head(&mut ns, &id);
                    ns.push_str(&tail);
                } else {
                    push_style_head(&mut ns, &id);
                }
                ns.push(TFI_CLOSE);
                continue;
            }

            if let Some(m) = rx_pfx_token.find(&ns) {
                // Wrap the immediately preceding token
                let id = store.style_put("P", "", body)?;
                let tail = ns[m.start()..].to_string();
                ns.truncate(m.start());
                push_style_head(&mut ns, &id);
                ns.push_str(&tail);
                ns.push(TFI_CLOSE);
                continue;
            }

            // No usable anchor; leave the content in place
            ns.push_str(body);
        }

        if !matched {
            break;
        }
        ns.push_str(&styled[last..]);
        *styled = ns;
    }
    Ok(())
}

fn push_style_head(ns: &mut String, id: &str) {
    ns.push(TFI_OPEN_B);
    ns.push_str("P:");
    ns.push_str(id);
    ns.push(TFI_OPEN_E);
}
