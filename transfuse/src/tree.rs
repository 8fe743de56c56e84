//! Mutable element tree
//!
//! The engine owns a small arena tree: nodes are stored in one vector and
//! addressed by index, so parent and sibling links never form ownership
//! cycles. Parsing is delegated to roxmltree; the resulting read-only
//! document is copied into the arena with qualified names and namespace
//! declarations resolved to plain strings, after which the tree is
//! self-contained and freely mutable.
//!
//! Serialization has two modes. The full mode keeps `tf-` sidecar
//! attributes and is used for the interim `content.xml`. The clean mode is
//! the default: it strips every `tf-` attribute and unwraps every `tf-`
//! element, so no sidecar name can reach a final document.

use crate::error::TransfuseError;
use roxmltree::NodeType;

/// Index of a node in its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// An element: qualified name, namespace declarations, ordered attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Name as written in the source, including any namespace prefix
    pub name: String,
    /// Namespace declarations introduced on this element: (prefix, uri),
    /// with an empty prefix for the default namespace
    pub ns_decls: Vec<(String, String)>,
    /// Attributes in document order: (qualified name, value)
    pub attrs: Vec<(String, String)>,
}

/// Payload of one tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Synthetic document node above the root element
    Root,
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A mutable ordered document tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    /// Source bytes before the root element (XML declaration, doctype)
    prolog: String,
    /// Source bytes after the root element (usually a trailing newline)
    epilog: String,
}

impl Tree {
    /// Creates an empty tree holding only the document node.
    pub fn new() -> Tree {
        Tree {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Root,
            }],
            prolog: String::new(),
            epilog: String::new(),
        }
    }

    /// Parses an XML document into a fresh tree.
    ///
    /// Internal DTD subsets are tolerated; the prolog and epilog around
    /// the root element are kept verbatim for re-emission. Processing
    /// instructions inside the body are dropped.
    pub fn parse(src: &str) -> Result<Tree, TransfuseError> {
        let opts = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = roxmltree::Document::parse_with_options(src, opts)?;
        let root_el = doc.root_element();
        let range = root_el.range();

        let mut tree = Tree::new();
        tree.prolog = src[..range.start].to_string();
        tree.epilog = src[range.end..].to_string();

        // Only the root element subtree lives in the arena; anything
        // before or after it is carried verbatim in prolog and epilog
        let root = tree.root();
        let el = Element {
            name: qualified_name(root_el),
            ns_decls: introduced_ns(root_el),
            attrs: root_el
                .attributes()
                .map(|a| (qualified_attr_name(root_el, &a), a.value().to_string()))
                .collect(),
        };
        let root_id = tree.push_element(root, el);
        copy_into(&mut tree, root_id, root_el);
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Source bytes preceding the root element.
    pub fn prolog(&self) -> &str {
        &self.prolog
    }

    /// Source bytes following the root element.
    pub fn epilog(&self) -> &str {
        &self.epilog
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].data, NodeData::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].data, NodeData::Text(_))
    }

    /// Qualified element name, or an empty string for non-elements.
    pub fn name(&self, id: NodeId) -> &str {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => &el.name,
            _ => "",
        }
    }

    /// Content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(content) => Some(content),
            _ => None,
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.last().copied()
    }

    fn position(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.nodes[id.0].parent?;
        let pos = self.nodes[parent.0].children.iter().position(|c| *c == id)?;
        Some((parent, pos))
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, pos) = self.position(id)?;
        if pos == 0 {
            None
        } else {
            Some(self.nodes[parent.0].children[pos - 1])
        }
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, pos) = self.position(id)?;
        self.nodes[parent.0].children.get(pos + 1).copied()
    }

    /// Replaces the content of a text node. Other node kinds are left
    /// untouched.
    pub fn set_text(&mut self, id: NodeId, content: &str) {
        if let NodeData::Text(t) = &mut self.nodes[id.0].data {
            t.clear();
            t.push_str(content);
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => el
                .attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Sets an attribute, replacing an existing one of the same name.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element(el) = &mut self.nodes[id.0].data {
            if let Some(slot) = el.attrs.iter_mut().find(|(k, _)| k == name) {
                slot.1 = value.to_string();
            } else {
                el.attrs.push((name.to_string(), value.to_string()));
            }
        }
    }

    /// Removes an attribute and returns its value.
    pub fn take_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        if let NodeData::Element(el) = &mut self.nodes[id.0].data {
            let pos = el.attrs.iter().position(|(k, _)| k == name)?;
            return Some(el.attrs.remove(pos).1);
        }
        None
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn push_element(&mut self, parent: NodeId, el: Element) -> NodeId {
        self.push(parent, NodeData::Element(el))
    }

    pub fn push_text(&mut self, parent: NodeId, content: &str) -> NodeId {
        self.push(parent, NodeData::Text(content.to_string()))
    }

    fn insert_at(&mut self, parent: NodeId, pos: usize, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent.0].children.insert(pos, id);
        id
    }

    /// Inserts a new text node immediately before `sibling`.
    pub fn insert_text_before(&mut self, sibling: NodeId, content: &str) -> Option<NodeId> {
        let (parent, pos) = self.position(sibling)?;
        Some(self.insert_at(parent, pos, NodeData::Text(content.to_string())))
    }

    /// Inserts a new text node immediately after `sibling`.
    pub fn insert_text_after(&mut self, sibling: NodeId, content: &str) -> Option<NodeId> {
        let (parent, pos) = self.position(sibling)?;
        Some(self.insert_at(parent, pos + 1, NodeData::Text(content.to_string())))
    }

    /// Inserts a new text node as the first child of `parent`.
    pub fn prepend_text_child(&mut self, parent: NodeId, content: &str) -> NodeId {
        self.insert_at(parent, 0, NodeData::Text(content.to_string()))
    }

    /// Appends a new text node as the last child of `parent`.
    pub fn append_text_child(&mut self, parent: NodeId, content: &str) -> NodeId {
        self.push(parent, NodeData::Text(content.to_string()))
    }

    /// Serializes with `tf-` attributes stripped and `tf-` elements
    /// unwrapped.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.prolog.len() + self.nodes.len() * 16);
        out.push_str(&self.prolog);
        for child in self.children(self.root()) {
            self.write_node(&mut out, *child, false);
        }
        out.push_str(&self.epilog);
        out
    }

    /// Serializes keeping `tf-` names, for the interim document.
    pub fn to_xml_full(&self) -> String {
        let mut out = String::with_capacity(self.prolog.len() + self.nodes.len() * 16);
        out.push_str(&self.prolog);
        for child in self.children(self.root()) {
            self.write_node(&mut out, *child, true);
        }
        out.push_str(&self.epilog);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId, keep_tf: bool) {
        match &self.nodes[id.0].data {
            NodeData::Root => {}
            NodeData::Text(content) => append_xml(out, content, false),
            NodeData::Comment(content) => {
                out.push_str("<!--");
                out.push_str(content);
                out.push_str("-->");
            }
            NodeData::Element(el) => {
                if !keep_tf && el.name.starts_with("tf-") {
                    for child in &self.nodes[id.0].children {
                        self.write_node(out, *child, keep_tf);
                    }
                    return;
                }
                out.push('<');
                out.push_str(&el.name);
                for (prefix, uri) in &el.ns_decls {
                    if prefix.is_empty() {
                        out.push_str(" xmlns=\"");
                    } else {
                        out.push_str(" xmlns:");
                        out.push_str(prefix);
                        out.push_str("=\"");
                    }
                    append_xml(out, uri, true);
                    out.push('"');
                }
                for (name, value) in &el.attrs {
                    if !keep_tf && name.starts_with("tf-") {
                        continue;
                    }
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    append_xml(out, value, true);
                    out.push('"');
                }
                if self.nodes[id.0].children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for child in &self.nodes[id.0].children {
                        self.write_node(out, *child, keep_tf);
                    }
                    out.push_str("</");
                    out.push_str(&el.name);
                    out.push('>');
                }
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

/// Appends `text` to `out` with XML entity escaping. Attribute values
/// additionally escape the double quote, and literal whitespace becomes
/// character references so attribute-value normalization cannot mangle
/// saved whitespace runs on re-parse.
pub fn append_xml(out: &mut String, text: &str, attr: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            '\n' if attr => out.push_str("&#10;"),
            '\r' if attr => out.push_str("&#13;"),
            '\t' if attr => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
}

fn qualified_name(node: roxmltree::Node) -> String {
    let tag = node.tag_name();
    match tag.namespace() {
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", tag.name()),
            _ => tag.name().to_string(),
        },
        None => tag.name().to_string(),
    }
}

fn qualified_attr_name(node: roxmltree::Node, attr: &roxmltree::Attribute) -> String {
    match attr.namespace() {
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", attr.name()),
            _ => attr.name().to_string(),
        },
        None => attr.name().to_string(),
    }
}

/// Namespace declarations introduced on this element, as opposed to the
/// ones inherited from its ancestors.
fn introduced_ns(node: roxmltree::Node) -> Vec<(String, String)> {
    let inherited: Vec<(String, String)> = node
        .parent_element()
        .map(|p| {
            p.namespaces()
                .map(|n| (n.name().unwrap_or("").to_string(), n.uri().to_string()))
                .collect()
        })
        .unwrap_or_default();
    node.namespaces()
        .map(|n| (n.name().unwrap_or("").to_string(), n.uri().to_string()))
        .filter(|decl| decl.0 != "xml" && !inherited.contains(decl))
        .collect()
}

fn copy_into(tree: &mut Tree, parent: NodeId, node: roxmltree::Node) {
    for child in node.children() {
        match child.node_type() {
            NodeType::Text => {
                tree.push_text(parent, child.text().unwrap_or(""));
            }
            NodeType::Comment => {
                tree.push(
                    parent,
                    NodeData::Comment(child.text().unwrap_or("").to_string()),
                );
            }
            NodeType::Element => {
                let el = Element {
                    name: qualified_name(child),
                    ns_decls: introduced_ns(child),
                    attrs: child
                        .attributes()
                        .map(|a| (qualified_attr_name(child, &a), a.value().to_string()))
                        .collect(),
                };
                let id = tree.push_element(parent, el);
                copy_into(tree, id, child);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_serialize_round_trip() {
        let src = "<p>Hello <b>bold</b> world</p>";
        let tree = Tree::parse(src).unwrap();
        assert_eq!(tree.to_xml(), src);
    }

    #[test]
    fn prolog_and_epilog_survive() {
        let src = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<doc>x</doc>\n";
        let tree = Tree::parse(src).unwrap();
        assert_eq!(tree.to_xml(), src);
    }

    #[test]
    fn entities_are_escaped_on_output() {
        let tree = Tree::parse("<p>a &amp; b &lt; c</p>").unwrap();
        assert_eq!(tree.to_xml(), "<p>a &amp; b &lt; c</p>");
    }

    #[test]
    fn attributes_keep_order_and_escape_quotes() {
        let tree = Tree::parse("<p b=\"2\" a=\"x &quot;y&quot;\"/>").unwrap();
        assert_eq!(tree.to_xml(), "<p b=\"2\" a=\"x &quot;y&quot;\"/>");
    }

    #[test]
    fn namespace_declarations_survive() {
        let src = "<w:document xmlns:w=\"urn:w\"><w:p>text</w:p></w:document>";
        let tree = Tree::parse(src).unwrap();
        assert_eq!(tree.to_xml(), src);
    }

    #[test]
    fn tf_attributes_are_stripped_by_default() {
        let mut tree = Tree::parse("<p>x</p>").unwrap();
        let p = tree.first_child(tree.root()).unwrap();
        tree.set_attr(p, "tf-space-prefix", " ");
        assert_eq!(tree.to_xml(), "<p>x</p>");
        assert_eq!(tree.to_xml_full(), "<p tf-space-prefix=\" \">x</p>");
    }

    #[test]
    fn tf_elements_are_unwrapped_by_default() {
        let tree = Tree::parse("<p><tf-protect><br/></tf-protect>x</p>").unwrap();
        assert_eq!(tree.to_xml(), "<p><br/>x</p>");
    }

    #[test]
    fn attribute_whitespace_survives_reparse() {
        let mut tree = Tree::parse("<p>x</p>").unwrap();
        let p = tree.first_child(tree.root()).unwrap();
        tree.set_attr(p, "tf-space-after", "\n\t");
        let full = tree.to_xml_full();
        assert!(full.contains("&#10;"));
        let again = Tree::parse(&full).unwrap();
        let p2 = again.first_child(again.root()).unwrap();
        assert_eq!(again.attr(p2, "tf-space-after"), Some("\n\t"));
    }

    #[test]
    fn sibling_navigation() {
        let tree = Tree::parse("<p>a<b/>c</p>").unwrap();
        let p = tree.first_child(tree.root()).unwrap();
        let kids = tree.children(p).to_vec();
        assert_eq!(kids.len(), 3);
        assert_eq!(tree.prev_sibling(kids[1]), Some(kids[0]));
        assert_eq!(tree.next_sibling(kids[1]), Some(kids[2]));
        assert_eq!(tree.prev_sibling(kids[0]), None);
        assert_eq!(tree.next_sibling(kids[2]), None);
    }

    #[test]
    fn text_insertion_around_siblings() {
        let mut tree = Tree::parse("<p><b>x</b></p>").unwrap();
        let p = tree.first_child(tree.root()).unwrap();
        let b = tree.first_child(p).unwrap();
        tree.insert_text_before(b, "pre ");
        tree.insert_text_after(b, " post");
        assert_eq!(tree.to_xml(), "<p>pre <b>x</b> post</p>");
    }

    #[test]
    fn take_attr_removes_and_returns() {
        let mut tree = Tree::parse("<p a=\"1\"/>").unwrap();
        let p = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.take_attr(p, "a"), Some("1".to_string()));
        assert_eq!(tree.attr(p, "a"), None);
    }
}
