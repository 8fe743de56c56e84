//! Tag policy tables
//!
//! Format adapters drive the engine with per-format name sets: which
//! elements are inline, which subtrees are opaque, which attribute values
//! are translatable, and so on. All comparisons are case-insensitive with
//! ASCII-lowercase as the canonical form.

use std::collections::HashSet;

/// A case-insensitive set of element or attribute names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSet(HashSet<String>);

impl TagSet {
    pub fn new() -> Self {
        TagSet(HashSet::new())
    }

    /// Membership test. The query must already be lowercased; walkers
    /// lower each name once per node and reuse it across lookups.
    pub fn contains(&self, lower: &str) -> bool {
        self.0.contains(lower)
    }

    pub fn insert(&mut self, name: &str) {
        self.0.insert(name.to_ascii_lowercase());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        TagSet(
            iter.into_iter()
                .map(|s| s.as_ref().to_ascii_lowercase())
                .collect(),
        )
    }
}

/// The policy tables a format adapter supplies to the engine.
///
/// An empty `parents_allow` means text under any parent is translatable.
/// `parents_direct`, when non-empty, additionally restricts extraction to
/// text whose immediate parent is listed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagPolicy {
    /// Character-level formatting carriers, collapsed to inline styles
    pub inline_tags: TagSet,
    /// Subtrees passed through opaque
    pub prot: TagSet,
    /// Markup preserved verbatim but attached to the surrounding text
    pub prot_inline: TagSet,
    /// Text content exempt from entity-escaping
    pub raw: TagSet,
    /// Parents whose text children are translatable
    pub parents_allow: TagSet,
    /// Immediate parents whose text children are translatable
    pub parents_direct: TagSet,
    /// Attribute names whose values are translatable
    pub text_attrs: TagSet,
}

impl TagPolicy {
    /// Whether a subtree rooted at `lower` must be skipped entirely.
    ///
    /// The wrapper element minted by the styler is protected no matter
    /// what the adapter configured.
    pub fn is_protected(&self, lower: &str) -> bool {
        lower == "tf-protect" || self.prot.contains(lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_set_is_case_insensitive_on_build() {
        let set: TagSet = ["B", "i", "SPAN"].into_iter().collect();
        assert!(set.contains("b"));
        assert!(set.contains("i"));
        assert!(set.contains("span"));
        assert!(!set.contains("p"));
    }

    #[test]
    fn protect_wrapper_is_always_protected() {
        let policy = TagPolicy::default();
        assert!(policy.is_protected("tf-protect"));
        assert!(!policy.is_protected("p"));
    }

    #[test]
    fn configured_prot_names_are_protected() {
        let policy = TagPolicy {
            prot: ["script"].into_iter().collect(),
            ..Default::default()
        };
        assert!(policy.is_protected("script"));
    }
}
