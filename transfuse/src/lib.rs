//! Document-translation bridge: styling and block extraction
//!
//! This crate is the core of Transfuse. It takes a rich document's
//! element tree, extracts the translatable text into a flat
//! line-oriented stream that machine-translation pipelines consume,
//! and later re-injects the translated blocks while preserving
//! formatting, whitespace, and everything else that must not change.
//!
//! Architecture
//!
//! The pipeline runs leaves-first. Whitespace that a translator would
//! collapse is recorded as sidecar attributes (spaces). The tree is
//! then serialized to an interim textual form in which inline markup
//! has been swapped for private-use-codepoint delimiters keyed to a
//! persistent style store (styler, store). Protected inlines sitting
//! in running text are promoted onto the neighboring token so they do
//! not break tokenization (styler), and a regex post-pass tightens
//! the inline boundaries (cleanup). Finally the translatable runs are
//! emitted through a stream codec and replaced in the interim
//! document by unique block sentinels (blocks, stream).
//!
//! Injection is the inverse walk: splice translated blocks over the
//! sentinels, expand the inline delimiters from the store, restore
//! whitespace, and hand the tree back to the format adapter.
//!
//! The file structure:
//!
//! - error.rs        - Error enum shared by both pipelines
//! - tree.rs         - Mutable arena element tree
//! - tags.rs         - Per-format tag policy tables
//! - sentinel.rs     - The reserved interim alphabet
//! - spaces.rs       - Whitespace save/restore
//! - styler.rs       - Interim serialization, protect promotion
//! - cleanup.rs      - Interim text normalization
//! - blocks.rs       - Block extraction
//! - store.rs        - Persistent style store
//! - stream/         - Wire formats for the block stream
//! - project.rs      - On-disk project layout
//! - extract.rs      - Extraction pipeline
//! - inject.rs       - Injection pipeline
//!
//! Boundaries
//!
//! Container unpacking, format-specific pre- and post-normalization,
//! and the command-line shell live with the format adapters, not
//! here. An adapter hands this crate a parsed tree plus its tag
//! policy and gets back the stream and project artifacts; on the way
//! back it receives a reconstructed tree to emit however its format
//! requires. The core is single-threaded and synchronous: each call
//! owns its regexes and scratch buffers, and the style store is the
//! only durable state.

pub mod blocks;
pub mod cleanup;
pub mod error;
pub mod extract;
pub mod inject;
pub mod project;
pub mod sentinel;
pub mod spaces;
pub mod store;
pub mod stream;
pub mod styler;
pub mod tags;
pub mod tree;

pub use error::TransfuseError;
pub use extract::{extract, ExtractOptions};
pub use inject::{inject, InjectOptions, Injected};
pub use project::Project;
pub use store::StyleStore;
pub use stream::{StreamCodec, StreamVariant};
pub use tags::{TagPolicy, TagSet};
pub use tree::Tree;
