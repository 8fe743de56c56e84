//! Extraction pipeline
//!
//! One extract call takes a parsed document from a format adapter and
//! produces the three artifacts a later injection needs: the stream of
//! translatable blocks, the interim `content.xml` with sentinel markers,
//! and the populated style store. The adapter keeps ownership of
//! container handling and pre-normalization; this is purely the styling
//! and block stage.

use crate::blocks::extract_blocks;
use crate::cleanup::cleanup_styles;
use crate::error::TransfuseError;
use crate::project::Project;
use crate::sentinel;
use crate::spaces::save_spaces;
use crate::stream::StreamVariant;
use crate::styler::{protect_to_styles, save_styles};
use crate::tags::TagPolicy;
use crate::tree::Tree;
use log::debug;

/// Options for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Format name recorded in the store, reported back at injection
    pub format: String,
    /// Wire format for the block stream; must not be `Detect`
    pub variant: StreamVariant,
    /// The format adapter's tag policy tables
    pub tags: TagPolicy,
}

/// Runs the extraction pipeline over `tree`, writing the block stream to
/// `out` and the interim artifacts into `project`. Returns the number of
/// blocks emitted.
pub fn extract(
    tree: &mut Tree,
    project: &Project,
    opts: &ExtractOptions,
    out: &mut String,
) -> Result<u32, TransfuseError> {
    sentinel::check_document(tree)?;
    let codec = opts.variant.codec()?;

    let mut store = project.open_store()?;
    store.begin()?;
    store.set_format(&opts.format)?;

    save_spaces(tree, &opts.tags)?;
    let mut styled = save_styles(tree, &opts.tags, &mut store)?;
    protect_to_styles(&mut styled, &mut store)?;
    cleanup_styles(&mut styled)?;
    project.save_styled(&styled)?;

    let mut interim = Tree::parse(&styled).map_err(|e| {
        TransfuseError::Parse(format!("could not parse styled document: {e}"))
    })?;

    codec.header(out, project.dir());
    let blocks = extract_blocks(&mut interim, &opts.tags, codec.as_ref(), out)?;
    project.save_content(&interim.to_xml_full())?;

    store.commit()?;
    debug!(
        "extracted {blocks} blocks into {}",
        project.dir().display()
    );
    Ok(blocks)
}
