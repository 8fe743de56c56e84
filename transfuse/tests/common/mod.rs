//! Shared helpers for the pipeline tests: temporary projects, an
//! extraction/injection harness, and a stand-in translator that rewrites
//! block bodies the way a real pipeline would.

#![allow(dead_code)]

use std::io::Cursor;
use tempfile::TempDir;
use transfuse::stream::{LineStream, StreamCodec};
use transfuse::{
    extract, inject, ExtractOptions, InjectOptions, Injected, Project, StreamVariant, TagPolicy,
    Tree,
};

/// A throwaway project directory that lives for one test.
pub struct Fixture {
    pub dir: TempDir,
    pub project: Project,
}

pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp project dir");
    let project = Project::create(dir.path()).expect("project");
    Fixture { dir, project }
}

/// An HTML-ish tag policy, enough for the scenarios in these tests.
pub fn html_tags() -> TagPolicy {
    TagPolicy {
        inline_tags: ["a", "b", "em", "i", "strong", "sub", "sup", "u"]
            .into_iter()
            .collect(),
        prot: ["script", "style"].into_iter().collect(),
        prot_inline: ["br", "img", "wbr"].into_iter().collect(),
        raw: ["script", "style"].into_iter().collect(),
        text_attrs: ["alt", "title"].into_iter().collect(),
        ..Default::default()
    }
}

/// Runs the extraction pipeline over `src`, returning the block stream.
pub fn extract_doc(fix: &Fixture, src: &str, tags: &TagPolicy) -> String {
    extract_doc_with(fix, src, tags, StreamVariant::Line)
}

pub fn extract_doc_with(
    fix: &Fixture,
    src: &str,
    tags: &TagPolicy,
    variant: StreamVariant,
) -> String {
    fix.project.save_original(src.as_bytes()).expect("original");
    let mut tree = Tree::parse(src).expect("source document");
    let mut out = String::new();
    extract(
        &mut tree,
        &fix.project,
        &ExtractOptions {
            format: "xml".to_string(),
            variant,
            tags: tags.clone(),
        },
        &mut out,
    )
    .expect("extract");
    out
}

/// Feeds a stream to the injector, sniffing the project directory and
/// wire format from the header.
pub fn inject_stream(stream_text: &str, tags: &TagPolicy) -> Injected {
    let mut input = Cursor::new(stream_text.as_bytes().to_vec());
    inject(
        &mut input,
        &InjectOptions {
            dir: None,
            variant: StreamVariant::Detect,
            tags: tags.clone(),
        },
    )
    .expect("inject")
}

/// Rewrites every block body through `translate`, passing chatter lines
/// through untouched. Returning `None` drops the block, the way a lossy
/// translator would.
pub fn translate_blocks(
    stream_text: &str,
    translate: impl Fn(&str, &str) -> Option<String>,
) -> String {
    let codec = LineStream;
    let mut input = Cursor::new(stream_text.as_bytes().to_vec());
    let mut out = String::new();
    let mut body = String::new();
    let mut id = String::new();
    while codec
        .get_block(&mut input, &mut body, &mut id)
        .expect("stream unit")
    {
        if id.is_empty() {
            out.push_str(&body);
            continue;
        }
        let trimmed = body.trim_end_matches('\n');
        if let Some(translated) = translate(&id, trimmed) {
            codec.block_open(&mut out, &id);
            codec.block_body(&mut out, &translated);
            codec.block_close(&mut out, &id);
        }
    }
    out
}
