//! Styling scenarios: what the translator actually sees in the stream.

mod common;

use common::{extract_doc, fixture, html_tags, inject_stream};
use once_cell::sync::Lazy;
use regex::Regex;
use transfuse::sentinel::{TFI_CLOSE, TFI_OPEN_B, TFI_OPEN_E};

/// Matches one inline span in interim text, capturing kind, id and body.
static INLINE_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "{TFI_OPEN_B}([^{TFI_OPEN_E}:]+):([^{TFI_OPEN_E}:]+){TFI_OPEN_E}([^{TFI_OPEN_B}-{TFI_CLOSE}]*){TFI_CLOSE}"
    ))
    .unwrap()
});

/// The block bodies of a line-variant stream, in order.
fn bodies(stream: &str) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut lines = stream.lines();
    while let Some(line) = lines.next() {
        if line.starts_with("[tf-block:") {
            let mut body = String::new();
            for body_line in lines.by_ref() {
                if body_line.starts_with("[/tf-block:") {
                    break;
                }
                body.push_str(body_line);
            }
            bodies.push(body);
        }
    }
    bodies
}

#[test]
fn plain_inline_yields_one_block_with_delimiters() {
    let fix = fixture();
    let stream = extract_doc(&fix, "<p>Hello <b>bold</b> world</p>", &html_tags());

    let bodies = bodies(&stream);
    assert_eq!(bodies.len(), 1);
    let caps = INLINE_SPAN.captures(&bodies[0]).expect("inline span");
    assert_eq!(&caps[1], "b");
    assert_eq!(&caps[3], "bold");
    assert!(bodies[0].starts_with("Hello "));
    assert!(bodies[0].ends_with(" world"));
}

#[test]
fn only_child_inline_is_not_collapsed() {
    let fix = fixture();
    let stream = extract_doc(&fix, "<p><i>a <b>bc</b> d</i></p>", &html_tags());

    // i adds no translator-visible structure and stays as markup in the
    // interim document, so the block is the text under i with only b
    // collapsed
    let bodies = bodies(&stream);
    assert_eq!(bodies.len(), 1);
    let caps = INLINE_SPAN.captures(&bodies[0]).expect("inline span");
    assert_eq!(&caps[1], "b");
    assert_eq!(&caps[3], "bc");
    assert!(!bodies[0].contains("<i>"));

    let injected = inject_stream(&stream, &html_tags());
    assert_eq!(injected.tree.to_xml(), "<p><i>a <b>bc</b> d</i></p>");
}

#[test]
fn protected_inline_is_promoted_onto_a_token() {
    let src = "<p>foo<br/>bar</p>";
    let fix = fixture();
    let stream = extract_doc(&fix, src, &html_tags());

    let bodies = bodies(&stream);
    assert_eq!(bodies.len(), 1);
    let caps = INLINE_SPAN.captures(&bodies[0]).expect("promoted span");
    assert_eq!(&caps[1], "P");
    assert_eq!(&caps[3], "foo");
    assert!(bodies[0].ends_with("bar"));
    assert!(!bodies[0].contains("tf-protect"));
    assert!(!bodies[0].contains("<br"));

    let injected = inject_stream(&stream, &html_tags());
    assert_eq!(injected.tree.to_xml(), src);
}

#[test]
fn whitespace_moves_out_of_inline_spans() {
    let src = "<p>a <b> c </b> d</p>";
    let fix = fixture();
    let stream = extract_doc(&fix, src, &html_tags());

    let bodies = bodies(&stream);
    assert_eq!(bodies.len(), 1);
    let caps = INLINE_SPAN.captures(&bodies[0]).expect("inline span");
    assert_eq!(&caps[3], "c", "span body is bare after cleanup");

    let injected = inject_stream(&stream, &html_tags());
    assert_eq!(injected.tree.to_xml(), src);
}

#[test]
fn protected_subtree_is_not_streamed() {
    let src = "<doc><script>go()</script><p>text</p></doc>";
    let fix = fixture();
    let stream = extract_doc(&fix, src, &html_tags());

    let bodies = bodies(&stream);
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0], "text");
}

#[test]
fn document_with_reserved_codepoints_is_rejected() {
    let fix = fixture();
    fix.project.save_original(b"x").unwrap();
    let mut tree = transfuse::Tree::parse("<p>bad \u{E011}</p>").unwrap();
    let mut out = String::new();
    let result = transfuse::extract(
        &mut tree,
        &fix.project,
        &transfuse::ExtractOptions {
            format: "xml".to_string(),
            variant: transfuse::StreamVariant::Line,
            tags: html_tags(),
        },
        &mut out,
    );
    assert!(result.is_err());
}
