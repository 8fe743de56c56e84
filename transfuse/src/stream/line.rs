//! Line-markered stream format
//!
//! Blocks are framed by bracket markers on their own lines, the shape
//! bracket-style translation pipelines pass through untouched:
//!
//! ```text
//! [transfuse:/path/to/project]
//! [tf-block:1-Ab3dEf]
//! Block text here.
//! [/tf-block:1-Ab3dEf]
//! ```

use super::{read_line, StreamCodec};
use crate::error::TransfuseError;
use std::io::BufRead;
use std::path::{Path, PathBuf};

pub struct LineStream;

impl StreamCodec for LineStream {
    fn name(&self) -> &str {
        "line"
    }

    fn header(&self, out: &mut String, dir: &Path) {
        out.push_str("[transfuse:");
        out.push_str(&dir.to_string_lossy());
        out.push_str("]\n");
    }

    fn block_open(&self, out: &mut String, id: &str) {
        out.push_str("[tf-block:");
        out.push_str(id);
        out.push_str("]\n");
    }

    fn block_body(&self, out: &mut String, body: &str) {
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
    }

    fn block_close(&self, out: &mut String, id: &str) {
        out.push_str("[/tf-block:");
        out.push_str(id);
        out.push_str("]\n");
    }

    fn get_block(
        &self,
        input: &mut dyn BufRead,
        body: &mut String,
        id: &mut String,
    ) -> Result<bool, TransfuseError> {
        body.clear();
        id.clear();

        let Some(line) = read_line(input)? else {
            return Ok(false);
        };

        let opened = line
            .strip_prefix("[tf-block:")
            .and_then(|rest| rest.strip_suffix(']'));
        let Some(block_id) = opened else {
            // Chatter between blocks is handed back verbatim
            body.push_str(&line);
            body.push('\n');
            return Ok(true);
        };
        id.push_str(block_id);

        let close = format!("[/tf-block:{block_id}]");
        loop {
            let Some(line) = read_line(input)? else {
                return Err(TransfuseError::Stream(format!(
                    "unterminated block {block_id} in input stream"
                )));
            };
            if line == close {
                return Ok(true);
            }
            body.push_str(&line);
            body.push('\n');
        }
    }

    fn get_tmpdir(&self, header: &str) -> Option<PathBuf> {
        let start = header.find("[transfuse:")? + "[transfuse:".len();
        let end = header[start..].find(']')? + start;
        if start == end {
            return None;
        }
        Some(PathBuf::from(&header[start..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn blocks_round_trip() {
        let codec = LineStream;
        let mut out = String::new();
        codec.header(&mut out, Path::new("/tmp/proj"));
        codec.block_open(&mut out, "1-abc");
        codec.block_body(&mut out, "Hello world");
        codec.block_close(&mut out, "1-abc");

        let mut input = Cursor::new(out);
        let mut body = String::new();
        let mut id = String::new();

        // Header line comes back as chatter
        assert!(codec.get_block(&mut input, &mut body, &mut id).unwrap());
        assert!(id.is_empty());
        assert_eq!(body, "[transfuse:/tmp/proj]\n");

        assert!(codec.get_block(&mut input, &mut body, &mut id).unwrap());
        assert_eq!(id, "1-abc");
        assert_eq!(body, "Hello world\n");

        assert!(!codec.get_block(&mut input, &mut body, &mut id).unwrap());
    }

    #[test]
    fn multi_line_bodies_are_kept_together() {
        let codec = LineStream;
        let mut input = Cursor::new("[tf-block:2-x]\none\ntwo\n[/tf-block:2-x]\n");
        let mut body = String::new();
        let mut id = String::new();
        assert!(codec.get_block(&mut input, &mut body, &mut id).unwrap());
        assert_eq!(id, "2-x");
        assert_eq!(body, "one\ntwo\n");
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let codec = LineStream;
        let mut input = Cursor::new("[tf-block:3-y]\nbody with no close\n");
        let mut body = String::new();
        let mut id = String::new();
        assert!(codec.get_block(&mut input, &mut body, &mut id).is_err());
    }

    #[test]
    fn tmpdir_comes_from_header() {
        let codec = LineStream;
        assert_eq!(
            codec.get_tmpdir("[transfuse:/tmp/proj]"),
            Some(PathBuf::from("/tmp/proj"))
        );
        assert_eq!(codec.get_tmpdir("no header"), None);
        assert_eq!(codec.get_tmpdir("[transfuse:]"), None);
    }
}
