//! Command-sentinel stream format
//!
//! Blocks are framed by stream commands, the shape command-aware
//! pipelines forward unparsed:
//!
//! ```text
//! <STREAMCMD:TRANSFUSE:/path/to/project>
//! <STREAMCMD:TFBLOCK:1-Ab3dEf>
//! Block text here.
//! <STREAMCMD:/TFBLOCK:1-Ab3dEf>
//! ```

use super::{read_line, StreamCodec};
use crate::error::TransfuseError;
use std::io::BufRead;
use std::path::{Path, PathBuf};

pub struct CommandStream;

impl StreamCodec for CommandStream {
    fn name(&self) -> &str {
        "command"
    }

    fn header(&self, out: &mut String, dir: &Path) {
        out.push_str("<STREAMCMD:TRANSFUSE:");
        out.push_str(&dir.to_string_lossy());
        out.push_str(">\n");
    }

    fn block_open(&self, out: &mut String, id: &str) {
        out.push_str("<STREAMCMD:TFBLOCK:");
        out.push_str(id);
        out.push_str(">\n");
    }

    fn block_body(&self, out: &mut String, body: &str) {
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
    }

    fn block_close(&self, out: &mut String, id: &str) {
        out.push_str("<STREAMCMD:/TFBLOCK:");
        out.push_str(id);
        out.push_str(">\n");
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
            .strip_prefix("<STREAMCMD:TFBLOCK:")
            .and_then(|rest| rest.strip_suffix('>'));
        let Some(block_id) = opened else {
            body.push_str(&line);
            body.push('\n');
            return Ok(true);
        };
        id.push_str(block_id);

        let close = format!("<STREAMCMD:/TFBLOCK:{block_id}>");
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
        let start = header.find("<STREAMCMD:TRANSFUSE:")? + "<STREAMCMD:TRANSFUSE:".len();
        let end = header[start..].find('>')? + start;
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
        let codec = CommandStream;
        let mut out = String::new();
        codec.header(&mut out, Path::new("/tmp/proj"));
        codec.block_open(&mut out, "1-abc");
        codec.block_body(&mut out, "Hei verden");
        codec.block_close(&mut out, "1-abc");

        let mut input = Cursor::new(out);
        let mut body = String::new();
        let mut id = String::new();

        assert!(codec.get_block(&mut input, &mut body, &mut id).unwrap());
        assert!(id.is_empty());

        assert!(codec.get_block(&mut input, &mut body, &mut id).unwrap());
        assert_eq!(id, "1-abc");
        assert_eq!(body, "Hei verden\n");

        assert!(!codec.get_block(&mut input, &mut body, &mut id).unwrap());
    }

    #[test]
    fn tmpdir_comes_from_header() {
        let codec = CommandStream;
        assert_eq!(
            codec.get_tmpdir("<STREAMCMD:TRANSFUSE:/tmp/proj>"),
            Some(PathBuf::from("/tmp/proj"))
        );
        assert_eq!(codec.get_tmpdir("<STREAMCMD:FLUSH>"), None);
    }
}
