//! Stream codecs
//!
//! Blocks travel to and from the translator as a line-oriented stream.
//! Two wire formats exist, with identical contracts: a line-markered
//! variant for bracket-style pipelines and a command-sentinel variant for
//! stream-command pipelines. The first line of every stream is a header
//! naming the project directory, which is also what injection sniffs to
//! pick the right codec when none was chosen explicitly.

use crate::error::TransfuseError;
use std::io::BufRead;
use std::path::{Path, PathBuf};

mod command;
mod line;

pub use command::CommandStream;
pub use line::LineStream;

/// One wire format for the block stream.
///
/// `get_block` reads the next unit from the input: a full block (id and
/// body) or a chatter line between blocks, reported with an empty id so
/// the caller can pass it through. Returns `false` at end of input.
pub trait StreamCodec {
    fn name(&self) -> &str;

    /// Writes the stream header naming the project directory.
    fn header(&self, out: &mut String, dir: &Path);

    /// Writes the delimiter opening block `id`.
    fn block_open(&self, out: &mut String, id: &str);

    /// Writes a block body; every body ends with a newline.
    fn block_body(&self, out: &mut String, body: &str);

    /// Writes the delimiter closing block `id`.
    fn block_close(&self, out: &mut String, id: &str);

    /// Reads the next block or chatter line into `body` / `id`.
    fn get_block(
        &self,
        input: &mut dyn BufRead,
        body: &mut String,
        id: &mut String,
    ) -> Result<bool, TransfuseError>;

    /// Extracts the project directory from a stream header line.
    fn get_tmpdir(&self, header: &str) -> Option<PathBuf>;
}

/// Stream format selection: an explicit variant, or sniffing the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamVariant {
    /// Decide from the first line of the input
    #[default]
    Detect,
    Line,
    Command,
}

impl StreamVariant {
    /// The codec for an explicitly selected variant. `Detect` has no
    /// codec of its own; use [`detect`] with the header line instead.
    pub fn codec(self) -> Result<Box<dyn StreamCodec>, TransfuseError> {
        match self {
            StreamVariant::Line => Ok(Box::new(LineStream)),
            StreamVariant::Command => Ok(Box::new(CommandStream)),
            StreamVariant::Detect => Err(TransfuseError::Stream(
                "stream variant must be resolved from the header before use".to_string(),
            )),
        }
    }

    /// Parses a configuration name.
    pub fn from_name(name: &str) -> Option<StreamVariant> {
        match name {
            "detect" => Some(StreamVariant::Detect),
            "line" => Some(StreamVariant::Line),
            "command" => Some(StreamVariant::Command),
            _ => None,
        }
    }
}

/// Sniffs the wire format from the first line of a stream.
pub fn detect(header: &str) -> Result<Box<dyn StreamCodec>, TransfuseError> {
    if header.contains("[transfuse:") {
        Ok(Box::new(LineStream))
    } else if header.contains("<STREAMCMD:TRANSFUSE:") {
        Ok(Box::new(CommandStream))
    } else {
        Err(TransfuseError::Stream(
            "could not detect input stream format".to_string(),
        ))
    }
}

/// Reads one line without its trailing newline. Returns `None` at end of
/// input.
pub(crate) fn read_line(input: &mut dyn BufRead) -> Result<Option<String>, TransfuseError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}
