//! Error types for the extraction and injection pipelines

use std::fmt;

/// Errors that can occur while extracting or injecting a document.
///
/// Only fatal conditions surface here. A block id or style id that is
/// missing at injection time is logged to the error stream and processing
/// continues with the original content preserved.
#[derive(Debug, Clone, PartialEq)]
pub enum TransfuseError {
    /// Project directory or expected state file problems
    Io(String),
    /// Input or interim document could not be parsed
    Parse(String),
    /// Stream header missing or unrecognized, or a malformed block
    Stream(String),
    /// Style store could not be opened, read, or written
    Store(String),
    /// Regex compilation or execution failure
    Regex(String),
}

impl fmt::Display for TransfuseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransfuseError::Io(msg) => write!(f, "I/O error: {msg}"),
            TransfuseError::Parse(msg) => write!(f, "Parse error: {msg}"),
            TransfuseError::Stream(msg) => write!(f, "Stream error: {msg}"),
            TransfuseError::Store(msg) => write!(f, "Style store error: {msg}"),
            TransfuseError::Regex(msg) => write!(f, "Regex error: {msg}"),
        }
    }
}

impl std::error::Error for TransfuseError {}

impl From<std::io::Error> for TransfuseError {
    fn from(e: std::io::Error) -> Self {
        TransfuseError::Io(e.to_string())
    }
}

impl From<regex::Error> for TransfuseError {
    fn from(e: regex::Error) -> Self {
        TransfuseError::Regex(e.to_string())
    }
}

impl From<rusqlite::Error> for TransfuseError {
    fn from(e: rusqlite::Error) -> Self {
        TransfuseError::Store(e.to_string())
    }
}

impl From<roxmltree::Error> for TransfuseError {
    fn from(e: roxmltree::Error) -> Self {
        TransfuseError::Parse(e.to_string())
    }
}
