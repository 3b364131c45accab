use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementsError {
    #[error("expected two or three lines, got {0}")]
    LineCount(usize),
    #[error("line {line}: contains non-ASCII characters")]
    NonAscii { line: u8 },
    #[error("line {line}: expected 69 characters, got {len}")]
    BadLength { line: u8, len: usize },
    #[error("line {line}: must start with \"{line} \"")]
    BadLineNumber { line: u8 },
    #[error("line {line}: checksum digit is {found}, computed {computed}")]
    BadChecksum { line: u8, found: u8, computed: u8 },
    #[error("line {line}: invalid {field} {text:?}")]
    BadField {
        line: u8,
        field: &'static str,
        text: String,
    },
    #[error("catalog number differs between lines ({line1} vs {line2})")]
    CatalogMismatch { line1: u32, line2: u32 },
    #[error("rejected by propagation model: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Error)]
#[error("propagation failed at {at}: {message}")]
pub struct PropagationError {
    pub at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("non-finite {0}")]
    NonFinite(&'static str),
    #[error("slant range is zero, elevation undefined")]
    ZeroRange,
}
