//! The closed error taxonomy shared by the JSON parser and the tagged-segment
//! splitter.
//!
//! Every failure mode the parser can hit is a variant here; there is no
//! partial recovery once one is raised (see the crate-level docs).

use std::fmt;

use thiserror::Error;

/// A single byte of input, or the absence of one (end of stream), rendered
/// for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteDesc {
    Byte(u8),
    EndOfStream,
}

impl ByteDesc {
    pub(crate) fn from_current(current: Option<u8>) -> Self {
        match current {
            Some(b) => ByteDesc::Byte(b),
            None => ByteDesc::EndOfStream,
        }
    }
}

impl fmt::Display for ByteDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteDesc::Byte(b) if b.is_ascii_graphic() || *b == b' ' => {
                write!(f, "'{}'", *b as char)
            }
            ByteDesc::Byte(b) => write!(f, "byte 0x{b:02x}"),
            ByteDesc::EndOfStream => write!(f, "end of stream"),
        }
    }
}

/// The closed set of failure kinds a parse can produce.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JsonError {
    #[error("unexpected end of stream")]
    ReadPastEndOfStream,

    #[error("unexpected character {0}")]
    UnexpectedCharacter(ByteDesc),

    #[error("expected '{expected}', found {found}")]
    ExpectedCharacter { expected: char, found: ByteDesc },

    #[error("expected one of {expected}, found {found}")]
    ExpectedOneOf {
        expected: &'static str,
        found: ByteDesc,
    },

    #[error("malformed number: {0}")]
    MalformedNumber(String),

    #[error("invalid escape sequence: {0}")]
    InvalidEscape(ByteDesc),

    #[error("invalid unicode escape: {0}")]
    InvalidUnicodeEscape(String),

    #[error("incomplete escape sequence at end of stream")]
    IncompleteEscape,

    #[error("unparsed value handle read twice")]
    DoubleConsume,

    #[error("unparsed value handle read after its cursor advanced")]
    StaleHandle,

    #[error("container cursor iterated or materialized more than once")]
    AlreadyIterated,

    #[error("a second top-level value was attempted after the first completed")]
    ValueAfterEnd,

    #[error("reset() called with a non-empty marker lookahead buffer")]
    DirtyReset,

    #[error("recursion limit of {limit} exceeded at depth {depth}")]
    RecursionLimitExceeded { depth: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, JsonError>;
