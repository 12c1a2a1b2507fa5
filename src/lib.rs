#![deny(
    unsafe_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

//! A streaming, pull-style JSON parser over chunked, asynchronous byte
//! sources, plus two satellites built on the same cursor discipline: a
//! tagged-segment stream splitter and a synchronized fold-and-forward
//! reducer.
//!
//! The parser never buffers a whole document. It reads one byte of
//! lookahead at a time off a [`ChunkSource`], and containers are entered
//! through cursors ([`ObjectCursor`], [`ArrayCursor`]) that hand out
//! one-shot [`UnparsedValue`] handles for their entries rather than
//! eagerly materializing them — callers choose, per entry, whether to
//! decode it or skip it.

mod config;
mod cursor;
mod error;
mod numbers;
mod parser;
mod reducer;
mod segments;
mod source;
mod strings;
mod value;

pub use config::ParseConfig;
pub use cursor::{ArrayCursor, ObjectCursor, UnparsedValue};
pub use error::{ByteDesc, JsonError, Result};
pub use parser::Parser;
pub use reducer::{EventSink, Reducer, ReducerError};
pub use segments::{Segment, SegmentMode, TaggedSegmentSplitter};
pub use source::{ChunkSource, FragmentSource};
pub use strings::StringChunks;
pub use value::{Object, Value, ValueType};

#[cfg(feature = "futures")]
pub use source::futures_impl::StreamSource;
#[cfg(feature = "tokio")]
pub use source::tokio_impl::ChannelSource;

#[cfg(feature = "tokio")]
pub use reducer::tokio_impl::ChannelSink;
