//! The byte source adapter (§4.A), value dispatcher (§4.C), and the parts of
//! the token recognizer (§4.B) that don't need their own file.

use tracing::{trace, warn};

use crate::config::ParseConfig;
use crate::cursor::{ArrayCursor, ObjectCursor};
use crate::error::{ByteDesc, JsonError, Result};
use crate::source::ChunkSource;
use crate::value::{Value, ValueType};

/// A streaming JSON pull-parser over an asynchronous [`ChunkSource`].
///
/// Only one [`ObjectCursor`]/[`ArrayCursor`] may be alive at a time; the
/// borrow checker enforces this, since entering a container requires `&mut
/// self` and the returned cursor holds that borrow for its whole lifetime.
pub struct Parser<S: ChunkSource> {
    source: S,
    buffer: String,
    index: usize,
    current: Option<u8>,
    started: bool,
    depth: usize,
    top_level_done: bool,
    config: ParseConfig,
}

impl<S: ChunkSource> Parser<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, ParseConfig::default())
    }

    pub fn with_config(source: S, config: ParseConfig) -> Self {
        Self {
            source,
            buffer: String::with_capacity(config.chunk_size_hint()),
            index: 0,
            current: None,
            started: false,
            depth: 0,
            top_level_done: false,
            config,
        }
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Pulls chunks from the source, skipping any empty ones, until either a
    /// non-empty chunk arrives or the source is exhausted. Leaves `current`
    /// set to the new lookahead byte, or `None` on clean end-of-stream.
    async fn pull_chunk(&mut self) -> Result<()> {
        self.started = true;
        loop {
            match self
                .source
                .next_chunk()
                .await
                .map_err(|_| JsonError::ReadPastEndOfStream)?
            {
                None => {
                    self.buffer.clear();
                    self.index = 0;
                    self.current = None;
                    return Ok(());
                }
                Some(chunk) if chunk.is_empty() => continue,
                Some(chunk) => {
                    trace!(len = chunk.len(), depth = self.depth, "pulled chunk");
                    self.current = chunk.as_bytes().first().copied();
                    self.buffer = chunk;
                    self.index = 1;
                    return Ok(());
                }
            }
        }
    }

    /// Pulls another byte. Fails with [`JsonError::ReadPastEndOfStream`] if
    /// the current slot was already empty (end-of-stream) before this call.
    pub(crate) async fn advance(&mut self) -> Result<()> {
        if self.index < self.buffer.len() {
            self.current = Some(self.buffer.as_bytes()[self.index]);
            self.index += 1;
            return Ok(());
        }
        let had_current = self.current.is_some();
        self.pull_chunk().await?;
        if self.current.is_none() && !had_current {
            let err = JsonError::ReadPastEndOfStream;
            warn!(%err, "advance past end of stream");
            return Err(err);
        }
        Ok(())
    }

    /// Non-blocking variant: advances only if a byte is already buffered
    /// locally, without ever awaiting the source. Used by the chunked string
    /// reader to flush partial output before pausing on I/O.
    pub(crate) fn advance_if_buffered(&mut self) -> bool {
        if self.index < self.buffer.len() {
            self.current = Some(self.buffer.as_bytes()[self.index]);
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn current(&self) -> Option<u8> {
        self.current
    }

    /// The buffer index one past the current byte (i.e. where `advance`
    /// will read from next). Used by the string reader to slice out a
    /// multi-byte character in one shot instead of byte-by-byte.
    pub(crate) fn buf_index(&self) -> usize {
        self.index
    }

    pub(crate) fn buf_slice(&self, start: usize, end: usize) -> Option<&str> {
        self.buffer.get(start..end)
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Repeatedly advances while the current byte is JSON whitespace. Pulls
    /// one byte first if nothing has been read yet.
    pub(crate) async fn skip_ws(&mut self) -> Result<()> {
        if self.current.is_none() && !self.started {
            self.pull_chunk().await?;
        }
        while matches!(self.current, Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.advance().await?;
        }
        Ok(())
    }

    /// Skips whitespace, then — if a top-level value was already completed —
    /// decides whether the next byte is trailing garbage worth its own
    /// lexical error or a second legitimate-looking value.
    ///
    /// A byte that doesn't classify to any value type (e.g. the stray `.` or
    /// `e` left over after a malformed-number read like `123.45.67`) is left
    /// alone here and surfaces as `UnexpectedCharacter` from the normal read
    /// path; only a byte that *would* start a real value triggers
    /// `ValueAfterEnd`, and a fully exhausted stream triggers
    /// `ReadPastEndOfStream`.
    pub(crate) async fn check_top_level(&mut self) -> Result<()> {
        self.skip_ws().await?;
        if self.depth == 0 && self.top_level_done {
            if self.current.is_none() {
                let err = JsonError::ReadPastEndOfStream;
                warn!(%err, "check_top_level");
                return Err(err);
            }
            if self.classify_current().is_ok() {
                let err = JsonError::ValueAfterEnd;
                warn!(%err, "check_top_level");
                return Err(err);
            }
        }
        Ok(())
    }

    pub(crate) fn note_if_top_level_complete(&mut self) {
        if self.depth == 0 {
            self.top_level_done = true;
        }
    }

    /// Classifies the next value without consuming any of it.
    pub async fn peek_type(&mut self) -> Result<ValueType> {
        self.check_top_level().await?;
        self.classify_current()
    }

    pub(crate) fn classify_current(&self) -> Result<ValueType> {
        match self.current {
            Some(b'"') => Ok(ValueType::String),
            Some(b'{') => Ok(ValueType::Object),
            Some(b'[') => Ok(ValueType::Array),
            Some(b't') | Some(b'f') => Ok(ValueType::Boolean),
            Some(b'n') => Ok(ValueType::Null),
            Some(b'-') | Some(b'0'..=b'9') => Ok(ValueType::Number),
            other => {
                let err = JsonError::UnexpectedCharacter(ByteDesc::from_current(other));
                warn!(%err, "classify_current");
                Err(err)
            }
        }
    }

    pub(crate) async fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.current == Some(expected) {
            self.advance().await?;
            Ok(())
        } else {
            let err = JsonError::ExpectedCharacter {
                expected: expected as char,
                found: ByteDesc::from_current(self.current),
            };
            warn!(%err, "expect_byte");
            Err(err)
        }
    }

    pub(crate) async fn read_keyword(&mut self, literal: &'static [u8]) -> Result<()> {
        for &want in literal {
            if self.current != Some(want) {
                let err = JsonError::ExpectedCharacter {
                    expected: want as char,
                    found: ByteDesc::from_current(self.current),
                };
                warn!(%err, "read_keyword");
                return Err(err);
            }
            self.advance().await?;
        }
        Ok(())
    }

    pub async fn read_bool(&mut self) -> Result<bool> {
        self.check_top_level().await?;
        match self.current {
            Some(b't') => {
                self.read_keyword(b"true").await?;
                self.note_if_top_level_complete();
                Ok(true)
            }
            Some(b'f') => {
                self.read_keyword(b"false").await?;
                self.note_if_top_level_complete();
                Ok(false)
            }
            other => Err(JsonError::UnexpectedCharacter(ByteDesc::from_current(
                other,
            ))),
        }
    }

    pub async fn read_null(&mut self) -> Result<()> {
        self.check_top_level().await?;
        self.read_keyword(b"null").await?;
        self.note_if_top_level_complete();
        Ok(())
    }

    /// Consumes `{`, bumps depth, and returns a cursor. Entries are not
    /// consumed.
    pub async fn enter_object(&mut self) -> Result<ObjectCursor<'_, S>> {
        self.check_top_level().await?;
        self.expect_byte(b'{').await?;
        self.bump_depth()?;
        Ok(ObjectCursor::new(self))
    }

    /// Consumes `[`, bumps depth, and returns a cursor. Entries are not
    /// consumed.
    pub async fn enter_array(&mut self) -> Result<ArrayCursor<'_, S>> {
        self.check_top_level().await?;
        self.expect_byte(b'[').await?;
        self.bump_depth()?;
        Ok(ArrayCursor::new(self))
    }

    pub(crate) fn bump_depth(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.config.max_depth() {
            let err = JsonError::RecursionLimitExceeded {
                depth: self.depth,
                limit: self.config.max_depth(),
            };
            warn!(%err, "bump_depth");
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn close_container(&mut self) {
        self.depth -= 1;
        self.note_if_top_level_complete();
    }

    /// Reads a complete value, eagerly materializing containers by
    /// recursively draining their cursors.
    pub async fn read_value(&mut self) -> Result<Value> {
        self.check_top_level().await?;
        let ty = self.classify_current()?;
        let value = match ty {
            ValueType::Null => {
                self.read_keyword(b"null").await?;
                Value::Null
            }
            ValueType::Boolean => Value::Bool(self.read_bool_body().await?),
            ValueType::Number => Value::Number(self.read_number_body().await?),
            ValueType::String => Value::String(self.read_string_body().await?),
            ValueType::Array => {
                self.expect_byte(b'[').await?;
                self.bump_depth()?;
                let mut cursor = ArrayCursor::new(self);
                let values = cursor.materialize().await?;
                Value::Array(values)
            }
            ValueType::Object => {
                self.expect_byte(b'{').await?;
                self.bump_depth()?;
                let mut cursor = ObjectCursor::new(self);
                let entries = cursor.materialize().await?;
                Value::Object(entries)
            }
        };
        self.note_if_top_level_complete();
        Ok(value)
    }

    pub(crate) async fn read_bool_body(&mut self) -> Result<bool> {
        match self.current {
            Some(b't') => {
                self.read_keyword(b"true").await?;
                Ok(true)
            }
            Some(b'f') => {
                self.read_keyword(b"false").await?;
                Ok(false)
            }
            other => Err(JsonError::UnexpectedCharacter(ByteDesc::from_current(
                other,
            ))),
        }
    }

    /// Reads one full value and discards it. Allocation-free for compound
    /// values: it never builds a [`Value`] tree, only walking bracket depth
    /// back to the snapshot taken on entry.
    pub async fn skip_value(&mut self) -> Result<()> {
        self.check_top_level().await?;
        let snapshot = self.depth;
        let ty = self.classify_current()?;
        match ty {
            ValueType::Null => {
                self.read_keyword(b"null").await?;
            }
            ValueType::Boolean => {
                self.read_bool_body().await?;
            }
            ValueType::Number => {
                self.read_number_body().await?;
            }
            ValueType::String => {
                self.read_string_body().await?;
            }
            ValueType::Array => {
                self.expect_byte(b'[').await?;
                self.bump_depth()?;
            }
            ValueType::Object => {
                self.expect_byte(b'{').await?;
                self.bump_depth()?;
            }
        }
        while self.depth != snapshot {
            self.skip_ws().await?;
            match self.current {
                None => return Err(JsonError::ReadPastEndOfStream),
                Some(b'}') | Some(b']') => {
                    self.advance().await?;
                    self.depth -= 1;
                }
                Some(b'{') | Some(b'[') => {
                    self.advance().await?;
                    self.bump_depth()?;
                }
                Some(b',') | Some(b':') => {
                    self.advance().await?;
                }
                Some(b'"') => {
                    self.read_string_body().await?;
                }
                _ => {
                    self.read_scalar_discard().await?;
                }
            }
        }
        self.note_if_top_level_complete();
        Ok(())
    }

    /// Discards one bare scalar token (number, boolean, or null) while
    /// skipping, without classifying via [`Self::peek_type`] (already known
    /// to not be a string/bracket by the caller's dispatch).
    async fn read_scalar_discard(&mut self) -> Result<()> {
        match self.classify_current()? {
            ValueType::Number => {
                self.read_number_body().await?;
                Ok(())
            }
            ValueType::Boolean => {
                self.read_bool_body().await?;
                Ok(())
            }
            ValueType::Null => {
                self.read_keyword(b"null").await?;
                Ok(())
            }
            _ => Err(JsonError::UnexpectedCharacter(ByteDesc::from_current(
                self.current,
            ))),
        }
    }
}
