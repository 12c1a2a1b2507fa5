//! Container cursors (§4.D): lazy, streaming iteration over object entries
//! and array items.
//!
//! A cursor holds the parser's exclusive `&mut` borrow for its entire
//! lifetime, so only one cursor can be alive at a time — the borrow checker
//! enforces that, not a runtime lock (see SPEC_FULL.md §9). Each call to
//! `next_entry`/`next_item` that yields a value also mints an
//! [`UnparsedValue`] handle stamped with the cursor's current generation.
//! The handle carries no reference back to the parser; it is a plain `Copy`
//! token the cursor itself validates, which is what makes `DoubleConsume`
//! and `StaleHandle` genuine runtime errors rather than borrow-checker
//! rejections.

use crate::error::{ByteDesc, JsonError, Result};
use crate::parser::Parser;
use crate::source::ChunkSource;
use crate::strings::StringChunks;
use crate::value::{Object, Value, ValueType};

/// A capability to read exactly one value, issued by a container cursor.
/// Reading it twice is [`JsonError::DoubleConsume`]; reading it after the
/// cursor has moved on to a later entry is [`JsonError::StaleHandle`].
#[derive(Debug, Clone, Copy)]
pub struct UnparsedValue {
    pub(crate) generation: u64,
    ty: ValueType,
}

impl UnparsedValue {
    pub fn value_type(&self) -> ValueType {
        self.ty
    }
}

/// Lazily iterates the entries of a JSON object already opened with
/// [`Parser::enter_object`].
pub struct ObjectCursor<'p, S: ChunkSource> {
    parser: &'p mut Parser<S>,
    generation: u64,
    consumed: bool,
    started: bool,
    finished: bool,
}

impl<'p, S: ChunkSource> ObjectCursor<'p, S> {
    pub(crate) fn new(parser: &'p mut Parser<S>) -> Self {
        Self {
            parser,
            generation: 0,
            consumed: true,
            started: false,
            finished: false,
        }
    }

    fn validate(&self, handle: UnparsedValue) -> Result<()> {
        if handle.generation != self.generation {
            return Err(JsonError::StaleHandle);
        }
        if self.consumed {
            return Err(JsonError::DoubleConsume);
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.finished = true;
        self.parser.close_container();
    }

    /// Advances to the next `"key": value` pair, skipping the previous
    /// entry's value first if the caller never read it. Returns `None`
    /// after the closing `}` has been consumed.
    pub async fn next_entry(&mut self) -> Result<Option<(String, UnparsedValue)>> {
        if self.finished {
            return Ok(None);
        }
        if self.started {
            if !self.consumed {
                self.parser.skip_value().await?;
            }
            self.parser.skip_ws().await?;
            match self.parser.current() {
                Some(b'}') => {
                    self.parser.advance().await?;
                    self.finish();
                    return Ok(None);
                }
                Some(b',') => {
                    self.parser.advance().await?;
                    self.parser.skip_ws().await?;
                }
                other => {
                    return Err(JsonError::ExpectedOneOf {
                        expected: "',' or '}'",
                        found: ByteDesc::from_current(other),
                    });
                }
            }
        } else {
            self.parser.skip_ws().await?;
            if self.parser.current() == Some(b'}') {
                self.parser.advance().await?;
                self.finish();
                return Ok(None);
            }
        }
        self.started = true;
        let key = self.parser.read_string_body().await?;
        self.parser.skip_ws().await?;
        self.parser.expect_byte(b':').await?;
        self.parser.skip_ws().await?;
        let ty = self.parser.classify_current()?;
        self.generation += 1;
        self.consumed = false;
        Ok(Some((key, UnparsedValue { generation: self.generation, ty })))
    }

    pub async fn read_string(&mut self, handle: UnparsedValue) -> Result<String> {
        self.validate(handle)?;
        let value = self.parser.read_string_body().await?;
        self.consumed = true;
        Ok(value)
    }

    /// Reads this entry's string value as a lazy sequence of decoded
    /// fragments rather than one allocation — the hot path for a long
    /// streamed value (e.g. a model-generated file) nested under a key.
    pub async fn read_string_chunked(&mut self, handle: UnparsedValue) -> Result<StringChunks<'_, S>> {
        self.validate(handle)?;
        self.consumed = true;
        self.parser.open_string_chunks().await
    }

    pub async fn read_number(&mut self, handle: UnparsedValue) -> Result<f64> {
        self.validate(handle)?;
        let value = self.parser.read_number_body().await?;
        self.consumed = true;
        Ok(value)
    }

    pub async fn read_bool(&mut self, handle: UnparsedValue) -> Result<bool> {
        self.validate(handle)?;
        let value = self.parser.read_bool_body().await?;
        self.consumed = true;
        Ok(value)
    }

    pub async fn read_null(&mut self, handle: UnparsedValue) -> Result<()> {
        self.validate(handle)?;
        self.parser.read_keyword(b"null").await?;
        self.consumed = true;
        Ok(())
    }

    pub async fn enter_object(&mut self, handle: UnparsedValue) -> Result<ObjectCursor<'_, S>> {
        self.validate(handle)?;
        self.parser.expect_byte(b'{').await?;
        self.parser.bump_depth()?;
        self.consumed = true;
        Ok(ObjectCursor::new(self.parser))
    }

    pub async fn enter_array(&mut self, handle: UnparsedValue) -> Result<ArrayCursor<'_, S>> {
        self.validate(handle)?;
        self.parser.expect_byte(b'[').await?;
        self.parser.bump_depth()?;
        self.consumed = true;
        Ok(ArrayCursor::new(self.parser))
    }

    /// Skips the value without reading it.
    pub async fn skip(&mut self, handle: UnparsedValue) -> Result<()> {
        self.validate(handle)?;
        self.parser.skip_value().await?;
        self.consumed = true;
        Ok(())
    }

    /// Eagerly materializes the value as a [`Value`] tree.
    pub async fn read_value(&mut self, handle: UnparsedValue) -> Result<Value> {
        self.validate(handle)?;
        let value = match handle.ty {
            ValueType::Null => {
                self.parser.read_keyword(b"null").await?;
                Value::Null
            }
            ValueType::Boolean => Value::Bool(self.parser.read_bool_body().await?),
            ValueType::Number => Value::Number(self.parser.read_number_body().await?),
            ValueType::String => Value::String(self.parser.read_string_body().await?),
            ValueType::Array => {
                self.parser.expect_byte(b'[').await?;
                self.parser.bump_depth()?;
                let mut nested = ArrayCursor::new(self.parser);
                Value::Array(nested.materialize().await?)
            }
            ValueType::Object => {
                self.parser.expect_byte(b'{').await?;
                self.parser.bump_depth()?;
                let mut nested = ObjectCursor::new(self.parser);
                Value::Object(nested.materialize().await?)
            }
        };
        self.consumed = true;
        Ok(value)
    }

    /// Eagerly drains the whole object into an ordered [`Object`]. Fails
    /// with [`JsonError::AlreadyIterated`] if `next_entry` was already
    /// called on this cursor.
    pub async fn materialize(&mut self) -> Result<Object> {
        if self.started {
            return Err(JsonError::AlreadyIterated);
        }
        let mut entries = Vec::new();
        while let Some((key, handle)) = self.next_entry().await? {
            let value = self.read_value(handle).await?;
            entries.push((key, value));
        }
        Ok(entries)
    }
}

/// Lazily iterates the items of a JSON array already opened with
/// [`Parser::enter_array`].
pub struct ArrayCursor<'p, S: ChunkSource> {
    parser: &'p mut Parser<S>,
    generation: u64,
    consumed: bool,
    started: bool,
    finished: bool,
}

impl<'p, S: ChunkSource> ArrayCursor<'p, S> {
    pub(crate) fn new(parser: &'p mut Parser<S>) -> Self {
        Self {
            parser,
            generation: 0,
            consumed: true,
            started: false,
            finished: false,
        }
    }

    fn validate(&self, handle: UnparsedValue) -> Result<()> {
        if handle.generation != self.generation {
            return Err(JsonError::StaleHandle);
        }
        if self.consumed {
            return Err(JsonError::DoubleConsume);
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.finished = true;
        self.parser.close_container();
    }

    pub async fn next_item(&mut self) -> Result<Option<UnparsedValue>> {
        if self.finished {
            return Ok(None);
        }
        if self.started {
            if !self.consumed {
                self.parser.skip_value().await?;
            }
            self.parser.skip_ws().await?;
            match self.parser.current() {
                Some(b']') => {
                    self.parser.advance().await?;
                    self.finish();
                    return Ok(None);
                }
                Some(b',') => {
                    self.parser.advance().await?;
                    self.parser.skip_ws().await?;
                }
                other => {
                    return Err(JsonError::ExpectedOneOf {
                        expected: "',' or ']'",
                        found: ByteDesc::from_current(other),
                    });
                }
            }
        } else {
            self.parser.skip_ws().await?;
            if self.parser.current() == Some(b']') {
                self.parser.advance().await?;
                self.finish();
                return Ok(None);
            }
        }
        self.started = true;
        let ty = self.parser.classify_current()?;
        self.generation += 1;
        self.consumed = false;
        Ok(Some(UnparsedValue { generation: self.generation, ty }))
    }

    pub async fn read_string(&mut self, handle: UnparsedValue) -> Result<String> {
        self.validate(handle)?;
        let value = self.parser.read_string_body().await?;
        self.consumed = true;
        Ok(value)
    }

    /// Reads this item's string value as a lazy sequence of decoded
    /// fragments rather than one allocation.
    pub async fn read_string_chunked(&mut self, handle: UnparsedValue) -> Result<StringChunks<'_, S>> {
        self.validate(handle)?;
        self.consumed = true;
        self.parser.open_string_chunks().await
    }

    pub async fn read_number(&mut self, handle: UnparsedValue) -> Result<f64> {
        self.validate(handle)?;
        let value = self.parser.read_number_body().await?;
        self.consumed = true;
        Ok(value)
    }

    pub async fn read_bool(&mut self, handle: UnparsedValue) -> Result<bool> {
        self.validate(handle)?;
        let value = self.parser.read_bool_body().await?;
        self.consumed = true;
        Ok(value)
    }

    pub async fn read_null(&mut self, handle: UnparsedValue) -> Result<()> {
        self.validate(handle)?;
        self.parser.read_keyword(b"null").await?;
        self.consumed = true;
        Ok(())
    }

    pub async fn enter_object(&mut self, handle: UnparsedValue) -> Result<ObjectCursor<'_, S>> {
        self.validate(handle)?;
        self.parser.expect_byte(b'{').await?;
        self.parser.bump_depth()?;
        self.consumed = true;
        Ok(ObjectCursor::new(self.parser))
    }

    pub async fn enter_array(&mut self, handle: UnparsedValue) -> Result<ArrayCursor<'_, S>> {
        self.validate(handle)?;
        self.parser.expect_byte(b'[').await?;
        self.parser.bump_depth()?;
        self.consumed = true;
        Ok(ArrayCursor::new(self.parser))
    }

    pub async fn skip(&mut self, handle: UnparsedValue) -> Result<()> {
        self.validate(handle)?;
        self.parser.skip_value().await?;
        self.consumed = true;
        Ok(())
    }

    pub async fn read_value(&mut self, handle: UnparsedValue) -> Result<Value> {
        self.validate(handle)?;
        let value = match handle.ty {
            ValueType::Null => {
                self.parser.read_keyword(b"null").await?;
                Value::Null
            }
            ValueType::Boolean => Value::Bool(self.parser.read_bool_body().await?),
            ValueType::Number => Value::Number(self.parser.read_number_body().await?),
            ValueType::String => Value::String(self.parser.read_string_body().await?),
            ValueType::Array => {
                self.parser.expect_byte(b'[').await?;
                self.parser.bump_depth()?;
                let mut nested = ArrayCursor::new(self.parser);
                Value::Array(nested.materialize().await?)
            }
            ValueType::Object => {
                self.parser.expect_byte(b'{').await?;
                self.parser.bump_depth()?;
                let mut nested = ObjectCursor::new(self.parser);
                Value::Object(nested.materialize().await?)
            }
        };
        self.consumed = true;
        Ok(value)
    }

    /// Eagerly drains the whole array into a `Vec<Value>`. Fails with
    /// [`JsonError::AlreadyIterated`] if `next_item` was already called on
    /// this cursor.
    pub async fn materialize(&mut self) -> Result<Vec<Value>> {
        if self.started {
            return Err(JsonError::AlreadyIterated);
        }
        let mut items = Vec::new();
        while let Some(handle) = self.next_item().await? {
            items.push(self.read_value(handle).await?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::JsonError;
    use crate::parser::Parser;
    use crate::source::FragmentSource;

    #[tokio::test]
    async fn object_cursor_yields_keys_in_order() {
        let mut p = Parser::new(FragmentSource::whole(r#"{"a": 1, "b": true}"#));
        let mut cursor = p.enter_object().await.unwrap();
        let (key, handle) = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(key, "a");
        assert_eq!(cursor.read_number(handle).await.unwrap(), 1.0);
        let (key, handle) = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(key, "b");
        assert!(cursor.read_bool(handle).await.unwrap());
        assert!(cursor.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unread_entry_is_skipped_automatically() {
        let mut p = Parser::new(FragmentSource::whole(r#"{"a": [1, 2, 3], "b": 9}"#));
        let mut cursor = p.enter_object().await.unwrap();
        let _ = cursor.next_entry().await.unwrap().unwrap();
        let (key, handle) = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(key, "b");
        assert_eq!(cursor.read_number(handle).await.unwrap(), 9.0);
    }

    #[tokio::test]
    async fn reusing_a_consumed_handle_is_double_consume() {
        let mut p = Parser::new(FragmentSource::whole(r#"{"a": 1}"#));
        let mut cursor = p.enter_object().await.unwrap();
        let (_, handle) = cursor.next_entry().await.unwrap().unwrap();
        cursor.read_number(handle).await.unwrap();
        let err = cursor.read_number(handle).await.unwrap_err();
        assert_eq!(err, JsonError::DoubleConsume);
    }

    #[tokio::test]
    async fn handle_from_a_previous_entry_is_stale() {
        let mut p = Parser::new(FragmentSource::whole(r#"{"a": 1, "b": 2}"#));
        let mut cursor = p.enter_object().await.unwrap();
        let (_, stale) = cursor.next_entry().await.unwrap().unwrap();
        let _ = cursor.next_entry().await.unwrap().unwrap();
        let err = cursor.read_number(stale).await.unwrap_err();
        assert_eq!(err, JsonError::StaleHandle);
    }

    #[tokio::test]
    async fn array_cursor_materialize_matches_read_value() {
        let mut p = Parser::new(FragmentSource::whole("[1, [2, 3], 4]"));
        let mut cursor = p.enter_array().await.unwrap();
        let values = cursor.materialize().await.unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].as_f64(), Some(1.0));
        assert_eq!(values[2].as_f64(), Some(4.0));
    }

    #[tokio::test]
    async fn materialize_after_manual_iteration_is_already_iterated() {
        let mut p = Parser::new(FragmentSource::whole("[1, 2]"));
        let mut cursor = p.enter_array().await.unwrap();
        let _ = cursor.next_item().await.unwrap();
        let err = cursor.materialize().await.unwrap_err();
        assert_eq!(err, JsonError::AlreadyIterated);
    }

    #[tokio::test]
    async fn object_entry_string_reads_chunked() {
        let mut p = Parser::new(FragmentSource::whole(r#"{"body": "abc\ndef"}"#));
        let mut cursor = p.enter_object().await.unwrap();
        let (key, handle) = cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(key, "body");
        let mut chunks = cursor.read_string_chunked(handle).await.unwrap();
        let mut joined = String::new();
        while let Some(fragment) = chunks.next_fragment().await.unwrap() {
            joined.push_str(&fragment);
        }
        assert_eq!(joined, "abc\ndef");
    }

    #[tokio::test]
    async fn array_item_string_reads_chunked() {
        let mut p = Parser::new(FragmentSource::whole(r#"["abc", "de\tf"]"#));
        let mut cursor = p.enter_array().await.unwrap();
        let first = cursor.next_item().await.unwrap().unwrap();
        assert_eq!(cursor.read_string(first).await.unwrap(), "abc");
        let second = cursor.next_item().await.unwrap().unwrap();
        let mut chunks = cursor.read_string_chunked(second).await.unwrap();
        let mut joined = String::new();
        while let Some(fragment) = chunks.next_fragment().await.unwrap() {
            joined.push_str(&fragment);
        }
        assert_eq!(joined, "de\tf");
    }
}
