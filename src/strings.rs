//! String lexing with escape decoding (§4.B), including the chunked reader
//! (§4.B "Chunked mode") used for long streamed text values.

use crate::error::{ByteDesc, JsonError, Result};
use crate::parser::Parser;
use crate::source::ChunkSource;

fn utf8_width(lead: u8) -> usize {
    if lead & 0b1000_0000 == 0 {
        1
    } else if lead & 0b1110_0000 == 0b1100_0000 {
        2
    } else if lead & 0b1111_0000 == 0b1110_0000 {
        3
    } else {
        4
    }
}

impl<S: ChunkSource> Parser<S> {
    async fn expect_open_quote(&mut self) -> Result<()> {
        match self.current() {
            Some(b'"') => {
                self.advance().await?;
                Ok(())
            }
            other => Err(JsonError::ExpectedCharacter {
                expected: '"',
                found: ByteDesc::from_current(other),
            }),
        }
    }

    /// Reads exactly four hex digits, returning the 16-bit code unit they
    /// encode.
    async fn read_hex4(&mut self) -> Result<u32> {
        let mut value: u32 = 0;
        for _ in 0..4 {
            let byte = self.current().ok_or(JsonError::IncompleteEscape)?;
            let digit = (byte as char)
                .to_digit(16)
                .ok_or_else(|| JsonError::InvalidUnicodeEscape(format!("{}", byte as char)))?;
            value = value * 16 + digit;
            self.advance().await?;
        }
        Ok(value)
    }

    /// Decodes one escape sequence. Must be called with `current()` holding
    /// the byte immediately after the backslash.
    async fn decode_escape(&mut self) -> Result<char> {
        let tag = self.current().ok_or(JsonError::IncompleteEscape)?;
        let decoded = match tag {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{0008}',
            b'f' => '\u{000C}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                self.advance().await?;
                let first = self.read_hex4().await?;
                if (0xD800..=0xDBFF).contains(&first) {
                    return self.decode_low_surrogate(first).await;
                }
                if (0xDC00..=0xDFFF).contains(&first) {
                    return Err(JsonError::InvalidUnicodeEscape(format!(
                        "unpaired low surrogate \\u{first:04x}"
                    )));
                }
                return char::from_u32(first)
                    .ok_or_else(|| JsonError::InvalidUnicodeEscape(format!("\\u{first:04x}")));
            }
            other => return Err(JsonError::InvalidEscape(ByteDesc::Byte(other))),
        };
        self.advance().await?;
        Ok(decoded)
    }

    /// Having already decoded a high surrogate, requires an immediately
    /// following `\uXXXX` low surrogate and combines the pair into a single
    /// Unicode scalar value (Rust's `char` cannot hold an unpaired
    /// surrogate — see SPEC_FULL.md §9).
    async fn decode_low_surrogate(&mut self, high: u32) -> Result<char> {
        if self.current() != Some(b'\\') {
            return Err(JsonError::InvalidUnicodeEscape(format!(
                "unpaired high surrogate \\u{high:04x}"
            )));
        }
        self.advance().await?;
        if self.current() != Some(b'u') {
            return Err(JsonError::InvalidUnicodeEscape(format!(
                "unpaired high surrogate \\u{high:04x}"
            )));
        }
        self.advance().await?;
        let low = self.read_hex4().await?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(JsonError::InvalidUnicodeEscape(format!(
                "unpaired high surrogate \\u{high:04x}"
            )));
        }
        let scalar = 0x10000 + (high - 0xD800) * 0x400 + (low - 0xDC00);
        char::from_u32(scalar)
            .ok_or_else(|| JsonError::InvalidUnicodeEscape(format!("\\u{high:04x}\\u{low:04x}")))
    }

    /// Appends the full, possibly multi-byte, UTF-8 character starting at
    /// the current byte to `out`, advancing past all of it. Fragments are
    /// guaranteed never to split a codepoint (see `ChunkSource`), so the
    /// whole character is always present in the current buffer.
    async fn push_verbatim_char(&mut self, out: &mut String) -> Result<()> {
        let lead = match self.current() {
            Some(b) => b,
            None => return Err(JsonError::ReadPastEndOfStream),
        };
        if lead < 0x80 {
            out.push(lead as char);
            self.advance().await?;
            return Ok(());
        }
        let width = utf8_width(lead);
        // `current`'s byte lives at buffer index `self.buf_index() - 1`.
        let start = self.buf_index().saturating_sub(1);
        let end = start + width;
        match self.buf_slice(start, end) {
            Some(text) => out.push_str(text),
            None => {
                return Err(JsonError::UnexpectedCharacter(ByteDesc::Byte(lead)));
            }
        }
        for _ in 0..width {
            self.advance().await?;
        }
        Ok(())
    }

    /// Like [`Self::push_verbatim_char`], but never awaits the source: every
    /// byte-advance past the character goes through `advance_if_buffered`.
    /// Returns `false` the moment the local buffer runs out — which, since
    /// the character's own bytes are always fully present (see above), can
    /// only happen on the advance *past* the character, not mid-character.
    /// The chunked string reader uses this to flush a fragment before
    /// awaiting the next chunk rather than after.
    async fn push_verbatim_char_buffered(&mut self, out: &mut String) -> Result<bool> {
        let lead = match self.current() {
            Some(b) => b,
            None => return Err(JsonError::ReadPastEndOfStream),
        };
        if lead < 0x80 {
            out.push(lead as char);
            return Ok(self.advance_if_buffered());
        }
        let width = utf8_width(lead);
        let start = self.buf_index().saturating_sub(1);
        let end = start + width;
        match self.buf_slice(start, end) {
            Some(text) => out.push_str(text),
            None => {
                return Err(JsonError::UnexpectedCharacter(ByteDesc::Byte(lead)));
            }
        }
        let mut buffered = true;
        for _ in 0..width {
            buffered = self.advance_if_buffered();
        }
        Ok(buffered)
    }

    /// Reads a complete string value (opening quote through closing quote),
    /// fully decoded.
    pub(crate) async fn read_string_body(&mut self) -> Result<String> {
        self.expect_open_quote().await?;
        let mut out = String::new();
        loop {
            match self.current() {
                None => return Err(JsonError::ReadPastEndOfStream),
                Some(b'"') => {
                    self.advance().await?;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.advance().await?;
                    let ch = self.decode_escape().await?;
                    out.push(ch);
                }
                Some(_) => self.push_verbatim_char(&mut out).await?,
            }
        }
    }

    pub async fn read_string(&mut self) -> Result<String> {
        self.check_top_level().await?;
        let value = self.read_string_body().await?;
        self.note_if_top_level_complete();
        Ok(value)
    }

    /// Starts the chunked string reader: the opening quote must be the
    /// current byte (callers typically reach this right after
    /// `peek_type()` classified the value as a string).
    pub async fn read_string_chunked(&mut self) -> Result<StringChunks<'_, S>> {
        self.check_top_level().await?;
        self.open_string_chunks().await
    }

    /// Consumes the opening quote and hands back a chunked reader, without
    /// the top-level guard — used both by the top-level entry point above
    /// and by container cursors reading a nested string value.
    pub(crate) async fn open_string_chunks(&mut self) -> Result<StringChunks<'_, S>> {
        self.expect_open_quote().await?;
        Ok(StringChunks {
            parser: self,
            done: false,
            resume_blocking: false,
        })
    }
}

/// A lazy, pull-style sequence of decoded string fragments (§4.B "Chunked
/// mode"). Concatenating every fragment yields the same string
/// `read_string()` would have produced.
pub struct StringChunks<'p, S: ChunkSource> {
    parser: &'p mut Parser<S>,
    done: bool,
    resume_blocking: bool,
}

impl<'p, S: ChunkSource> StringChunks<'p, S> {
    /// Returns the next decoded fragment, or `None` once the closing quote
    /// has been consumed.
    pub async fn next_fragment(&mut self) -> Result<Option<String>> {
        if self.done {
            return Ok(None);
        }
        if self.resume_blocking {
            self.resume_blocking = false;
            self.parser.advance().await?;
        }
        let mut out = String::new();
        loop {
            match self.parser.current() {
                None => return Err(JsonError::ReadPastEndOfStream),
                Some(b'"') => {
                    self.parser.advance().await?;
                    self.done = true;
                    self.parser.note_if_top_level_complete();
                    return Ok(if out.is_empty() { None } else { Some(out) });
                }
                Some(b'\\') => {
                    self.parser.advance().await?;
                    let ch = self.parser.decode_escape().await?;
                    out.push(ch);
                }
                Some(_) => {
                    if !self.parser.push_verbatim_char_buffered(&mut out).await? {
                        // Buffer exhausted right after this character: flush
                        // what we have before the next call awaits the
                        // source for more.
                        self.resume_blocking = true;
                        return Ok(Some(out));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::Parser;
    use crate::source::FragmentSource;

    #[tokio::test]
    async fn decodes_standard_escapes() {
        let mut p = Parser::new(FragmentSource::whole(
            r#""Hello,\nWorld!\t\"Escaped\"A""#,
        ));
        let s = p.read_string().await.unwrap();
        assert_eq!(s, "Hello,\nWorld!\t\"Escaped\"A");
    }

    #[tokio::test]
    async fn surrogate_pair_yields_musical_g_clef() {
        let mut p = Parser::new(FragmentSource::whole(r#""𝄞""#));
        let s = p.read_string().await.unwrap();
        assert_eq!(s, "\u{1D11E}");
    }

    #[tokio::test]
    async fn escaped_surrogate_pair_combines_to_musical_g_clef() {
        let mut p = Parser::new(FragmentSource::whole("\"\\uD834\\uDD1E\""));
        let s = p.read_string().await.unwrap();
        assert_eq!(s, "\u{1D11E}");
    }

    #[tokio::test]
    async fn escape_split_across_chunks_decodes_identically() {
        let mut p = Parser::new(FragmentSource::new([r#""\u00"#, r#"41""#]));
        let s = p.read_string().await.unwrap();
        assert_eq!(s, "A");
    }

    #[tokio::test]
    async fn chunked_reader_concatenates_to_full_value() {
        let mut p = Parser::new(FragmentSource::whole(
            r#""Hello,\nWorld!\t\"Escaped\"A""#,
        ));
        let mut chunks = p.read_string_chunked().await.unwrap();
        let mut joined = String::new();
        while let Some(fragment) = chunks.next_fragment().await.unwrap() {
            joined.push_str(&fragment);
        }
        assert_eq!(joined, "Hello,\nWorld!\t\"Escaped\"A");
    }

    #[tokio::test]
    async fn chunked_reader_flushes_at_fragment_boundary() {
        let mut p = Parser::new(FragmentSource::new([r#""abc"#, r#"def""#]));
        let mut chunks = p.read_string_chunked().await.unwrap();
        let first = chunks.next_fragment().await.unwrap();
        assert_eq!(first, Some("abc".to_string()));
        let second = chunks.next_fragment().await.unwrap();
        assert_eq!(second, Some("def".to_string()));
        let third = chunks.next_fragment().await.unwrap();
        assert_eq!(third, None);
    }
}
