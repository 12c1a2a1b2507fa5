//! Number lexing (part of §4.B, the token recognizer).

use crate::error::{JsonError, Result};
use crate::parser::Parser;
use crate::source::ChunkSource;

impl<S: ChunkSource> Parser<S> {
    /// Lexes a JSON number starting at the current byte, leaving the
    /// terminator (structural byte, whitespace, or end-of-stream) in the
    /// current slot.
    pub(crate) async fn read_number_body(&mut self) -> Result<f64> {
        let mut text = String::new();

        if self.current() == Some(b'-') {
            text.push('-');
            self.advance().await?;
        }

        match self.current() {
            Some(b'0') => {
                text.push('0');
                self.advance().await?;
            }
            Some(c @ b'1'..=b'9') => {
                text.push(c as char);
                self.advance().await?;
                while let Some(c @ b'0'..=b'9') = self.current() {
                    text.push(c as char);
                    self.advance().await?;
                }
            }
            _ => return Err(JsonError::MalformedNumber(text)),
        }

        if self.current() == Some(b'.') {
            text.push('.');
            self.advance().await?;
            match self.current() {
                Some(c @ b'0'..=b'9') => {
                    text.push(c as char);
                    self.advance().await?;
                }
                _ => return Err(JsonError::MalformedNumber(text)),
            }
            while let Some(c @ b'0'..=b'9') = self.current() {
                text.push(c as char);
                self.advance().await?;
            }
        }

        if matches!(self.current(), Some(b'e' | b'E')) {
            text.push('e');
            self.advance().await?;
            if matches!(self.current(), Some(b'+' | b'-')) {
                text.push(self.current().unwrap() as char);
                self.advance().await?;
            }
            match self.current() {
                Some(c @ b'0'..=b'9') => {
                    text.push(c as char);
                    self.advance().await?;
                }
                _ => return Err(JsonError::MalformedNumber(text)),
            }
            while let Some(c @ b'0'..=b'9') = self.current() {
                text.push(c as char);
                self.advance().await?;
            }
        }

        let value: f64 = text
            .parse()
            .map_err(|_| JsonError::MalformedNumber(text.clone()))?;
        if !value.is_finite() {
            return Err(JsonError::MalformedNumber(text));
        }
        Ok(value)
    }

    pub async fn read_number(&mut self) -> Result<f64> {
        self.check_top_level().await?;
        let value = self.read_number_body().await?;
        self.note_if_top_level_complete();
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::Parser;
    use crate::source::FragmentSource;

    async fn number_of(text: &str) -> f64 {
        let mut p = Parser::new(FragmentSource::whole(text));
        p.read_number().await.unwrap()
    }

    #[tokio::test]
    async fn reads_integers_and_floats() {
        assert_eq!(number_of("42").await, 42.0);
        assert_eq!(number_of("-17").await, -17.0);
        assert_eq!(number_of("3.14").await, 3.14);
        assert_eq!(number_of("2.5e10").await, 2.5e10);
        assert_eq!(number_of("-1.5E-3").await, -1.5e-3);
    }

    #[tokio::test]
    async fn leading_zero_stops_after_the_zero() {
        // "012" lexes the single digit "0"; "12" is left trailing. Since "1"
        // itself would start a perfectly legitimate second number, the next
        // top-level read is refused as a second value rather than as a
        // lexical error.
        let mut p = Parser::new(FragmentSource::whole("012"));
        let value = p.read_number().await.unwrap();
        assert_eq!(value, 0.0);
        let err = p.read_value().await.unwrap_err();
        assert_eq!(err, crate::JsonError::ValueAfterEnd);
    }

    #[tokio::test]
    async fn second_decimal_point_stops_after_first_number() {
        let mut p = Parser::new(FragmentSource::whole("123.45.67"));
        let value = p.read_number().await.unwrap();
        assert_eq!(value, 123.45);
        let err = p.read_value().await.unwrap_err();
        assert_eq!(
            err,
            crate::JsonError::UnexpectedCharacter(crate::error::ByteDesc::Byte(b'.'))
        );
    }

    #[tokio::test]
    async fn chained_exponents_stop_after_first_number() {
        let mut p = Parser::new(FragmentSource::whole("123e4e5"));
        let value = p.read_number().await.unwrap();
        assert_eq!(value, 1.23e6);
        let err = p.read_value().await.unwrap_err();
        assert_eq!(
            err,
            crate::JsonError::UnexpectedCharacter(crate::error::ByteDesc::Byte(b'e'))
        );
    }
}
