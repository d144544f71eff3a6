//! Low-level byte-by-byte parser for ASCII tree text.
//!
//! [ByteParser] owns the full input in memory and offers the peek/consume
//! primitives the Newick reader is built on: whitespace and `[...]` comment
//! skipping, quote-aware label parsing and context extraction for errors.

use crate::parser::parsing_error::ParsingError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

// =#========================================================================#=
// BYTE PARSER
// =#========================================================================#=
/// A byte-by-byte parser over an owned, in-memory input.
///
/// Tree files handled by this crate are single trees, so the whole input is
/// loaded up front and parsed from a cursor.
///
/// # Example
/// ```
/// use phylocurate::parser::ByteParser;
///
/// let mut parser = ByteParser::for_str("  [a comment] (A,B);");
/// parser.skip_comment_and_whitespace().unwrap();
/// assert_eq!(parser.peek(), Some(b'('));
/// ```
pub struct ByteParser {
    input: Vec<u8>,
    pos: usize,
}

impl ByteParser {
    /// Creates a parser over a copy of the given string.
    pub fn for_str(input: &str) -> Self {
        Self {
            input: input.as_bytes().to_vec(),
            pos: 0,
        }
    }

    /// Creates a parser over the bytes of the given vector.
    pub fn for_bytes(input: Vec<u8>) -> Self {
        Self { input, pos: 0 }
    }

    /// Reads the whole file into memory and creates a parser over it.
    ///
    /// # Errors
    /// Returns a [ParsingError] of kind `IoError` if the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ParsingError> {
        let mut contents = Vec::new();
        let mut file = File::open(path)?;
        file.read_to_end(&mut contents)?;
        Ok(Self::for_bytes(contents))
    }

    /// Reads everything from the given reader (e.g. stdin) and creates a parser over it.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ParsingError> {
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents)?;
        Ok(Self::for_bytes(contents))
    }

    /// Peeks at the current byte without consuming it; `None` at EOF.
    #[inline(always)]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Returns the current byte and advances past it; `None` at EOF.
    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Returns whether the current byte equals `ch`.
    #[inline]
    pub fn peek_is(&self, ch: u8) -> bool {
        self.peek() == Some(ch)
    }

    /// Consumes the current byte if it equals `ch`.
    ///
    /// # Returns
    /// `true` if the byte was matched and consumed
    pub fn consume_if(&mut self, ch: u8) -> bool {
        if self.peek_is(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skips spaces, tabs, newlines and carriage returns.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Skips a `[...]` comment if one starts at the current position.
    ///
    /// # Returns
    /// * `Ok(true)` - A comment was consumed
    /// * `Ok(false)` - No comment at the current position
    /// * `Err(ParsingError)` - The comment is never closed
    pub fn skip_comment(&mut self) -> Result<bool, ParsingError> {
        if !self.peek_is(b'[') {
            return Ok(false);
        }

        let start = self.pos;
        while let Some(b) = self.next_byte() {
            if b == b']' {
                return Ok(true);
            }
        }

        self.pos = start;
        Err(ParsingError::unclosed_comment(self))
    }

    /// Skips any run of whitespace and comments.
    pub fn skip_comment_and_whitespace(&mut self) -> Result<(), ParsingError> {
        self.skip_whitespace();
        while self.skip_comment()? {
            self.skip_whitespace();
        }

        Ok(())
    }

    /// Returns whether the whole input has been consumed.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Returns the current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns up to `k` bytes from the current position as a (lossy) string,
    /// used as error context.
    pub fn get_context_as_string(&self, k: usize) -> String {
        let end = (self.pos + k).min(self.input.len());
        String::from_utf8_lossy(&self.input[self.pos.min(end)..end]).into_owned()
    }

    /// Parses a quoted or unquoted label, skipping leading whitespace and comments.
    ///
    /// Unquoted labels end at any of the given `delimiters`. The returned label
    /// may be empty if a delimiter follows immediately.
    pub fn parse_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        self.skip_comment_and_whitespace()?;

        if self.peek_is(b'\'') {
            self.parse_quoted_label()
        } else {
            self.parse_unquoted_label(delimiters)
        }
    }

    /// Parses a label in single quotes; a doubled quote stands for one quote
    /// (`'Wilson''s'` → `Wilson's`).
    ///
    /// # Errors
    /// Returns an `UnclosedQuote` error if input ends before the closing quote.
    pub fn parse_quoted_label(&mut self) -> Result<String, ParsingError> {
        let start = self.pos;
        self.pos += 1; // opening quote

        let mut bytes = Vec::new();
        loop {
            match self.next_byte() {
                Some(b'\'') => {
                    if self.consume_if(b'\'') {
                        bytes.push(b'\'');
                    } else {
                        break;
                    }
                }
                Some(b) => bytes.push(b),
                None => {
                    self.pos = start;
                    return Err(ParsingError::unclosed_quote(self));
                }
            }
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parses an unquoted label up to (not including) the first delimiter.
    pub fn parse_unquoted_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if delimiters.contains(&b) {
                break;
            }
            self.pos += 1;
        }

        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }
}
