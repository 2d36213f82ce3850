//! Cursor over the bytes of a tree string or file.
//!
//! [ByteParser] is the tokenizer under the Newick parser: it skips
//! whitespace and `[...]` comments, reads quoted and unquoted labels and
//! scans numbers. Matching is exact; Newick punctuation has no case.

use crate::parser::parsing_error::ParsingError;
use std::fs;
use std::path::Path;

/// Bytes treated as whitespace between tokens.
const WHITESPACE: &[u8] = b" \t\n\r";

// =#========================================================================#=
// BYTE PARSER
// =#========================================================================#=
/// Byte cursor over an owned buffer.
///
/// # Example
/// ```
/// use dlcrecon::parser::ByteParser;
///
/// let mut parser = ByteParser::from_str("  [gene family 7] (a1,b1);");
/// parser.skip_comment_and_whitespace().unwrap();
/// assert_eq!(parser.peek(), Some(b'('));
/// ```
pub struct ByteParser {
    input: Vec<u8>,
    pos: usize,
}

// ============================================================================
// New (pub)
// ============================================================================
impl ByteParser {
    /// Copies the bytes into a new parser.
    pub fn from_bytes(input: &[u8]) -> Self {
        Self {
            input: input.to_vec(),
            pos: 0,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &str) -> Self {
        Self::from_bytes(input.as_bytes())
    }

    /// Reads a whole file into a new parser.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self {
            input: fs::read(path)?,
            pos: 0,
        })
    }
}

// ============================================================================
// Cursor (pub)
// ============================================================================
impl ByteParser {
    #[inline(always)]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Returns the current byte and moves past it.
    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    pub fn peek_is(&self, byte: u8) -> bool {
        self.peek() == Some(byte)
    }

    /// Moves past the current byte if it is `byte`.
    pub fn consume_if(&mut self, byte: u8) -> bool {
        let matched = self.peek_is(byte);
        if matched {
            self.pos += 1;
        }
        matched
    }

    /// Moves forward to the next `target`; with [ConsumeMode::Inclusive]
    /// also past it.
    ///
    /// Returns `false` if the input ends before `target`.
    pub fn consume_until(&mut self, target: u8, mode: ConsumeMode) -> bool {
        self.take_while(|b| b != target);
        if self.is_eof() {
            return false;
        }
        if mode == ConsumeMode::Inclusive {
            self.pos += 1;
        }
        true
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Up to `k` bytes from the cursor on, for error messages.
    pub fn context(&self, k: usize) -> String {
        let start = self.pos.min(self.input.len());
        let end = (start + k).min(self.input.len());
        String::from_utf8_lossy(&self.input[start..end]).into_owned()
    }
}

// ============================================================================
// Tokens (pub)
// ============================================================================
impl ByteParser {
    /// Skips whitespace and `[...]` comments in any interleaving.
    ///
    /// # Errors
    /// [ParsingError] of kind `UnclosedComment` if a `[` is never closed.
    pub fn skip_comment_and_whitespace(&mut self) -> Result<(), ParsingError> {
        loop {
            self.take_while(|b| WHITESPACE.contains(&b));
            if !self.consume_if(b'[') {
                return Ok(());
            }
            if !self.consume_until(b']', ConsumeMode::Inclusive) {
                return Err(ParsingError::unclosed_comment(self));
            }
        }
    }

    /// Reads a label, single quoted or up to the first of `delimiters`.
    ///
    /// Quoted labels may contain any byte; a doubled quote stands for one
    /// quote (`'Wilson''s'` reads as `Wilson's`). Unquoted labels are kept
    /// verbatim, underscores included, so that names survive a round trip.
    pub fn parse_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        self.skip_comment_and_whitespace()?;
        if !self.consume_if(b'\'') {
            let raw = self.take_while(|b| !delimiters.contains(&b));
            return Ok(String::from_utf8_lossy(raw).into_owned());
        }

        let mut label = Vec::new();
        loop {
            match self.next_byte() {
                None => return Err(ParsingError::unexpected_eof(self)),
                Some(b'\'') if self.consume_if(b'\'') => label.push(b'\''),
                Some(b'\'') => return Ok(String::from_utf8_lossy(&label).into_owned()),
                Some(b) => label.push(b),
            }
        }
    }

    /// Scans a decimal number, scientific notation included.
    ///
    /// # Errors
    /// [ParsingError] of kind `InvalidNewickString` if the scanned bytes
    /// are no number.
    pub fn parse_number(&mut self) -> Result<f64, ParsingError> {
        let raw = self.take_while(|b| b.is_ascii_digit() || b"+-.eE".contains(&b));
        let text = String::from_utf8_lossy(raw).into_owned();
        text.parse().map_err(|_| {
            ParsingError::invalid_newick_string(self, format!("Invalid number: {text:?}"))
        })
    }
}

impl ByteParser {
    /// Advances while `keep` holds and returns the bytes passed.
    fn take_while(&mut self, keep: impl Fn(u8) -> bool) -> &[u8] {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }
}

/// Whether [ByteParser::consume_until] stops before or after its target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConsumeMode {
    Inclusive,
    Exclusive,
}
