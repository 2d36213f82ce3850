//! Errors of the tree string parser.
//!
//! A [ParsingError] records what went wrong ([ParsingErrorType]), the byte
//! offset, and the bytes that follow it. It converts into
//! [ReconError](crate::error::ReconError) when trees are read as part of a
//! reconciliation.

use crate::parser::byte_parser::ByteParser;
use thiserror::Error;

/// Number of bytes quoted after the error position
const CONTEXT_LENGTH: usize = 50;

/// What went wrong while parsing.
#[derive(PartialEq, Debug, Clone, Error)]
pub enum ParsingErrorType {
    #[error("IO error - {0}")]
    IoError(String),
    #[error("Unexpected end of file")]
    UnexpectedEOF,
    #[error("Unclosed comment")]
    UnclosedComment,
    #[error("Invalid newick string: {0}")]
    InvalidNewickString(String),
    /// Leaf names identify gene copies and must be unique
    #[error("Duplicate label - {0}")]
    DuplicateLabel(String),
    #[error("Negative branch length {0}")]
    NegativeBranchLength(f64),
}

/// Parsing error with the position and following bytes of the input.
#[derive(Debug, Error)]
#[error("{kind} at position {position}{}", show_context(.context))]
pub struct ParsingError {
    kind: ParsingErrorType,
    position: usize,
    context: String,
}

fn show_context(context: &str) -> String {
    match context {
        "" => String::new(),
        _ => format!("\n  followed by: {context}"),
    }
}

impl ParsingError {
    /// Error of the given kind at the current position of `parser`.
    pub fn from_parser(kind: ParsingErrorType, parser: &ByteParser) -> Self {
        Self {
            kind,
            position: parser.position(),
            context: parser.context(CONTEXT_LENGTH),
        }
    }

    pub fn unexpected_eof(parser: &ByteParser) -> Self {
        Self::from_parser(ParsingErrorType::UnexpectedEOF, parser)
    }

    pub fn unclosed_comment(parser: &ByteParser) -> Self {
        Self::from_parser(ParsingErrorType::UnclosedComment, parser)
    }

    pub fn invalid_newick_string(parser: &ByteParser, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidNewickString(msg), parser)
    }

    pub fn duplicate_label(parser: &ByteParser, label: String) -> Self {
        Self::from_parser(ParsingErrorType::DuplicateLabel(label), parser)
    }

    pub fn negative_branch_length(parser: &ByteParser, value: f64) -> Self {
        Self::from_parser(ParsingErrorType::NegativeBranchLength(value), parser)
    }

    pub fn kind(&self) -> &ParsingErrorType {
        &self.kind
    }

    /// Byte offset of the error in the input.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl From<std::io::Error> for ParsingError {
    fn from(err: std::io::Error) -> Self {
        ParsingError {
            kind: ParsingErrorType::IoError(err.to_string()),
            position: 0,
            context: String::new(),
        }
    }
}
