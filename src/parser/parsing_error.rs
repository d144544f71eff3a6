//! Error type for Newick parsing.
//!
//! [ParsingError] carries a [ParsingErrorType], the byte position at which
//! parsing failed and a short excerpt of the input from that position.

use crate::parser::byte_parser::ByteParser;
use std::error::Error;
use std::fmt;

/// Default length of context provided by error from parser
const DEFAULT_CONTEXT_LENGTH: usize = 50;

// =#========================================================================#=
// PARSING ERROR TYPE
// =#========================================================================#=
/// Kinds of errors that can occur while reading a Newick tree.
#[derive(PartialEq, Debug, Clone)]
pub enum ParsingErrorType {
    IoError(String),
    UnexpectedEOF,
    UnclosedComment,
    UnclosedQuote,
    InvalidNewickString(String),
    InvalidBranchLength(String),
    EmptyLeafLabel,
}

// =#========================================================================#=
// PARSING ERROR
// =#========================================================================#=
/// Parsing error with contextual information (position and following bytes).
#[derive(Debug)]
pub struct ParsingError {
    kind: ParsingErrorType,
    position: usize,
    context: String,
}

impl ParsingError {
    /// Creates a ParsingError from an error type and the parser state.
    pub fn from_parser(kind: ParsingErrorType, parser: &ByteParser) -> Self {
        Self {
            kind,
            position: parser.position(),
            context: parser.get_context_as_string(DEFAULT_CONTEXT_LENGTH),
        }
    }

    /// Convenience constructor for UnexpectedEOF
    pub fn unexpected_eof(parser: &ByteParser) -> Self {
        Self::from_parser(ParsingErrorType::UnexpectedEOF, parser)
    }

    /// Convenience constructor for UnclosedComment
    pub fn unclosed_comment(parser: &ByteParser) -> Self {
        Self::from_parser(ParsingErrorType::UnclosedComment, parser)
    }

    /// Convenience constructor for UnclosedQuote
    pub fn unclosed_quote(parser: &ByteParser) -> Self {
        Self::from_parser(ParsingErrorType::UnclosedQuote, parser)
    }

    /// Convenience constructor for InvalidNewickString
    pub fn invalid_newick_string(parser: &ByteParser, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidNewickString(msg), parser)
    }

    /// Convenience constructor for InvalidBranchLength
    pub fn invalid_branch_length(parser: &ByteParser, raw: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidBranchLength(raw), parser)
    }

    /// Convenience constructor for EmptyLeafLabel
    pub fn empty_leaf_label(parser: &ByteParser) -> Self {
        Self::from_parser(ParsingErrorType::EmptyLeafLabel, parser)
    }

    /// Get the error kind
    pub fn kind(&self) -> &ParsingErrorType {
        &self.kind
    }

    /// Get the position where the error occurred
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ParsingErrorType::IoError(msg) => return write!(f, "IO error - {msg}"),
            ParsingErrorType::UnexpectedEOF => write!(f, "Unexpected end of input")?,
            ParsingErrorType::UnclosedComment => write!(f, "Unclosed comment")?,
            ParsingErrorType::UnclosedQuote => write!(f, "Unclosed quoted label")?,
            ParsingErrorType::InvalidNewickString(msg) => {
                write!(f, "Invalid newick string: {msg}")?
            }
            ParsingErrorType::InvalidBranchLength(raw) => {
                write!(f, "Invalid branch length '{raw}'")?
            }
            ParsingErrorType::EmptyLeafLabel => write!(f, "Leaf without label")?,
        }

        write!(f, " at position {}", self.position)?;

        if !self.context.is_empty() {
            write!(f, "\n  Context (next {} bytes): {}", self.context.len(), self.context)?;
        }

        Ok(())
    }
}

impl Error for ParsingError {}

impl From<std::io::Error> for ParsingError {
    fn from(err: std::io::Error) -> Self {
        ParsingError {
            kind: ParsingErrorType::IoError(err.to_string()),
            position: 0,
            context: String::new(),
        }
    }
}
