//! Low-level reading infrastructure for tree text.
//!
//! [ByteParser] provides byte-level primitives, [ParsingError] reports
//! failures with position and context. The Newick grammar itself lives in
//! [crate::newick].

pub mod byte_parser;
pub mod parsing_error;
pub mod utils;

pub use byte_parser::ByteParser;
pub use parsing_error::{ParsingError, ParsingErrorType};
