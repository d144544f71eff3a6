//! Newick format parser and writer for phylogenetic trees.
//!
//! This module provides [`NewickParser`] to parse Newick format strings into
//! n-ary [`Tree`]s with labelled leaves and optionally labelled internal
//! vertices, and the functions to write them back.
//!
//! # Quick API
//! For simple use cases with default settings:
//! * [`parse_str`] - parses a single string
//! * [`parse_file`] - parses the first tree in a file
//! * [`parse_reader`] - parses the first tree from any reader (e.g. stdin)
//! * [`to_newick`] - renders a tree as a Newick string
//! * [`write_newick_file`] - writes a tree to a file
//!
//! # Format
//! * `tree ::= internal_vertex ';'`
//! * `vertex ::= leaf | internal_vertex`
//! * `internal_vertex ::= '(' vertex { ',' vertex } ')' [label] [branch_length]`
//! * `leaf ::= label [branch_length]`
//! * `branch_length ::= ':' number`
//!
//! Whitespace and `[...]` comments may occur between all elements. Annotations
//! of the extended Newick format (`[&pop_size=0.5]`) are skipped as comments.

mod defs;
mod parser;
pub mod writer;

pub use self::parser::NewickParser;
pub use self::writer::{to_newick, write_newick, write_newick_file};

use crate::model::Tree;
use crate::parser::ParsingError;
use crate::parser::byte_parser::ByteParser;
use std::io::Read;
use std::path::Path;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a single Newick string to obtain a [`Tree`].
///
/// # Example
/// ```
/// use phylocurate::newick::parse_str;
///
/// let tree = parse_str("(Fratercula_cirrhata,(Fratercula_arctica,Fratercula_corniculata)puffins);").unwrap();
/// assert_eq!(tree.num_leaves(), 3);
/// assert_eq!(tree.num_branches(), 2);
/// ```
pub fn parse_str<S: AsRef<str>>(newick: S) -> Result<Tree, ParsingError> {
    let mut byte_parser = ByteParser::for_str(newick.as_ref());
    NewickParser::new().parse(&mut byte_parser)
}

/// Parses the (first) Newick tree in a file.
///
/// # Arguments
/// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
///
/// # Returns
/// * [`Tree`] - Tree parsed from the file
/// * [`ParsingError`] - If file reading fails or Newick format is invalid
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Tree, ParsingError> {
    let mut byte_parser = ByteParser::from_file(path)?;
    NewickParser::new().parse(&mut byte_parser)
}

/// Reads all of `reader` and parses the (first) Newick tree in it.
pub fn parse_reader<R: Read>(reader: R) -> Result<Tree, ParsingError> {
    let mut byte_parser = ByteParser::from_reader(reader)?;
    NewickParser::new().parse(&mut byte_parser)
}
