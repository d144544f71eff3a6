//! Phylocurate is a library to curate phylogenetic trees against per-leaf
//! metadata.
//!
//! It reads a Newick tree and a delimited metadata table, reshapes the tree
//! and exports it as a parent/child relation table.
//! Core functionality provided:
//! - Newick: Parse n-ary Newick strings with internal labels, write them back.
//! - Tree model: arena of vertices with stable indices and structural
//!   primitives (detach, reattach, delete, merge), see [crate::model].
//! - Curation passes, run by a [Curator] in a fixed order:
//!   - Outgroup removal
//!   - Debranching: move leaves under the nearest ancestor beyond a distance
//!     threshold, contract single-child chains, drop dead branches
//!   - Classification collapse: lift uniformly classified leaf groups
//!   - Leaf-collapse: keep one representative leaf per classification
//!   - Branch metadata resolution by exact leaf-set equality
//! - Export: unique vertex names, `parent/child/rank` relations and an
//!   identifier map, see [crate::export].
//!
//! Every pass either succeeds completely or leaves the tree untouched; errors
//! name the pass and the vertex or column involved.
//!
//! # Example
//! ```
//! use phylocurate::{CurationConfig, Curator, parse_newick_str, to_newick};
//!
//! let mut tree = parse_newick_str("((A:1,B:1):1,(C:1,D:1):5)ROOT;").unwrap();
//! let config = CurationConfig::new().with_debranch_threshold(1.5);
//!
//! Curator::new(&config).run(&mut tree).unwrap();
//! assert_eq!(to_newick(&tree), "(A:2,B:2,C:6,D:6)ROOT;");
//! ```

pub mod config;
pub mod curate;
pub mod error;
pub mod export;
pub mod metadata;
pub mod model;
pub mod newick;
pub mod parser;

pub use crate::config::{CurationConfig, MissingPolicy, OverwritePolicy};
pub use crate::curate::{CurationReport, Curator};
pub use crate::error::{CurationError, Result};
pub use crate::export::Exporter;
pub use crate::model::Tree;
pub use crate::newick::to_newick;

use crate::parser::parsing_error::ParsingError;
use std::path::Path;

// ============================================================================
// Quick Newick API
// ============================================================================
/// Parse a Newick string using default settings.
///
/// See [`newick::parse_str`] for full documentation of this convenience function.
pub fn parse_newick_str<S: AsRef<str>>(newick: S) -> std::result::Result<Tree, ParsingError> {
    newick::parse_str(newick)
}

/// Parse the Newick tree in a file using default settings.
///
/// See [`newick::parse_file`] for full documentation of this convenience function.
pub fn parse_newick_file<P: AsRef<Path>>(path: P) -> std::result::Result<Tree, ParsingError> {
    newick::parse_file(path)
}
