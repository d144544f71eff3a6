//! Error types for tree curation.

use crate::parser::ParsingError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CurationError>;

/// Errors raised while curating a tree.
///
/// Structural errors and invariant violations indicate a logic bug or a
/// malformed tree and always abort the running pass. Configuration errors and
/// missing matches stem from user input.
#[derive(Debug, Error)]
pub enum CurationError {
    /// A mutation would break the tree shape (cycle, detaching the root, deleting a leaf, ...).
    #[error("structural error in {operation} on vertex {vertex}: {reason}")]
    Structural {
        operation: &'static str,
        vertex: String,
        reason: String,
    },

    /// A fixpoint did not converge or an ordering invariant was broken.
    #[error("invariant violated in {pass}: {detail}")]
    InvariantViolation { pass: &'static str, detail: String },

    /// Requested columns are absent or metadata is ambiguous for a branch.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A leaf has no metadata entry and the missing policy is fatal.
    #[error("no metadata entry for leaf '{leaf}'")]
    MissingMatch { leaf: String },

    /// The export directory exists and overwriting was not allowed.
    #[error("output directory '{}' already exists (use force to overwrite)", .0.display())]
    OutputExists(PathBuf),

    /// Any error, annotated with the pass it aborted.
    #[error("pass '{pass}' failed: {source}")]
    Pass {
        pass: &'static str,
        #[source]
        source: Box<CurationError>,
    },

    #[error("failed to read tree: {0}")]
    Parsing(#[from] ParsingError),

    #[error("failed to read metadata table: {0}")]
    Metadata(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CurationError {
    pub(crate) fn structural(operation: &'static str, vertex: impl Into<String>, reason: impl Into<String>) -> Self {
        CurationError::Structural {
            operation,
            vertex: vertex.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invariant(pass: &'static str, detail: impl Into<String>) -> Self {
        CurationError::InvariantViolation {
            pass,
            detail: detail.into(),
        }
    }

    /// Wraps this error with the name of the pass it aborted.
    ///
    /// Errors that already carry a pass name are returned unchanged.
    pub fn in_pass(self, pass: &'static str) -> Self {
        match self {
            CurationError::Pass { .. } => self,
            other => CurationError::Pass {
                pass,
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, unwrapping any pass annotation.
    pub fn root_cause(&self) -> &CurationError {
        match self {
            CurationError::Pass { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
