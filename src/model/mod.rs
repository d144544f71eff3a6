//! Tree model for curation.
//!
//! - [Tree]: arena of [Vertex]es with stable [VertexIndex] ids and the
//!   structural mutation primitives used by the curation passes.
//! - [LeafSetIndex]: cached leaf sets per vertex for exact set matching.

/// Phylogenetic tree structure and operations
pub mod tree;
/// Tree vertex and branch length types
pub mod vertex;
/// Cached leaf sets per vertex
pub mod leaf_set;

pub use leaf_set::{LeafSet, LeafSetIndex, sets_equal};
pub use tree::{Tree, VertexIndex};
pub use vertex::{BranchLength, Vertex, VertexKind};
