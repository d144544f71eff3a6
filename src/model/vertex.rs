//! Vertex module for the curation tree.

use crate::model::tree::VertexIndex;
use std::fmt;
use std::ops::Deref;

// =#========================================================================#=
// VERTEX KIND
// =#========================================================================#=
/// Whether a vertex is a dataset leaf or an internal branch vertex.
///
/// The kind is fixed when the vertex is created; a branch that loses all its
/// children stays a branch (a *dead branch*) until it is deleted.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum VertexKind {
    /// Terminal vertex representing one dataset/sample, always named
    Leaf,
    /// Internal vertex grouping its children, optionally named
    Branch,
}

// =#========================================================================#=
// VERTEX
// =#========================================================================#=
/// Represents a vertex in an arena-backed, n-ary phylogenetic tree.
///
/// # Invariants
/// - `index` is the position in the arena and never changes or gets reused
/// - `parent` is `None` for the root and for detached vertices; it never owns
/// - `children` is the ordered list of owned child indices; empty for leaves
/// - `branch_length` is the distance to the parent; a missing value reads as `0.0`
/// - `deleted` marks a tombstone; deleted vertices are never reachable
#[derive(PartialEq, Debug, Clone)]
pub struct Vertex {
    index: VertexIndex,
    kind: VertexKind,
    name: Option<String>,
    parent: Option<VertexIndex>,
    children: Vec<VertexIndex>,
    branch_length: Option<BranchLength>,
    deleted: bool,
}

impl Vertex {
    /// Creates a new leaf vertex.
    ///
    /// # Arguments
    /// * `index` - The unique index of this vertex in the tree (arena)
    /// * `name` - Dataset label of the leaf
    /// * `branch_length` - Distance to parent vertex
    pub fn new_leaf(index: VertexIndex, name: String, branch_length: Option<BranchLength>) -> Self {
        Vertex {
            index,
            kind: VertexKind::Leaf,
            name: Some(name),
            parent: None,
            children: Vec::new(),
            branch_length,
            deleted: false,
        }
    }

    /// Creates a new branch vertex with the given children.
    ///
    /// Children's parent references are not touched; that is done by the tree.
    pub fn new_branch(
        index: VertexIndex,
        name: Option<String>,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
    ) -> Self {
        Vertex {
            index,
            kind: VertexKind::Branch,
            name,
            parent: None,
            children,
            branch_length,
            deleted: false,
        }
    }

    /// Returns the arena index of this vertex.
    pub fn index(&self) -> VertexIndex {
        self.index
    }

    /// Returns the [VertexKind] of this vertex.
    pub fn kind(&self) -> VertexKind {
        self.kind
    }

    /// Returns whether this vertex is a dataset leaf.
    pub fn is_leaf(&self) -> bool {
        self.kind == VertexKind::Leaf
    }

    /// Returns whether this vertex is a branch (internal) vertex.
    pub fn is_branch(&self) -> bool {
        self.kind == VertexKind::Branch
    }

    /// Returns the name (label) of this vertex, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Returns the parent index; `None` for the root or detached vertices.
    pub fn parent(&self) -> Option<VertexIndex> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<VertexIndex>) {
        self.parent = parent;
    }

    /// Returns the ordered children of this vertex.
    pub fn children(&self) -> &[VertexIndex] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<VertexIndex> {
        &mut self.children
    }

    /// Returns the [BranchLength] to the parent, if one was given.
    pub fn branch_length(&self) -> Option<BranchLength> {
        self.branch_length
    }

    pub(crate) fn set_branch_length(&mut self, branch_length: Option<BranchLength>) {
        self.branch_length = branch_length;
    }

    /// Returns the distance to the parent, reading a missing branch length as `0.0`.
    pub fn distance(&self) -> f64 {
        self.branch_length.map_or(0.0, |b| *b)
    }

    /// Returns whether this vertex has been deleted from the tree.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
        self.parent = None;
        self.children.clear();
    }
}

// =#========================================================================#=
// BRANCH LENGTH
// =#========================================================================#=
/// Non-negative, finite distance from a vertex to its parent.
#[derive(PartialEq, PartialOrd, Debug, Clone, Copy)]
pub struct BranchLength(f64);

impl BranchLength {
    /// Creates a new branch length.
    ///
    /// # Panics
    /// Panics if `length` is negative or not finite;
    /// use [BranchLength::try_new] for values from untrusted input.
    pub fn new(length: f64) -> Self {
        assert!(length >= 0.0, "Branch length must be non-negative, got {}", length);
        assert!(length.is_finite(), "Branch length must be finite, got {}", length);
        BranchLength(length)
    }

    /// Creates a new branch length, returning `None` for negative or non-finite values.
    pub fn try_new(length: f64) -> Option<Self> {
        (length >= 0.0 && length.is_finite()).then_some(BranchLength(length))
    }
}

impl Deref for BranchLength {
    type Target = f64;
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl fmt::Display for BranchLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
