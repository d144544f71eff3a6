//! Cached leaf sets per vertex.
//!
//! The leaf set of a vertex is `{v}` for a leaf and the union of its
//! children's sets otherwise. [LeafSetIndex] caches these sets; the tree never
//! updates them, so passes refresh or invalidate the cache at their own
//! boundaries.

use crate::model::tree::{Tree, VertexIndex};
use std::collections::BTreeSet;

/// Set of leaf vertices below a vertex.
pub type LeafSet = BTreeSet<VertexIndex>;

/// Exact set comparison: same members, order and multiplicity ignored.
pub fn sets_equal(a: &LeafSet, b: &LeafSet) -> bool {
    a == b
}

// =#========================================================================#=
// LEAF SET INDEX
// =#========================================================================#=
/// Per-vertex cache of leaf sets, addressed by [VertexIndex].
///
/// # Example
/// ```
/// use phylocurate::model::{LeafSetIndex, Tree};
///
/// let mut tree = Tree::new();
/// let a = tree.add_leaf("Pukeko", None);
/// let b = tree.add_leaf("Weka", None);
/// let root = tree.add_branch(None, vec![a, b], None);
/// tree.set_root(root);
///
/// let mut index = LeafSetIndex::new();
/// index.refresh_all(&tree);
/// assert_eq!(index.leaf_set(&tree, root).len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct LeafSetIndex {
    sets: Vec<Option<LeafSet>>,
}

impl LeafSetIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index with every reachable vertex's set computed.
    pub fn build(tree: &Tree) -> Self {
        let mut index = Self::new();
        index.refresh_all(tree);
        index
    }

    /// Recomputes the set of every reachable vertex in one post-order sweep.
    pub fn refresh_all(&mut self, tree: &Tree) {
        self.sets.clear();
        self.sets.resize(tree.arena_len(), None);
        for vertex in tree.post_order_iter() {
            let set = self.combine(tree, vertex.index());
            self.sets[vertex.index()] = Some(set);
        }
    }

    /// Returns the leaf set of a vertex, computing missing sets bottom-up first.
    pub fn leaf_set(&mut self, tree: &Tree, index: VertexIndex) -> &LeafSet {
        if self.sets.len() < tree.arena_len() {
            self.sets.resize(tree.arena_len(), None);
        }

        if self.sets[index].is_none() {
            let pending: Vec<VertexIndex> = tree
                .pre_order_iter_from(index)
                .map(|v| v.index())
                .filter(|&v| self.sets[v].is_none())
                .collect();
            // Reverse pre-order visits every child before its parent
            for &vertex in pending.iter().rev() {
                let set = self.combine(tree, vertex);
                self.sets[vertex] = Some(set);
            }
        }

        self.sets[index].get_or_insert_with(LeafSet::new)
    }

    /// Returns the cached set of a vertex without computing it.
    pub fn cached(&self, index: VertexIndex) -> Option<&LeafSet> {
        self.sets.get(index).and_then(Option::as_ref)
    }

    /// Drops the cached sets of a vertex and all its ancestors.
    pub fn invalidate_path(&mut self, tree: &Tree, index: VertexIndex) {
        for vertex in std::iter::once(index).chain(tree.ancestors(index)) {
            if let Some(slot) = self.sets.get_mut(vertex) {
                *slot = None;
            }
        }
    }

    /// Drops every cached set.
    pub fn clear(&mut self) {
        self.sets.clear();
    }

    fn combine(&self, tree: &Tree, index: VertexIndex) -> LeafSet {
        let vertex = &tree[index];
        if vertex.is_leaf() {
            return LeafSet::from([index]);
        }

        let mut set = LeafSet::new();
        for &child in vertex.children() {
            if let Some(child_set) = self.cached(child) {
                set.extend(child_set.iter().copied());
            }
        }
        set
    }
}
