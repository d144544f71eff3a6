//! Tree module for phylogenetic tree curation.
//!
//! This module provides the core data structure for curating phylogenetic trees:
//! - [Tree]: rooted n-ary tree using the arena pattern. Vertices are addressed by
//!   [VertexIndex], children are owned index lists and parents are plain indices.
//! - Structural primitives ([Tree::detach], [Tree::reattach], [Tree::delete_vertex],
//!   [Tree::dissolve], [Tree::merge_single_child], [Tree::move_under]) used by the
//!   curation passes. Named branch vertices are only removed by dissolving or merging.
//! - Traversal via [PreOrderIter], [PostOrderIter] and [AncestorIter].
//!
//! Deleted vertices stay in the arena as tombstones, so indices stay stable
//! for the whole lifetime of a tree.

use crate::error::{CurationError, Result};
use crate::model::vertex::{BranchLength, Vertex};
use std::collections::BTreeMap;

/// Index of a vertex in the tree arena
pub type VertexIndex = usize;

/// *During construction only*, index for unset root.
const NO_ROOT_SET_INDEX: VertexIndex = usize::MAX;

// =#========================================================================#=
// TREE
// =#========================================================================#=
/// A rooted phylogenetic tree with named leaves and optionally named branches.
///
/// # Construction
/// Add vertices bottom-up, then set the root:
/// ```
/// use phylocurate::model::{BranchLength, Tree};
///
/// let mut tree = Tree::new();
/// let kiwi = tree.add_leaf("Kiwi", Some(BranchLength::new(1.0)));
/// let kakapo = tree.add_leaf("Kakapo", Some(BranchLength::new(2.0)));
/// let moa = tree.add_leaf("Moa", Some(BranchLength::new(3.0)));
/// let n1 = tree.add_branch(Some("N1".to_string()), vec![kiwi, kakapo], Some(BranchLength::new(0.5)));
/// let root = tree.add_branch(None, vec![n1, moa], None);
/// tree.set_root(root);
///
/// assert!(tree.is_valid());
/// assert_eq!(tree.num_leaves(), 3);
/// assert_eq!(tree.distance_from_root(kiwi), 1.5);
/// ```
///
/// # Mutation
/// All structural primitives check their preconditions first and return a
/// [CurationError::Structural] without touching the tree if one fails.
/// They never maintain derived data such as leaf sets.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    vertices: Vec<Vertex>,
    root_index: VertexIndex,
}

// ============================================================================
// Construction
// ============================================================================
impl Tree {
    /// Creates an empty tree without root.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty tree with room for `num_vertices` vertices.
    pub fn with_capacity(num_vertices: usize) -> Self {
        Tree {
            vertices: Vec::with_capacity(num_vertices),
            root_index: NO_ROOT_SET_INDEX,
        }
    }

    /// Adds a leaf and returns its index.
    pub fn add_leaf(&mut self, name: impl Into<String>, branch_length: Option<BranchLength>) -> VertexIndex {
        let index = self.vertices.len();
        self.vertices.push(Vertex::new_leaf(index, name.into(), branch_length));
        index
    }

    /// Adds a branch vertex over the given (parentless) children and returns its index.
    ///
    /// # Panics
    /// Panics if a child index is out of bounds.
    pub fn add_branch(
        &mut self,
        name: Option<String>,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
    ) -> VertexIndex {
        let index = self.vertices.len();
        for &child in &children {
            self.vertices[child].set_parent(Some(index));
        }
        self.vertices.push(Vertex::new_branch(index, name, children, branch_length));
        index
    }

    /// Sets the root of the tree.
    pub fn set_root(&mut self, index: VertexIndex) {
        self.root_index = index;
    }

    /// Validates the tree structure and all index references.
    ///
    /// Checks that the root is set and alive, that every reachable vertex is
    /// alive and visited exactly once, that parent and child references agree,
    /// and that leaves are named and childless.
    ///
    /// # Returns
    /// `true` if the tree is structurally valid, `false` otherwise
    pub fn is_valid(&self) -> bool {
        let Some(root) = self.vertices.get(self.root_index) else {
            return false;
        };
        if root.is_deleted() || root.parent().is_some() {
            return false;
        }

        let mut visited = vec![false; self.vertices.len()];
        let mut stack = vec![self.root_index];
        while let Some(index) = stack.pop() {
            if visited[index] {
                return false; // reached twice: cycle or shared child
            }
            visited[index] = true;

            let vertex = &self.vertices[index];
            if vertex.is_leaf() && (!vertex.children().is_empty() || vertex.name().is_none()) {
                return false;
            }

            for &child in vertex.children() {
                match self.vertices.get(child) {
                    Some(c) if !c.is_deleted() && c.parent() == Some(index) => stack.push(child),
                    _ => return false,
                }
            }
        }

        true
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Getters & queries
// ============================================================================
impl Tree {
    /// Returns whether a root has been set.
    pub fn is_root_set(&self) -> bool {
        self.root_index != NO_ROOT_SET_INDEX
    }

    /// Returns the index of the root vertex.
    pub fn root_index(&self) -> VertexIndex {
        self.root_index
    }

    /// Returns the vertex at the given index, or `None` if out of bounds.
    pub fn get(&self, index: VertexIndex) -> Option<&Vertex> {
        self.vertices.get(index)
    }

    /// Number of arena slots, including deleted and detached vertices.
    pub fn arena_len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the parent of a vertex.
    pub fn parent(&self, index: VertexIndex) -> Option<VertexIndex> {
        self.vertices[index].parent()
    }

    /// Returns the ordered children of a vertex.
    pub fn children(&self, index: VertexIndex) -> &[VertexIndex] {
        self.vertices[index].children()
    }

    /// Returns the name of a vertex.
    pub fn name(&self, index: VertexIndex) -> Option<&str> {
        self.vertices[index].name()
    }

    /// Renames a vertex; leaves keep their name if `None` is given.
    pub fn set_name(&mut self, index: VertexIndex, name: Option<String>) {
        let vertex = &mut self.vertices[index];
        if name.is_some() || vertex.is_branch() {
            vertex.set_name(name);
        }
    }

    /// Returns the distance from a vertex to its parent (`0.0` if missing).
    pub fn distance(&self, index: VertexIndex) -> f64 {
        self.vertices[index].distance()
    }

    /// Human readable reference to a vertex for error messages, e.g. `3 'N1'`.
    pub fn describe(&self, index: VertexIndex) -> String {
        match self.vertices.get(index).and_then(|v| v.name()) {
            Some(name) => format!("{index} '{name}'"),
            None => format!("{index}"),
        }
    }

    /// Returns an iterator over the ancestors of a vertex, parent first, root last.
    pub fn ancestors(&self, index: VertexIndex) -> AncestorIter<'_> {
        AncestorIter::new(self, index)
    }

    /// Returns whether `index` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, index: VertexIndex, ancestor: VertexIndex) -> bool {
        self.ancestors(index).any(|a| a == ancestor)
    }

    /// Returns whether the vertex is alive and connected to the root.
    pub fn is_reachable(&self, index: VertexIndex) -> bool {
        match self.vertices.get(index) {
            Some(v) if !v.is_deleted() => {
                index == self.root_index || self.ancestors(index).last() == Some(self.root_index)
            }
            _ => false,
        }
    }

    /// Cumulative distance from a vertex up to one of its ancestors.
    ///
    /// # Returns
    /// `Some(0.0)` if both are the same vertex, `None` if `ancestor` is not an ancestor
    pub fn distance_to_ancestor(&self, index: VertexIndex, ancestor: VertexIndex) -> Option<f64> {
        let mut total = 0.0;
        let mut current = index;
        while current != ancestor {
            total += self.distance(current);
            current = self.parent(current)?;
        }
        Some(total)
    }

    /// Cumulative distance from the root down to a vertex.
    pub fn distance_from_root(&self, index: VertexIndex) -> f64 {
        let mut total = 0.0;
        let mut current = index;
        while let Some(parent) = self.parent(current) {
            total += self.distance(current);
            current = parent;
        }
        total
    }

    /// Returns the children of a vertex that are leaves, in child order.
    pub fn leaf_children(&self, index: VertexIndex) -> Vec<VertexIndex> {
        self.children(index)
            .iter()
            .copied()
            .filter(|&c| self.vertices[c].is_leaf())
            .collect()
    }

    /// Returns the reachable leaves in pre-order.
    pub fn leaves(&self) -> Vec<VertexIndex> {
        self.pre_order_iter().filter(|v| v.is_leaf()).map(|v| v.index()).collect()
    }

    /// Returns the reachable branch vertices in pre-order (root included).
    pub fn branches(&self) -> Vec<VertexIndex> {
        self.pre_order_iter().filter(|v| v.is_branch()).map(|v| v.index()).collect()
    }

    /// Returns the reachable vertices in pre-order.
    pub fn pre_order_indices(&self) -> Vec<VertexIndex> {
        self.pre_order_iter().map(|v| v.index()).collect()
    }

    /// Finds the first reachable leaf (pre-order) with the given name.
    pub fn find_leaf(&self, name: &str) -> Option<VertexIndex> {
        self.pre_order_iter()
            .find(|v| v.is_leaf() && v.name() == Some(name))
            .map(|v| v.index())
    }

    /// Finds the first reachable vertex (pre-order) with the given name.
    pub fn find_vertex(&self, name: &str) -> Option<VertexIndex> {
        self.pre_order_iter().find(|v| v.name() == Some(name)).map(|v| v.index())
    }

    /// Number of reachable leaves.
    pub fn num_leaves(&self) -> usize {
        self.pre_order_iter().filter(|v| v.is_leaf()).count()
    }

    /// Number of reachable branch vertices (root included).
    pub fn num_branches(&self) -> usize {
        self.pre_order_iter().filter(|v| v.is_branch()).count()
    }

    /// Number of reachable vertices.
    pub fn num_vertices(&self) -> usize {
        self.pre_order_iter().count()
    }

    /// Multiset of reachable leaf names, as name → count.
    pub fn leaf_names_multiset(&self) -> BTreeMap<String, usize> {
        let mut names = BTreeMap::new();
        for vertex in self.pre_order_iter().filter(|v| v.is_leaf()) {
            if let Some(name) = vertex.name() {
                *names.entry(name.to_string()).or_insert(0) += 1;
            }
        }
        names
    }

    /// Returns an iterator over the reachable vertices in post-order.
    pub fn post_order_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self, self.root_index)
    }

    /// Returns an iterator over the reachable vertices in pre-order.
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self, self.root_index)
    }

    /// Returns a pre-order iterator over the subtree below (and including) `index`.
    pub fn pre_order_iter_from(&self, index: VertexIndex) -> PreOrderIter<'_> {
        PreOrderIter::new(self, index)
    }
}

impl std::ops::Index<VertexIndex> for Tree {
    type Output = Vertex;

    fn index(&self, index: VertexIndex) -> &Self::Output {
        &self.vertices[index]
    }
}

// ============================================================================
// Structural mutation
// ============================================================================
impl Tree {
    /// Removes a vertex from its parent's child list.
    ///
    /// The vertex keeps its own branch length and subtree.
    ///
    /// # Errors
    /// [CurationError::Structural] if the vertex is the root, deleted or already detached.
    pub fn detach(&mut self, index: VertexIndex) -> Result<()> {
        const OP: &str = "detach";
        self.check_alive(OP, index)?;
        if index == self.root_index {
            return Err(CurationError::structural(OP, self.describe(index), "cannot detach the root"));
        }
        let Some(parent) = self.vertices[index].parent() else {
            return Err(CurationError::structural(OP, self.describe(index), "vertex is already detached"));
        };

        self.vertices[parent].children_mut().retain(|&c| c != index);
        self.vertices[index].set_parent(None);
        Ok(())
    }

    /// Appends a detached vertex to the children of `new_parent` with the given distance.
    ///
    /// # Errors
    /// [CurationError::Structural] if the vertex is still attached, if `new_parent` is
    /// the vertex itself or one of its descendants, a leaf or deleted, or if
    /// `distance` is negative or not finite.
    pub fn reattach(&mut self, index: VertexIndex, new_parent: VertexIndex, distance: f64) -> Result<()> {
        const OP: &str = "reattach";
        self.check_alive(OP, index)?;
        if index == self.root_index || self.vertices[index].parent().is_some() {
            return Err(CurationError::structural(OP, self.describe(index), "vertex is still attached"));
        }
        let length = self.check_attach_target(OP, index, new_parent, distance)?;

        self.link(index, new_parent, length);
        Ok(())
    }

    /// Moves a vertex (with its subtree) under `new_parent`: detach followed by reattach.
    ///
    /// Preconditions of both steps are checked before anything is changed.
    pub fn move_under(&mut self, index: VertexIndex, new_parent: VertexIndex, distance: f64) -> Result<()> {
        const OP: &str = "move_under";
        self.check_alive(OP, index)?;
        if index == self.root_index {
            return Err(CurationError::structural(OP, self.describe(index), "cannot move the root"));
        }
        let length = self.check_attach_target(OP, index, new_parent, distance)?;

        self.detach(index)?;
        self.link(index, new_parent, length);
        Ok(())
    }

    /// Deletes a childless, unnamed branch vertex; its parent loses it as a child.
    ///
    /// # Errors
    /// [CurationError::Structural] if the vertex is the root, a dataset leaf,
    /// a named branch, still has children or is already deleted.
    pub fn delete_vertex(&mut self, index: VertexIndex) -> Result<()> {
        const OP: &str = "delete_vertex";
        self.check_alive(OP, index)?;
        if index == self.root_index {
            return Err(CurationError::structural(OP, self.describe(index), "cannot delete the root"));
        }
        let vertex = &self.vertices[index];
        if vertex.is_leaf() {
            return Err(CurationError::structural(OP, self.describe(index), "dataset leaves cannot be deleted"));
        }
        if vertex.name().is_some_and(|name| !name.is_empty()) {
            return Err(CurationError::structural(OP, self.describe(index), "named branch vertices are kept"));
        }
        if !vertex.children().is_empty() {
            return Err(CurationError::structural(
                OP,
                self.describe(index),
                format!("vertex still has {} children", vertex.children().len()),
            ));
        }

        if let Some(parent) = vertex.parent() {
            self.vertices[parent].children_mut().retain(|&c| c != index);
        }
        self.vertices[index].mark_deleted();
        Ok(())
    }

    /// Dissolves a branch vertex into its parent, named or not.
    ///
    /// Every child is appended to the parent's children with its distance
    /// extended by the vertex's own, then the emptied vertex is deleted.
    ///
    /// # Returns
    /// Number of children lifted to the parent
    pub fn dissolve(&mut self, index: VertexIndex) -> Result<usize> {
        const OP: &str = "dissolve";
        self.check_alive(OP, index)?;
        if index == self.root_index {
            return Err(CurationError::structural(OP, self.describe(index), "cannot dissolve the root"));
        }
        let vertex = &self.vertices[index];
        if vertex.is_leaf() {
            return Err(CurationError::structural(OP, self.describe(index), "dataset leaves cannot be dissolved"));
        }
        let Some(parent) = vertex.parent() else {
            return Err(CurationError::structural(OP, self.describe(index), "vertex is detached"));
        };
        let own = vertex.distance();
        let children = vertex.children().to_vec();

        // all summed distances are checked before the first child moves
        let mut lengths = Vec::with_capacity(children.len());
        for &child in &children {
            let summed = self.distance(child) + own;
            let Some(length) = BranchLength::try_new(summed) else {
                return Err(CurationError::structural(
                    OP,
                    self.describe(child),
                    format!("invalid summed distance {summed}"),
                ));
            };
            lengths.push(length);
        }

        for (child, length) in children.iter().zip(lengths) {
            self.link(*child, parent, length);
        }
        self.vertices[parent].children_mut().retain(|&c| c != index);
        self.vertices[index].mark_deleted();
        Ok(children.len())
    }

    /// Replaces a single-child branch vertex by its child.
    ///
    /// The child takes the vertex's slot in the parent's child list with the
    /// summed distance, the vertex is deleted.
    ///
    /// # Returns
    /// Index of the lifted child
    pub fn merge_single_child(&mut self, index: VertexIndex) -> Result<VertexIndex> {
        const OP: &str = "merge_single_child";
        self.check_alive(OP, index)?;
        if index == self.root_index {
            return Err(CurationError::structural(OP, self.describe(index), "cannot merge the root"));
        }
        let vertex = &self.vertices[index];
        if vertex.children().len() != 1 {
            return Err(CurationError::structural(
                OP,
                self.describe(index),
                format!("expected exactly one child, found {}", vertex.children().len()),
            ));
        }
        let Some(parent) = vertex.parent() else {
            return Err(CurationError::structural(OP, self.describe(index), "vertex is detached"));
        };
        let child = vertex.children()[0];
        let summed = vertex.distance() + self.distance(child);
        let Some(length) = BranchLength::try_new(summed) else {
            return Err(CurationError::structural(OP, self.describe(index), format!("invalid summed distance {summed}")));
        };

        for slot in self.vertices[parent].children_mut().iter_mut() {
            if *slot == index {
                *slot = child;
            }
        }
        self.vertices[child].set_parent(Some(parent));
        self.vertices[child].set_branch_length(Some(length));
        self.vertices[index].mark_deleted();
        Ok(child)
    }

    fn link(&mut self, index: VertexIndex, parent: VertexIndex, length: BranchLength) {
        self.vertices[parent].children_mut().push(index);
        self.vertices[index].set_parent(Some(parent));
        self.vertices[index].set_branch_length(Some(length));
    }

    fn check_alive(&self, operation: &'static str, index: VertexIndex) -> Result<()> {
        match self.vertices.get(index) {
            None => Err(CurationError::structural(operation, index.to_string(), "no such vertex")),
            Some(v) if v.is_deleted() => {
                Err(CurationError::structural(operation, self.describe(index), "vertex is deleted"))
            }
            Some(_) => Ok(()),
        }
    }

    fn check_attach_target(
        &self,
        operation: &'static str,
        index: VertexIndex,
        new_parent: VertexIndex,
        distance: f64,
    ) -> Result<BranchLength> {
        self.check_alive(operation, new_parent)?;
        if self.vertices[new_parent].is_leaf() {
            return Err(CurationError::structural(
                operation,
                self.describe(index),
                format!("target {} is a leaf", self.describe(new_parent)),
            ));
        }
        if new_parent == index || self.is_descendant_of(new_parent, index) {
            return Err(CurationError::structural(
                operation,
                self.describe(index),
                format!("target {} lies in its own subtree (cycle)", self.describe(new_parent)),
            ));
        }
        BranchLength::try_new(distance).ok_or_else(|| {
            CurationError::structural(operation, self.describe(index), format!("invalid distance {distance}"))
        })
    }
}

// ============================================================================
// Tree-wide edits
// ============================================================================
impl Tree {
    /// Wedges a new, unnamed zero-length branch vertex between every leaf and its parent.
    ///
    /// Leaves keep their own branch length and their position among the
    /// parent's children. A leaf at the root is left alone.
    ///
    /// # Returns
    /// Number of branch vertices added
    pub fn branchify_leaves(&mut self) -> usize {
        let leaves = self.leaves();
        let mut added = 0;
        for leaf in leaves {
            let Some(parent) = self.parent(leaf) else {
                continue;
            };
            let wedge = self.vertices.len();
            self.vertices.push(Vertex::new_branch(wedge, None, vec![leaf], BranchLength::try_new(0.0)));
            self.vertices[wedge].set_parent(Some(parent));
            self.vertices[leaf].set_parent(Some(wedge));
            for slot in self.vertices[parent].children_mut().iter_mut() {
                if *slot == leaf {
                    *slot = wedge;
                }
            }
            added += 1;
        }
        added
    }

    /// Names every unnamed reachable branch vertex `basename{n}`, counting from 0 in pre-order.
    ///
    /// # Returns
    /// Number of branch vertices named
    pub fn name_unnamed_branches(&mut self, basename: &str) -> usize {
        let unnamed: Vec<VertexIndex> = self
            .pre_order_iter()
            .filter(|v| v.is_branch() && v.name().is_none_or(str::is_empty))
            .map(|v| v.index())
            .collect();

        for (n, &index) in unnamed.iter().enumerate() {
            self.vertices[index].set_name(Some(format!("{basename}{n}")));
        }
        unnamed.len()
    }

    /// Removes the leaf with the given name from the tree.
    ///
    /// Unnamed branch vertices left without children are deleted up the path,
    /// a named one stops the cleanup. A non-root ancestor left with one child
    /// is merged into its parent.
    ///
    /// # Returns
    /// Index of the removed leaf
    pub fn prune_leaf(&mut self, name: &str) -> Result<VertexIndex> {
        const OP: &str = "prune_leaf";
        let Some(leaf) = self.find_leaf(name) else {
            return Err(CurationError::structural(OP, format!("'{name}'"), "no reachable leaf with this name"));
        };
        let Some(mut current) = self.parent(leaf) else {
            return Err(CurationError::structural(OP, self.describe(leaf), "cannot prune the root"));
        };

        self.detach(leaf)?;
        self.vertices[leaf].mark_deleted();

        while current != self.root_index
            && self.children(current).is_empty()
            && self.name(current).is_none_or(str::is_empty)
        {
            let next = self.parent(current);
            self.delete_vertex(current)?;
            match next {
                Some(p) => current = p,
                None => break,
            }
        }
        if current != self.root_index && self.children(current).len() == 1 {
            self.merge_single_child(current)?;
        }

        Ok(leaf)
    }
}

// =#========================================================================#=
// ITERATORS
// =#========================================================================#=
/// Iterator for post-order traversal (children before parents).
///
/// This iterator uses a stack-based approach to traverse the tree without recursion.
/// Each vertex is visited after all its descendants have been visited.
pub struct PostOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<(VertexIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a Tree, start: VertexIndex) -> Self {
        let mut stack = Vec::new();
        if tree.get(start).is_some_and(|v| !v.is_deleted()) {
            stack.push((start, false));
        }
        PostOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let vertex = &self.tree[index];

            if children_visited || vertex.children().is_empty() {
                return Some(vertex);
            }

            self.stack.push((index, true));
            // Push children reversed, so the first child is processed first
            for &child in vertex.children().iter().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }
}

/// Iterator for pre-order traversal (parents before children).
///
/// This iterator uses a stack-based approach to traverse the tree without recursion.
/// Each vertex is visited before any of its descendants.
pub struct PreOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<VertexIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a Tree, start: VertexIndex) -> Self {
        let mut stack = Vec::new();
        if tree.get(start).is_some_and(|v| !v.is_deleted()) {
            stack.push(start);
        }
        PreOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let vertex = &self.tree[index];
        self.stack.extend(vertex.children().iter().rev());
        Some(vertex)
    }
}

/// Iterator over the ancestors of a vertex, from its parent up to the root.
///
/// Stops after as many steps as the arena has slots, so a corrupted parent
/// chain cannot loop forever.
pub struct AncestorIter<'a> {
    tree: &'a Tree,
    current: VertexIndex,
    steps_left: usize,
}

impl<'a> AncestorIter<'a> {
    fn new(tree: &'a Tree, start: VertexIndex) -> Self {
        AncestorIter {
            tree,
            current: start,
            steps_left: tree.arena_len(),
        }
    }
}

impl Iterator for AncestorIter<'_> {
    type Item = VertexIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.steps_left == 0 {
            return None;
        }
        self.steps_left -= 1;
        let parent = self.tree.get(self.current)?.parent()?;
        self.current = parent;
        Some(parent)
    }
}
