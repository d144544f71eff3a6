//! Debranching: distance cutoff repositioning, chain contraction and dead-branch cleanup.

use crate::curate::iteration_cap;
use crate::error::{CurationError, Result};
use crate::model::{Tree, VertexIndex};
use tracing::{debug, info};

/// Pass name used in errors and logs.
pub const PASS: &str = "debranch";

/// Counts of the mutations made by [debranch].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DebranchStats {
    /// Leaves moved to a more distant ancestor
    pub repositioned: usize,
    /// Vertices lifted past single-child ancestors
    pub contracted: usize,
    /// Dead branch vertices deleted
    pub deleted: usize,
}

/// Runs all debranching steps with the given distance threshold.
///
/// 1. Every leaf moves under its nearest ancestor farther away than `threshold`.
/// 2. Unnamed dead branches are removed.
/// 3. Every vertex moves under its nearest ancestor with at least two children.
/// 4. Unnamed dead branches are removed.
///
/// Running it again on its own output with the same threshold changes nothing.
///
/// # Example
/// ```
/// use phylocurate::curate::debranch::debranch;
/// use phylocurate::newick::{parse_str, to_newick};
///
/// let mut tree = parse_str("((A:1,B:1)N1:1,(C:1,D:1):5)ROOT;").unwrap();
/// let stats = debranch(&mut tree, 1.5).unwrap();
///
/// // the emptied named clade stays, the unnamed one is removed
/// assert_eq!(stats.repositioned, 4);
/// assert_eq!(stats.deleted, 1);
/// assert_eq!(to_newick(&tree), "(()N1:1,A:2,B:2,C:6,D:6)ROOT;");
/// ```
pub fn debranch(tree: &mut Tree, threshold: f64) -> Result<DebranchStats> {
    if !(threshold.is_finite() && threshold >= 0.0) {
        return Err(CurationError::Configuration(format!(
            "debranch threshold must be a finite number >= 0, got {threshold}"
        )));
    }

    let repositioned = reposition_leaves(tree, threshold)?;
    let mut deleted = remove_dead_branches(tree)?;
    let contracted = contract_chains(tree)?;
    deleted += remove_dead_branches(tree)?;

    let stats = DebranchStats {
        repositioned,
        contracted,
        deleted,
    };
    info!(
        threshold,
        repositioned, contracted, deleted,
        leaves = tree.num_leaves(),
        "debranching done"
    );
    Ok(stats)
}

/// Moves every leaf under its nearest ancestor at cumulative distance `> threshold`.
///
/// Leaves without such an ancestor stay where they are.
///
/// # Errors
/// [CurationError::InvariantViolation] if the cumulative distance from a leaf
/// decreases or stops being finite on the way to the root.
pub fn reposition_leaves(tree: &mut Tree, threshold: f64) -> Result<usize> {
    let mut moved = 0;
    for leaf in tree.leaves() {
        let mut target = None;
        let mut cumulative = 0.0;
        let mut below = leaf;
        for ancestor in tree.ancestors(leaf) {
            let next = cumulative + tree.distance(below);
            if !next.is_finite() || next < cumulative {
                return Err(CurationError::invariant(
                    PASS,
                    format!(
                        "distance from leaf {} to ancestor {} is {next}, after {cumulative} further down",
                        tree.describe(leaf),
                        tree.describe(ancestor)
                    ),
                ));
            }
            cumulative = next;
            if target.is_none() && cumulative > threshold {
                target = Some((ancestor, cumulative));
            }
            below = ancestor;
        }

        if let Some((ancestor, distance)) = target {
            if tree.parent(leaf) != Some(ancestor) {
                debug!(leaf = %tree.describe(leaf), to = %tree.describe(ancestor), distance, "repositioning leaf");
                tree.move_under(leaf, ancestor, distance)?;
                moved += 1;
            }
        }
    }
    Ok(moved)
}

/// Moves every vertex under its nearest ancestor with at least two children.
///
/// Vertices without such an ancestor stay where they are.
pub fn contract_chains(tree: &mut Tree) -> Result<usize> {
    let root = tree.root_index();
    let mut moved = 0;
    for vertex in tree.pre_order_indices() {
        if vertex == root || !tree.is_reachable(vertex) {
            continue;
        }

        let target = tree.ancestors(vertex).find(|&a| tree.children(a).len() >= 2);
        let Some(ancestor) = target else {
            continue;
        };
        if tree.parent(vertex) == Some(ancestor) {
            continue;
        }

        let distance = tree.distance_to_ancestor(vertex, ancestor).ok_or_else(|| {
            CurationError::invariant(PASS, format!("{} lost its ancestor {}", tree.describe(vertex), tree.describe(ancestor)))
        })?;
        debug!(vertex = %tree.describe(vertex), to = %tree.describe(ancestor), distance, "contracting chain");
        tree.move_under(vertex, ancestor, distance)?;
        moved += 1;
    }
    Ok(moved)
}

/// Deletes childless, unnamed branch vertices until none is left.
///
/// The root and named branches are kept even when they have no children.
///
/// Uses a worklist: deleting a vertex re-queues its parent if that became
/// childless, which gives the same result as rescanning the tree.
///
/// # Errors
/// [CurationError::InvariantViolation] if the iteration cap is exceeded.
pub fn remove_dead_branches(tree: &mut Tree) -> Result<usize> {
    let root = tree.root_index();
    let cap = iteration_cap(tree.arena_len());
    let mut worklist: Vec<VertexIndex> = tree
        .post_order_iter()
        .filter(|v| v.is_branch() && v.children().is_empty())
        .map(|v| v.index())
        .collect();

    let mut deleted = 0;
    let mut iterations = 0;
    while let Some(vertex) = worklist.pop() {
        iterations += 1;
        if iterations > cap {
            return Err(CurationError::invariant(
                PASS,
                format!("dead-branch cleanup did not converge within {cap} iterations"),
            ));
        }
        let v = &tree[vertex];
        let named = v.name().is_some_and(|name| !name.is_empty());
        if vertex == root || named || v.is_deleted() || v.is_leaf() || !v.children().is_empty() {
            continue;
        }

        let parent = v.parent();
        debug!(vertex = %tree.describe(vertex), "deleting dead branch");
        tree.delete_vertex(vertex)?;
        deleted += 1;
        if let Some(parent) = parent {
            if tree.children(parent).is_empty() {
                worklist.push(parent);
            }
        }
    }
    Ok(deleted)
}
