//! Classification collapse and leaf-collapse.

use crate::curate::iteration_cap;
use crate::error::{CurationError, Result};
use crate::metadata::{ClassificationKey, LeafClassifier};
use crate::model::{Tree, VertexIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Pass name used in errors and logs.
pub const PASS: &str = "collapse";

/// Pass name of leaf-collapse.
pub const LEAF_PASS: &str = "leaf-collapse";

// ============================================================================
// Classification collapse
// ============================================================================
/// Lifts the leaves of uniformly classified branches into their parent until nothing changes.
///
/// A non-root branch is a candidate when all its children are leaves sharing
/// one [ClassificationKey]. It is collapsed only if the parent's own leaf
/// children carry exactly that key or the parent has no leaf children. The
/// leaves move to the parent with summed distances and the branch is deleted.
///
/// Branches are scanned by increasing distance from the root (ties in
/// pre-order) and every collapse restarts the scan. Leaves the classifier
/// cannot classify block the branch they hang from.
///
/// # Returns
/// Number of collapsed branches
pub fn collapse_classification(tree: &mut Tree, classifier: &LeafClassifier) -> Result<usize> {
    let keys = classifier.classify_leaves(tree)?;
    let cap = iteration_cap(tree.arena_len());

    let mut collapsed = 0;
    let mut iterations = 0;
    loop {
        iterations += 1;
        if iterations > cap {
            return Err(CurationError::invariant(
                PASS,
                format!("classification collapse did not converge within {cap} iterations"),
            ));
        }

        let Some((branch, parent)) = find_candidate(tree, &keys) else {
            break;
        };
        execute_collapse(tree, branch, parent)?;
        collapsed += 1;
    }

    info!(collapsed, iterations, branches = tree.num_branches(), "classification collapse done");
    Ok(collapsed)
}

/// Branch vertices ordered by distance from the root, ties by pre-order position.
fn scan_order(tree: &Tree) -> Vec<VertexIndex> {
    let mut order: Vec<(f64, usize, VertexIndex)> = tree
        .branches()
        .into_iter()
        .enumerate()
        .map(|(position, b)| (tree.distance_from_root(b), position, b))
        .collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    order.into_iter().map(|(_, _, b)| b).collect()
}

/// Key shared by all given leaves; `None` if any is unclassified or keys differ.
fn uniform_key<'k>(leaves: &[VertexIndex], keys: &'k HashMap<VertexIndex, ClassificationKey>) -> Option<&'k ClassificationKey> {
    let (first, rest) = leaves.split_first()?;
    let key = keys.get(first)?;
    rest.iter().all(|leaf| keys.get(leaf) == Some(key)).then_some(key)
}

fn find_candidate(tree: &Tree, keys: &HashMap<VertexIndex, ClassificationKey>) -> Option<(VertexIndex, VertexIndex)> {
    let root = tree.root_index();
    for branch in scan_order(tree) {
        if branch == root {
            continue;
        }
        let children = tree.children(branch);
        if children.is_empty() || !children.iter().all(|&c| tree[c].is_leaf()) {
            continue;
        }
        let Some(key) = uniform_key(children, keys) else {
            continue;
        };
        let Some(parent) = tree.parent(branch) else {
            continue;
        };

        let parent_leaves = tree.leaf_children(parent);
        if parent_leaves.iter().any(|leaf| !keys.contains_key(leaf)) {
            continue; // unclassified leaf at the parent: cannot tell if it agrees
        }
        let parent_keys: BTreeSet<&ClassificationKey> = parent_leaves.iter().filter_map(|leaf| keys.get(leaf)).collect();
        if parent_keys.is_empty() || (parent_keys.len() == 1 && parent_keys.contains(key)) {
            return Some((branch, parent));
        }
    }
    None
}

fn execute_collapse(tree: &mut Tree, branch: VertexIndex, parent: VertexIndex) -> Result<()> {
    debug!(branch = %tree.describe(branch), into = %tree.describe(parent), "collapsing branch");
    tree.dissolve(branch)?;
    Ok(())
}

// ============================================================================
// Leaf-collapse
// ============================================================================
/// Outcome of [collapse_leaves].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LeafCollapseReport {
    /// Surviving leaf name → names of the leaves discarded in its favour
    pub discarded: BTreeMap<String, Vec<String>>,
    /// Branches replaced by their single remaining child
    pub merged: usize,
}

impl LeafCollapseReport {
    /// Total number of discarded leaves.
    pub fn num_discarded(&self) -> usize {
        self.discarded.values().map(Vec::len).sum()
    }
}

/// Reduces the leaf children of every branch to one representative per classification key.
///
/// Without a classifier all leaf children of a branch form one group. In each
/// group of more than one leaf the leaf with the smallest branch length (first
/// in child order on ties) stays and the others are detached. A non-root
/// branch left with a single child is then replaced by that child.
/// Leaves the classifier cannot classify are left alone.
pub fn collapse_leaves(tree: &mut Tree, classifier: Option<&LeafClassifier>) -> Result<LeafCollapseReport> {
    let keys = classifier.map(|c| c.classify_leaves(tree)).transpose()?;
    let mut report = LeafCollapseReport::default();

    for branch in tree.branches() {
        if !tree.is_reachable(branch) {
            continue;
        }

        let mut groups: Vec<(Option<&ClassificationKey>, Vec<VertexIndex>)> = Vec::new();
        for leaf in tree.leaf_children(branch) {
            let key = match &keys {
                Some(keys) => match keys.get(&leaf) {
                    Some(key) => Some(key),
                    None => continue,
                },
                None => None,
            };
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(leaf),
                None => groups.push((key, vec![leaf])),
            }
        }

        for (_, members) in groups.into_iter().filter(|(_, m)| m.len() > 1) {
            let mut best = members[0];
            for &leaf in &members[1..] {
                if tree.distance(leaf) < tree.distance(best) {
                    best = leaf;
                }
            }

            let mut discarded = Vec::with_capacity(members.len() - 1);
            for &leaf in members.iter().filter(|&&l| l != best) {
                tree.detach(leaf)?;
                discarded.push(tree.name(leaf).unwrap_or_default().to_string());
            }
            let best_name = tree.name(best).unwrap_or_default().to_string();
            debug!(best = %best_name, discarded = ?discarded, "collapsed leaves");
            report.discarded.entry(best_name).or_default().extend(discarded);
        }

        if tree.children(branch).len() == 1 && tree.parent(branch).is_some() {
            tree.merge_single_child(branch)?;
            report.merged += 1;
        }
    }

    info!(discarded = report.num_discarded(), merged = report.merged, "leaf-collapse done");
    Ok(report)
}
