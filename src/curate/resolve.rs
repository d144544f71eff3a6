//! Branch metadata resolution by exact leaf-set matching.

use crate::error::{CurationError, Result};
use crate::metadata::{ColumnPartition, LeafKeyer, MetadataTable, MetadataValue};
use crate::model::{LeafSetIndex, Tree, VertexIndex, sets_equal};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Pass name used in errors and logs.
pub const PASS: &str = "resolve";

/// A value attached to a branch for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub value: MetadataValue,
    /// `false` for an exact leaf-set match, `true` if inherited from an ancestor
    pub inherited: bool,
}

// =#========================================================================#=
// BRANCH METADATA
// =#========================================================================#=
/// Branch vertex → column → [Assignment].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchMetadata {
    assignments: BTreeMap<VertexIndex, BTreeMap<String, Assignment>>,
}

impl BranchMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assignment of `column` at `branch`, exact or inherited.
    pub fn get(&self, branch: VertexIndex, column: &str) -> Option<&Assignment> {
        self.assignments.get(&branch)?.get(column)
    }

    /// All assignments of a branch.
    pub fn assignments(&self, branch: VertexIndex) -> Option<&BTreeMap<String, Assignment>> {
        self.assignments.get(&branch)
    }

    /// Branches with at least one assignment, in index order.
    pub fn branches(&self) -> impl Iterator<Item = VertexIndex> + '_ {
        self.assignments.keys().copied()
    }

    /// Rank columns matched exactly at `branch`, in the order of `rank_columns`.
    ///
    /// Inherited assignments never make a rank.
    pub fn ranks<'c>(&self, branch: VertexIndex, rank_columns: &'c [String]) -> Vec<&'c str> {
        rank_columns
            .iter()
            .filter(|column| self.get(branch, column).is_some_and(|a| !a.inherited))
            .map(String::as_str)
            .collect()
    }

    /// Number of branches with assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    fn assign(&mut self, branch: VertexIndex, column: &str, assignment: Assignment) {
        self.assignments
            .entry(branch)
            .or_default()
            .insert(column.to_string(), assignment);
    }
}

// =#========================================================================#=
// RESOLUTION
// =#========================================================================#=
/// Builds one [ColumnPartition] per column from a table and resolves them.
pub fn resolve_from_table(
    tree: &Tree,
    table: &MetadataTable,
    keyer: &dyn LeafKeyer,
    columns: &[String],
    apply_downstream: bool,
) -> Result<BranchMetadata> {
    let partitions: Vec<ColumnPartition> = columns
        .iter()
        .map(|column| ColumnPartition::from_table(tree, table, keyer, column))
        .collect();
    resolve_partitions(tree, &partitions, apply_downstream)
}

/// Assigns each partition's values to the branches whose leaf set equals the value's group.
///
/// Leaf sets are computed fresh from the tree. With `apply_downstream`, every
/// branch strictly below an exactly matched branch inherits its assignment;
/// exact matches are never overwritten and the nearest matched ancestor wins.
///
/// # Errors
/// [CurationError::Configuration] if two different values of one column
/// match the same branch.
pub fn resolve_partitions(tree: &Tree, partitions: &[ColumnPartition], apply_downstream: bool) -> Result<BranchMetadata> {
    let leaf_sets = LeafSetIndex::build(tree);
    let branches = tree.branches();
    let mut metadata = BranchMetadata::new();

    for partition in partitions {
        let column = partition.column();
        for (value, group) in partition.groups() {
            if group.is_empty() {
                continue;
            }
            for &branch in &branches {
                let Some(set) = leaf_sets.cached(branch) else {
                    continue;
                };
                if !sets_equal(set, group) {
                    continue;
                }

                match metadata.get(branch, column) {
                    Some(existing) if existing.value != *value => {
                        return Err(CurationError::Configuration(format!(
                            "column '{column}' is ambiguous at branch {}: values '{}' and '{value}' match the same leaves",
                            tree.describe(branch),
                            existing.value
                        )));
                    }
                    Some(_) => {}
                    None => {
                        debug!(branch = %tree.describe(branch), column, value = %value, "matched branch");
                        metadata.assign(
                            branch,
                            column,
                            Assignment {
                                value: value.clone(),
                                inherited: false,
                            },
                        );
                    }
                }
            }
        }
    }

    let exact = metadata.len();
    if apply_downstream {
        inherit_downstream(tree, &mut metadata);
    }

    info!(matched = exact, assigned = metadata.len(), columns = partitions.len(), "branch metadata resolved");
    Ok(metadata)
}

/// Propagates assignments from every branch to the branches below it.
///
/// Walks in pre-order, so each branch sees its parent's final assignments.
fn inherit_downstream(tree: &Tree, metadata: &mut BranchMetadata) {
    for branch in tree.branches() {
        let Some(parent) = tree.parent(branch) else {
            continue;
        };
        let Some(from_parent) = metadata.assignments(parent).cloned() else {
            continue;
        };
        for (column, assignment) in from_parent {
            if metadata.get(branch, &column).is_some_and(|a| !a.inherited) {
                continue;
            }
            metadata.assign(
                branch,
                &column,
                Assignment {
                    value: assignment.value,
                    inherited: true,
                },
            );
        }
    }
}
