//! Leaves grouped by the value of one metadata column.

use crate::metadata::{LeafKeyer, MetadataTable, MetadataValue};
use crate::model::{LeafSet, Tree, VertexIndex};

/// Partition of leaves into value groups for a single column.
///
/// Groups built from a table are disjoint. A partition assembled by hand with
/// [ColumnPartition::add_group] may overlap; the resolver reports the
/// resulting conflicts.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPartition {
    column: String,
    groups: Vec<(MetadataValue, LeafSet)>,
}

impl ColumnPartition {
    /// Creates an empty partition for `column`.
    pub fn new(column: impl Into<String>) -> Self {
        ColumnPartition {
            column: column.into(),
            groups: Vec::new(),
        }
    }

    /// Groups the reachable leaves of `tree` by their value in `column`.
    ///
    /// Leaves without a metadata row or without the column belong to no group.
    /// Empty cells form their own [MetadataValue::Missing] group.
    pub fn from_table(tree: &Tree, table: &MetadataTable, keyer: &dyn LeafKeyer, column: &str) -> Self {
        let mut partition = Self::new(column);
        for leaf in tree.leaves() {
            let value = tree
                .name(leaf)
                .and_then(|label| keyer.key(label))
                .and_then(|id| table.value(&id, column));
            if let Some(value) = value {
                partition.insert(value.clone(), leaf);
            }
        }
        partition
    }

    /// Adds (or extends) the group of `value`.
    pub fn add_group(&mut self, value: MetadataValue, leaves: LeafSet) {
        match self.groups.iter_mut().find(|(v, _)| *v == value) {
            Some((_, set)) => set.extend(leaves),
            None => self.groups.push((value, leaves)),
        }
    }

    fn insert(&mut self, value: MetadataValue, leaf: VertexIndex) {
        self.add_group(value, LeafSet::from([leaf]));
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Groups in first-seen order.
    pub fn groups(&self) -> &[(MetadataValue, LeafSet)] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{TableOptions, VerbatimKeyer};

    #[test]
    fn test_from_table_groups_by_value() {
        let mut tree = Tree::new();
        let a = tree.add_leaf("A", None);
        let b = tree.add_leaf("B", None);
        let c = tree.add_leaf("C", None);
        let d = tree.add_leaf("D", None);
        let root = tree.add_branch(None, vec![a, b, c, d], None);
        tree.set_root(root);

        let tsv = "id\tsp\nA\tx\nB\tx\nC\t\n";
        let table = MetadataTable::from_reader(tsv.as_bytes(), &TableOptions::new()).unwrap();
        let partition = ColumnPartition::from_table(&tree, &table, &VerbatimKeyer, "sp");

        assert_eq!(partition.groups().len(), 2);
        assert_eq!(partition.groups()[0], (MetadataValue::Text("x".to_string()), LeafSet::from([a, b])));
        assert_eq!(partition.groups()[1], (MetadataValue::Missing, LeafSet::from([c])));
    }
}
