//! Mapping leaf labels to metadata rows and classification keys.

use crate::config::MissingPolicy;
use crate::error::{CurationError, Result};
use crate::metadata::{ClassificationKey, MetadataRow, MetadataTable};
use crate::model::{Tree, VertexIndex};
use std::collections::HashMap;
use tracing::warn;

// =#========================================================================#=
// LEAF KEYERS
// =#========================================================================#=
/// Extracts the metadata identifier from a leaf label.
pub trait LeafKeyer {
    /// Returns the identifier for `label`, or `None` if it carries none.
    fn key(&self, label: &str) -> Option<String>;
}

/// Uses the whole label as identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimKeyer;

impl LeafKeyer for VerbatimKeyer {
    fn key(&self, label: &str) -> Option<String> {
        Some(label.to_string())
    }
}

/// Finds a known identifier embedded anywhere in the label.
///
/// When several known identifiers occur, the longest one wins.
///
/// # Example
/// ```
/// use phylocurate::metadata::{LeafKeyer, SubstringKeyer};
///
/// let keyer = SubstringKeyer::new(["GCA_000008985.1", "GCA_000008985.12"]);
/// assert_eq!(
///     keyer.key("Francisella_tularensis_GCA_000008985.12_ASM898v1").as_deref(),
///     Some("GCA_000008985.12")
/// );
/// assert_eq!(keyer.key("unrelated_leaf"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SubstringKeyer {
    ids: Vec<String>,
}

impl SubstringKeyer {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        // Stable sort: longest first, input order among equal lengths
        ids.sort_by_key(|id| std::cmp::Reverse(id.len()));
        SubstringKeyer { ids }
    }

    /// Uses every identifier of a table.
    pub fn from_table(table: &MetadataTable) -> Self {
        Self::new(table.ids())
    }
}

impl LeafKeyer for SubstringKeyer {
    fn key(&self, label: &str) -> Option<String> {
        self.ids.iter().find(|id| label.contains(id.as_str())).cloned()
    }
}

// =#========================================================================#=
// LEAF CLASSIFIER
// =#========================================================================#=
/// Classifies leaves by their metadata row over an ordered column selection.
pub struct LeafClassifier<'a> {
    table: &'a MetadataTable,
    keyer: &'a dyn LeafKeyer,
    columns: Vec<String>,
    dedup: bool,
    policy: MissingPolicy,
}

impl<'a> LeafClassifier<'a> {
    pub fn new(table: &'a MetadataTable, keyer: &'a dyn LeafKeyer, columns: Vec<String>) -> Self {
        LeafClassifier {
            table,
            keyer,
            columns,
            dedup: false,
            policy: MissingPolicy::default(),
        }
    }

    /// Uses the duplicate-suppressing key variant.
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_policy(mut self, policy: MissingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn policy(&self) -> MissingPolicy {
        self.policy
    }

    /// Returns the metadata row for a leaf label, without applying the missing policy.
    pub fn row(&self, label: &str) -> Option<&'a MetadataRow> {
        let id = self.keyer.key(label)?;
        self.table.get(&id)
    }

    /// Returns the identifier a leaf label maps to.
    pub fn identifier(&self, label: &str) -> Option<String> {
        self.keyer.key(label)
    }

    /// Classifies a single leaf label.
    ///
    /// # Returns
    /// * `Ok(Some(key))` - The label has a metadata row
    /// * `Ok(None)` - No row, and the policy is skip or notify
    /// * `Err(MissingMatch)` - No row, and the policy is fatal
    pub fn classify(&self, label: &str) -> Result<Option<ClassificationKey>> {
        match self.row(label) {
            Some(row) => Ok(Some(ClassificationKey::from_row(row, &self.columns, self.dedup))),
            None => match self.policy {
                MissingPolicy::Skip => Ok(None),
                MissingPolicy::Notify => {
                    warn!(leaf = label, "no metadata entry, leaf stays unclassified");
                    Ok(None)
                }
                MissingPolicy::Fatal => Err(CurationError::MissingMatch {
                    leaf: label.to_string(),
                }),
            },
        }
    }

    /// Classifies every reachable leaf once; unclassified leaves are left out of the map.
    pub fn classify_leaves(&self, tree: &Tree) -> Result<HashMap<VertexIndex, ClassificationKey>> {
        let mut keys = HashMap::new();
        for leaf in tree.leaves() {
            let label = tree.name(leaf).unwrap_or_default();
            if let Some(key) = self.classify(label)? {
                keys.insert(leaf, key);
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetadataValue, TableOptions};

    fn table() -> MetadataTable {
        let tsv = "id\tsp\nA\tx\nB\tx\n";
        MetadataTable::from_reader(tsv.as_bytes(), &TableOptions::new()).unwrap()
    }

    #[test]
    fn test_missing_policy() {
        let table = table();
        let keyer = VerbatimKeyer;
        let columns = vec!["sp".to_string()];

        let fatal = LeafClassifier::new(&table, &keyer, columns.clone());
        assert_eq!(fatal.classify("A").unwrap().unwrap().as_str(), "x");
        assert!(matches!(fatal.classify("Z"), Err(CurationError::MissingMatch { .. })));

        let notify = LeafClassifier::new(&table, &keyer, columns).with_policy(MissingPolicy::Notify);
        assert!(notify.classify("Z").unwrap().is_none());
    }

    #[test]
    fn test_row_lookup_through_substring_keyer() {
        let table = table();
        let keyer = SubstringKeyer::from_table(&table);
        let classifier = LeafClassifier::new(&table, &keyer, vec!["sp".to_string()]);
        let row = classifier.row("Kea_B_2019").unwrap();
        assert_eq!(row.get("sp"), Some(&MetadataValue::Text("x".to_string())));
    }
}
