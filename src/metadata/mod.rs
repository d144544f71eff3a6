//! Per-leaf metadata and the values derived from it.
//!
//! - [MetadataValue]: tagged cell value (`Missing`, `Bool`, `Text`)
//! - [MetadataTable]: leaf identifier → column → value, read with the `csv` crate
//! - [ClassificationKey]: composite key over ordered columns
//! - [LeafKeyer], [LeafClassifier]: map leaf labels to rows and keys
//! - [ColumnPartition]: leaves grouped by the value of one column

mod classify;
mod partition;
mod table;

pub use classify::{LeafClassifier, LeafKeyer, SubstringKeyer, VerbatimKeyer};
pub use partition::ColumnPartition;
pub use table::{MetadataRow, MetadataTable, TableOptions, read_additional_genomes};

use std::fmt;

// =#========================================================================#=
// METADATA VALUE
// =#========================================================================#=
/// A single metadata cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataValue {
    /// Empty cell or absent column
    Missing,
    /// Flag column, e.g. an expanded CanSNP
    Bool(bool),
    Text(String),
}

impl MetadataValue {
    /// Reads a raw table cell; empty cells become [MetadataValue::Missing].
    pub fn from_cell(cell: &str) -> Self {
        if cell.is_empty() {
            MetadataValue::Missing
        } else {
            MetadataValue::Text(cell.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, MetadataValue::Missing)
    }

    /// Rendering used inside a [ClassificationKey]; missing and empty values become `NA`.
    pub fn key_part(&self) -> String {
        match self {
            MetadataValue::Missing => ClassificationKey::MISSING.to_string(),
            MetadataValue::Text(text) if text.is_empty() => ClassificationKey::MISSING.to_string(),
            other => other.to_string(),
        }
    }

    /// Contribution to an exported node name.
    ///
    /// `Bool(true)` contributes the column name, non-empty text contributes
    /// itself, everything else contributes nothing.
    ///
    /// # Example
    /// ```
    /// use phylocurate::metadata::MetadataValue;
    ///
    /// assert_eq!(MetadataValue::Bool(true).name_part("B.1.2"), Some("B.1.2".to_string()));
    /// assert_eq!(MetadataValue::Bool(false).name_part("B.1.2"), None);
    /// assert_eq!(MetadataValue::from_cell("tularensis").name_part("species"), Some("tularensis".to_string()));
    /// assert_eq!(MetadataValue::from_cell("").name_part("species"), None);
    /// ```
    pub fn name_part(&self, column: &str) -> Option<String> {
        match self {
            MetadataValue::Bool(true) => Some(column.to_string()),
            MetadataValue::Text(text) if !text.is_empty() => Some(text.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Missing => Ok(()),
            MetadataValue::Bool(true) => write!(f, "True"),
            MetadataValue::Bool(false) => write!(f, "False"),
            MetadataValue::Text(text) => write!(f, "{text}"),
        }
    }
}

// =#========================================================================#=
// CLASSIFICATION KEY
// =#========================================================================#=
/// Composite classification of a leaf over an ordered list of columns.
///
/// Rendered values are joined by `||`; missing values render as `NA`.
///
/// # Example
/// ```
/// use phylocurate::metadata::{ClassificationKey, MetadataRow, MetadataValue};
///
/// let mut row = MetadataRow::new();
/// row.insert("genus".to_string(), MetadataValue::from_cell("Francisella"));
/// row.insert("species".to_string(), MetadataValue::from_cell(""));
///
/// let columns = vec!["genus".to_string(), "species".to_string()];
/// let key = ClassificationKey::from_row(&row, &columns, false);
/// assert_eq!(key.as_str(), "Francisella||NA");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassificationKey(String);

impl ClassificationKey {
    pub const SEPARATOR: &'static str = "||";
    pub const MISSING: &'static str = "NA";

    /// Builds the key of a row over `columns`, in column order.
    ///
    /// With `dedup` set, a rendered value equal to an earlier one is dropped,
    /// so `(x, x, y)` gives `x||y`.
    pub fn from_row(row: &MetadataRow, columns: &[String], dedup: bool) -> Self {
        let mut parts: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            let part = row
                .get(column)
                .map_or_else(|| Self::MISSING.to_string(), MetadataValue::key_part);
            if dedup && parts.contains(&part) {
                continue;
            }
            parts.push(part);
        }
        ClassificationKey(parts.join(Self::SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, MetadataValue)]) -> MetadataRow {
        cells.iter().map(|(c, v)| (c.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_key_renders_missing_and_bool() {
        let row = row(&[
            ("genus", MetadataValue::from_cell("Francisella")),
            ("B.1", MetadataValue::Bool(true)),
        ]);
        let columns = vec!["genus".to_string(), "B.1".to_string(), "absent".to_string()];
        assert_eq!(ClassificationKey::from_row(&row, &columns, false).as_str(), "Francisella||True||NA");
    }

    #[test]
    fn test_dedup_key_drops_repeated_values() {
        let row = row(&[
            ("family", MetadataValue::from_cell("x")),
            ("genus", MetadataValue::from_cell("x")),
            ("species", MetadataValue::from_cell("y")),
        ]);
        let columns = vec!["family".to_string(), "genus".to_string(), "species".to_string()];
        assert_eq!(ClassificationKey::from_row(&row, &columns, true).as_str(), "x||y");
        assert_eq!(ClassificationKey::from_row(&row, &columns, false).as_str(), "x||x||y");
    }
}
