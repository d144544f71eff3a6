//! Metadata table keyed by leaf identifier.

use crate::error::{CurationError, Result};
use crate::metadata::MetadataValue;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Column → value for one identifier.
pub type MetadataRow = BTreeMap<String, MetadataValue>;

// =#========================================================================#=
// TABLE OPTIONS
// =#========================================================================#=
/// Options for reading a delimited metadata file.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    /// Field delimiter, tab by default
    pub delimiter: u8,
    /// Zero-based position of the identifier column
    pub id_column: usize,
    /// Only keep these columns (all if `None`)
    pub columns: Option<Vec<String>>,
    /// Remove every `"` from cells
    pub strip_quotes: bool,
    /// Text stored for empty cells instead of [MetadataValue::Missing]
    pub empty_value: Option<String>,
    /// Only keep rows with these identifiers (all if `None`)
    pub ids: Option<BTreeSet<String>>,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            delimiter: b'\t',
            id_column: 0,
            columns: None,
            strip_quotes: false,
            empty_value: None,
            ids: None,
        }
    }
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_id_column(mut self, id_column: usize) -> Self {
        self.id_column = id_column;
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_strip_quotes(mut self) -> Self {
        self.strip_quotes = true;
        self
    }

    pub fn with_empty_value(mut self, value: impl Into<String>) -> Self {
        self.empty_value = Some(value.into());
        self
    }

    pub fn with_ids(mut self, ids: BTreeSet<String>) -> Self {
        self.ids = Some(ids);
        self
    }
}

// =#========================================================================#=
// METADATA TABLE
// =#========================================================================#=
/// Mapping from leaf identifier to its [MetadataRow], plus the ordered list of known columns.
///
/// # Example
/// ```
/// use phylocurate::metadata::{MetadataTable, MetadataValue, TableOptions};
///
/// let tsv = "accession\tgenus\tspecies\nGCA_1\tFrancisella\ttularensis\nGCA_2\tFrancisella\t\n";
/// let table = MetadataTable::from_reader(tsv.as_bytes(), &TableOptions::new()).unwrap();
///
/// assert_eq!(table.columns(), ["genus", "species"]);
/// assert_eq!(table.value("GCA_2", "species"), Some(&MetadataValue::Missing));
/// assert!(table.verify_columns(&["genus".to_string()]).is_ok());
/// assert!(table.verify_columns(&["subspecies".to_string()]).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    columns: Vec<String>,
    rows: BTreeMap<String, MetadataRow>,
}

impl MetadataTable {
    /// Creates an empty table with the given known columns.
    pub fn new(columns: Vec<String>) -> Self {
        MetadataTable {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Reads a delimited file with a header row.
    pub fn from_path<P: AsRef<Path>>(path: P, options: &TableOptions) -> Result<Self> {
        let path = path.as_ref();
        let reader = std::fs::File::open(path)?;
        let table = Self::from_reader(reader, options)?;
        info!(path = %path.display(), rows = table.len(), columns = table.columns.len(), "read metadata table");
        Ok(table)
    }

    /// Reads delimited text with a header row from any reader.
    pub fn from_reader<R: Read>(reader: R, options: &TableOptions) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        if options.id_column >= headers.len() {
            return Err(CurationError::Configuration(format!(
                "identifier column {} out of range, header has {} columns",
                options.id_column,
                headers.len()
            )));
        }

        let clean = |cell: &str| -> String {
            if options.strip_quotes {
                cell.replace('"', "")
            } else {
                cell.to_string()
            }
        };

        // (position in record, column name) of every kept column
        let kept: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != options.id_column)
            .map(|(i, h)| (i, clean(h)))
            .filter(|(_, h)| options.columns.as_ref().is_none_or(|cols| cols.contains(h)))
            .collect();

        let mut table = MetadataTable::new(kept.iter().map(|(_, h)| h.clone()).collect());
        for record in reader.records() {
            let record = record?;
            let Some(id) = record.get(options.id_column).map(clean) else {
                continue;
            };
            if options.ids.as_ref().is_some_and(|ids| !ids.contains(&id)) {
                continue;
            }

            let row: MetadataRow = kept
                .iter()
                .map(|(i, column)| {
                    let cell = clean(record.get(*i).unwrap_or(""));
                    let value = match (&options.empty_value, cell.is_empty()) {
                        (Some(replacement), true) => MetadataValue::Text(replacement.clone()),
                        _ => MetadataValue::from_cell(&cell),
                    };
                    (column.clone(), value)
                })
                .collect();
            table.insert_row(id, row);
        }

        Ok(table)
    }

    /// Inserts (or replaces) the row of an identifier; new columns are appended to the known columns.
    pub fn insert_row(&mut self, id: impl Into<String>, row: MetadataRow) {
        let id = id.into();
        for column in row.keys() {
            if !self.columns.contains(column) {
                self.columns.push(column.clone());
            }
        }
        if self.rows.insert(id.clone(), row).is_some() {
            warn!(id = %id, "duplicate metadata row, keeping the later one");
        }
    }

    /// Known columns in header order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, id: &str) -> Option<&MetadataRow> {
        self.rows.get(id)
    }

    /// Value of a column for an identifier; `None` if the identifier or column is absent.
    pub fn value(&self, id: &str, column: &str) -> Option<&MetadataValue> {
        self.rows.get(id)?.get(column)
    }

    /// Identifiers in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Checks that every requested column appears in at least one row.
    ///
    /// # Errors
    /// [CurationError::Configuration] listing all missing columns.
    pub fn verify_columns(&self, requested: &[String]) -> Result<()> {
        let missing: Vec<&str> = requested
            .iter()
            .filter(|column| !self.rows.values().any(|row| row.contains_key(*column)))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CurationError::Configuration(format!(
                "columns not found in metadata: {}",
                missing.join(", ")
            )))
        }
    }

    /// Expands a column of `;`-separated CanSNP assignments into one boolean column per CanSNP.
    ///
    /// Every row gets `true` for each CanSNP it lists and `false` for the other
    /// expanded ones; the master column is removed. In `column_list`, the master
    /// column is replaced in place by the expanded columns.
    ///
    /// # Arguments
    /// * `column` - Name of the CanSNP master column
    /// * `wanted` - CanSNPs to expand, in output order; every CanSNP found (first-seen order) if empty
    /// * `column_list` - Column selection to rewrite
    ///
    /// # Errors
    /// [CurationError::Configuration] if a CanSNP collides with an existing
    /// column of the same row, or if no CanSNP is found.
    ///
    /// # Returns
    /// The expanded CanSNP columns
    pub fn expand_cansnp_column(
        &mut self,
        column: &str,
        wanted: &[String],
        column_list: &mut Vec<String>,
    ) -> Result<Vec<String>> {
        let mut wanted_unique: Vec<String> = Vec::new();
        for cansnp in wanted {
            if !wanted_unique.contains(cansnp) {
                wanted_unique.push(cansnp.clone());
            }
        }

        // Collect all assignments first, so a collision leaves the table untouched
        let mut found: Vec<String> = Vec::new();
        let mut assigned: Vec<(String, Vec<String>)> = Vec::new();
        for (id, row) in &self.rows {
            let Some(MetadataValue::Text(assignments)) = row.get(column) else {
                continue;
            };
            let mut present = Vec::new();
            for cansnp in assignments.split(';').map(|s| s.trim_matches('"')).filter(|s| !s.is_empty()) {
                if row.contains_key(cansnp) {
                    return Err(CurationError::Configuration(format!(
                        "CanSNP '{cansnp}' of '{id}' in column '{column}' collides with an existing column"
                    )));
                }
                if !wanted_unique.is_empty() && !wanted_unique.iter().any(|w| w == cansnp) {
                    continue;
                }
                if !found.iter().any(|f| f == cansnp) {
                    found.push(cansnp.to_string());
                }
                present.push(cansnp.to_string());
            }
            assigned.push((id.clone(), present));
        }

        if found.is_empty() {
            return Err(CurationError::Configuration(format!(
                "no CanSNPs found in column '{column}'"
            )));
        }

        for (id, present) in assigned {
            if let Some(row) = self.rows.get_mut(&id) {
                for cansnp in present {
                    row.insert(cansnp, MetadataValue::Bool(true));
                }
            }
        }

        let expanded = if wanted_unique.is_empty() { found } else { wanted_unique };
        for row in self.rows.values_mut() {
            row.remove(column);
            for cansnp in &expanded {
                row.entry(cansnp.clone()).or_insert(MetadataValue::Bool(false));
            }
        }

        self.columns.retain(|c| c != column);
        self.columns.extend(expanded.iter().cloned());

        let rewritten: Vec<String> = column_list
            .iter()
            .flat_map(|c| {
                if c == column {
                    expanded.clone()
                } else {
                    vec![c.clone()]
                }
            })
            .collect();
        *column_list = rewritten;

        debug!(column, expanded = expanded.len(), "expanded CanSNP column");
        Ok(expanded)
    }
}

/// Reads a headerless two-column TSV of `identifier<TAB>leaf name` rows.
///
/// # Returns
/// Leaf name → identifiers listed for it
pub fn read_additional_genomes<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, BTreeSet<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path.as_ref())?;

    let mut genomes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut total = 0;
    for record in reader.records() {
        let record = record?;
        let (Some(id), Some(name)) = (record.get(0), record.get(1)) else {
            warn!(line = ?record.position().map(|p| p.line()), "skipping malformed additional genome row");
            continue;
        };
        genomes.entry(name.to_string()).or_default().insert(id.to_string());
        total += 1;
    }

    info!(leaves = genomes.len(), genomes = total, "read additional genomes");
    Ok(genomes)
}
