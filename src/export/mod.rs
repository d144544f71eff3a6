//! Export of a curated tree as parent/child relation and identifier tables.
//!
//! The [Exporter] derives a unique display name for every reachable vertex
//! from resolved branch metadata and leaf metadata rows, then renders:
//! - `tree_parent_child_relations.tsv`: `parent`, `child` (and `rank`) rows
//! - `genome_id_map.tsv`: headerless `identifier`, `node name` rows
//!
//! All rows are computed before the output directory is touched. Tabs and
//! line breaks in names, identifiers and ranks are replaced by `_` so every
//! row keeps its column count.

use crate::config::{CurationConfig, OverwritePolicy};
use crate::curate::resolve::BranchMetadata;
use crate::error::{CurationError, Result};
use crate::metadata::{LeafKeyer, MetadataTable};
use crate::model::{Tree, VertexIndex};
use crate::newick;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the relation table.
pub const RELATIONS_FILE: &str = "tree_parent_child_relations.tsv";
/// File name of the identifier map.
pub const GENOME_MAP_FILE: &str = "genome_id_map.tsv";
/// Name part written for a missing branch value.
pub const MISSING_NAME_PART: &str = "None";

/// One `parent → child` edge of the relation table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationRow {
    pub parent: String,
    pub child: String,
    /// Present iff rank columns are configured; empty when the child has no rank
    pub rank: Option<String>,
}

/// Everything an export writes, computed up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTables {
    /// Display name of every reachable vertex
    pub names: HashMap<VertexIndex, String>,
    pub relations: Vec<RelationRow>,
    /// `(identifier, node name)` rows
    pub genome_map: Vec<(String, String)>,
    /// Whether the relation table carries a rank column
    pub with_rank: bool,
}

// =#========================================================================#=
// EXPORTER
// =#========================================================================#=
/// Renders names and tables for a curated, read-only tree.
pub struct Exporter<'a> {
    tree: &'a Tree,
    config: &'a CurationConfig,
    branch_metadata: Option<&'a BranchMetadata>,
    leaf_metadata: Option<(&'a MetadataTable, &'a dyn LeafKeyer)>,
    additional_genomes: Option<&'a BTreeMap<String, BTreeSet<String>>>,
}

impl<'a> Exporter<'a> {
    pub fn new(tree: &'a Tree, config: &'a CurationConfig) -> Self {
        Exporter {
            tree,
            config,
            branch_metadata: None,
            leaf_metadata: None,
            additional_genomes: None,
        }
    }

    pub fn with_branch_metadata(mut self, metadata: &'a BranchMetadata) -> Self {
        self.branch_metadata = Some(metadata);
        self
    }

    /// Leaf names and identifiers are taken from the table rows the keyer finds.
    pub fn with_leaf_metadata(mut self, table: &'a MetadataTable, keyer: &'a dyn LeafKeyer) -> Self {
        self.leaf_metadata = Some((table, keyer));
        self
    }

    /// Extra `leaf name → identifiers` for the identifier map.
    pub fn with_additional_genomes(mut self, genomes: &'a BTreeMap<String, BTreeSet<String>>) -> Self {
        self.additional_genomes = Some(genomes);
        self
    }

    /// Computes names, relation rows and identifier rows.
    pub fn tables(&self) -> Result<ExportTables> {
        if !self.tree.is_root_set() || !self.tree.is_valid() {
            return Err(CurationError::invariant("export", "tree to export is not valid"));
        }

        let names = self.node_names();
        let with_rank = !self.config.rank_columns.is_empty();
        let relations = self.relation_rows(&names, with_rank);
        let genome_map = self.genome_rows(&names);

        Ok(ExportTables {
            names,
            relations,
            genome_map,
            with_rank,
        })
    }

    /// Unique display names: branches first (pre-order), then leaves (pre-order).
    pub fn node_names(&self) -> HashMap<VertexIndex, String> {
        let tree = self.tree;
        let config = self.config;
        let mut names = HashMap::new();
        let mut used = HashSet::new();

        let mut unnamed = 0;
        for branch in tree.branches() {
            let fallback = match tree.name(branch) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => {
                    unnamed += 1;
                    format!("{}{}", config.branch_basename, unnamed - 1)
                }
            };
            let name = match self.branch_parts(branch) {
                Some(parts) => compose(&config.branch_basename, &parts, config),
                None => fallback,
            };
            let name = tsv_field(&name).into_owned();
            names.insert(branch, unique(name, &mut used));
        }

        for leaf in tree.leaves() {
            let label = tree.name(leaf).unwrap_or_default();
            let name = match self.leaf_parts(label) {
                Some(parts) => compose(&config.leaf_basename, &parts, config),
                None => label.to_string(),
            };
            let name = tsv_field(&name).into_owned();
            if name != label {
                debug!(leaf = label, name = %name, "renamed leaf");
            }
            names.insert(leaf, unique(name, &mut used));
        }

        names
    }

    /// Name parts of a branch, or `None` if no (non-stripped) column is assigned to it.
    fn branch_parts(&self, branch: VertexIndex) -> Option<Vec<String>> {
        let metadata = self.branch_metadata?;
        let config = self.config;
        let mut parts = Vec::new();
        let mut any = false;

        for column in &config.branch_columns {
            let Some(assignment) = metadata.get(branch, column) else {
                continue;
            };
            if config.strip_rank_columns && config.rank_columns.contains(column) {
                continue;
            }
            any = true;
            match assignment.value.name_part(column) {
                Some(part) => parts.push(part),
                None if config.skip_missing_metadata => {}
                None => parts.push(MISSING_NAME_PART.to_string()),
            }
        }

        any.then_some(parts)
    }

    /// Name parts of a leaf, or `None` if it has no metadata row.
    fn leaf_parts(&self, label: &str) -> Option<Vec<String>> {
        let (table, keyer) = self.leaf_metadata?;
        let row = table.get(&keyer.key(label)?)?;
        Some(
            self.config
                .columns
                .iter()
                .filter_map(|column| row.get(column)?.name_part(column))
                .collect(),
        )
    }

    fn relation_rows(&self, names: &HashMap<VertexIndex, String>, with_rank: bool) -> Vec<RelationRow> {
        let tree = self.tree;
        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        for leaf in tree.leaves() {
            let mut path: Vec<VertexIndex> = tree.ancestors(leaf).collect();
            path.reverse();
            path.push(leaf);

            let mut parent_name = self.config.root_linker.as_deref().map(|linker| tsv_field(linker).into_owned());
            for vertex in path {
                let child_name = names.get(&vertex).cloned().unwrap_or_default();
                if let Some(parent) = parent_name {
                    let rank = with_rank.then(|| self.rank_of(vertex, &parent, &child_name));
                    let row = RelationRow {
                        parent,
                        child: child_name.clone(),
                        rank,
                    };
                    if seen.insert(row.clone()) {
                        rows.push(row);
                    }
                }
                parent_name = Some(child_name);
            }
        }

        rows
    }

    fn rank_of(&self, vertex: VertexIndex, parent: &str, child: &str) -> String {
        let Some(metadata) = self.branch_metadata else {
            return String::new();
        };
        let ranks = metadata.ranks(vertex, &self.config.rank_columns);
        if ranks.len() > 1 {
            warn!(parent, child, ranks = ?ranks, "multiple ranks for one relation, metadata is ambiguous");
        }
        tsv_field(&ranks.join(",")).into_owned()
    }

    fn genome_rows(&self, names: &HashMap<VertexIndex, String>) -> Vec<(String, String)> {
        let tree = self.tree;
        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        if let Some((table, keyer)) = self.leaf_metadata {
            for leaf in tree.leaves() {
                let label = tree.name(leaf).unwrap_or_default();
                let Some(id) = keyer.key(label).filter(|id| table.get(id).is_some()) else {
                    continue;
                };
                let row = (tsv_field(&id).into_owned(), names.get(&leaf).cloned().unwrap_or_default());
                if seen.insert(row.clone()) {
                    rows.push(row);
                }
            }
        }

        for (genome, ids) in self.additional_genomes.into_iter().flatten() {
            let name = match tree.find_leaf(genome) {
                Some(leaf) => names.get(&leaf).cloned().unwrap_or_default(),
                None => {
                    warn!(genome = %genome, "additional genome not found among leaves, keeping its name");
                    tsv_field(genome).into_owned()
                }
            };
            for id in ids {
                let row = (tsv_field(id).into_owned(), name.clone());
                if seen.insert(row.clone()) {
                    rows.push(row);
                }
            }
        }

        rows
    }

    /// Computes all tables and checks `dir` against `policy` without writing anything.
    ///
    /// # Errors
    /// [CurationError::OutputExists] if `dir` exists and `policy` is
    /// [OverwritePolicy::Fail].
    pub fn prepare<P: AsRef<Path>>(&self, dir: P, policy: OverwritePolicy) -> Result<PreparedExport> {
        let dir = dir.as_ref();
        let tables = self.tables()?;

        if dir.exists() {
            match policy {
                OverwritePolicy::Fail => return Err(CurationError::OutputExists(dir.to_path_buf())),
                OverwritePolicy::Force => warn!(dir = %dir.display(), "writing into existing output directory"),
            }
        }

        Ok(PreparedExport {
            dir: dir.to_path_buf(),
            tables,
        })
    }

    /// Computes all tables, then writes them into `dir`.
    ///
    /// # Errors
    /// [CurationError::OutputExists] if `dir` exists and `policy` is
    /// [OverwritePolicy::Fail]; nothing is written in that case.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P, policy: OverwritePolicy) -> Result<ExportTables> {
        self.prepare(dir, policy)?.commit()
    }
}

/// Export tables bound to an output directory that passed the overwrite check.
#[derive(Debug, Clone)]
pub struct PreparedExport {
    dir: PathBuf,
    tables: ExportTables,
}

impl PreparedExport {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tables(&self) -> &ExportTables {
        &self.tables
    }

    /// Creates the directory and writes both tables into it.
    pub fn commit(self) -> Result<ExportTables> {
        let PreparedExport { dir, tables } = self;
        std::fs::create_dir_all(&dir)?;

        {
            let mut writer = tsv_writer(&dir.join(RELATIONS_FILE))?;
            if tables.with_rank {
                writer.write_record(["parent", "child", "rank"])?;
            } else {
                writer.write_record(["parent", "child"])?;
            }
            for row in &tables.relations {
                match &row.rank {
                    Some(rank) => writer.write_record([&row.parent, &row.child, rank])?,
                    None => writer.write_record([&row.parent, &row.child])?,
                }
            }
            writer.flush()?;
        }

        {
            let mut writer = tsv_writer(&dir.join(GENOME_MAP_FILE))?;
            for (id, name) in &tables.genome_map {
                writer.write_record([id, name])?;
            }
            writer.flush()?;
        }

        info!(
            dir = %dir.display(),
            relations = tables.relations.len(),
            genomes = tables.genome_map.len(),
            "export written"
        );
        Ok(tables)
    }
}

/// Writes the curated tree and, if requested, the export tables.
///
/// The export is prepared first: a rejected output directory (or any other
/// export error) aborts before the Newick file is created. The tree goes to
/// `newick_path`, or to stdout if that is `None`.
///
/// # Returns
/// The written tables, if an export was requested
pub fn write_outputs(
    tree: &Tree,
    newick_path: Option<&Path>,
    export: Option<(&Exporter<'_>, &Path)>,
) -> Result<Option<ExportTables>> {
    let prepared = export
        .map(|(exporter, dir)| exporter.prepare(dir, exporter.config.overwrite_policy))
        .transpose()?;

    match newick_path {
        Some(path) => newick::write_newick_file(File::create(path)?, tree)?,
        None => newick::write_newick(io::stdout().lock(), tree)?,
    }
    debug!(path = ?newick_path, "curated tree written");

    prepared.map(PreparedExport::commit).transpose()
}

/// Replaces the characters that would split a tab-separated row.
fn tsv_field(field: &str) -> Cow<'_, str> {
    if !field.contains(['\t', '\n', '\r']) {
        return Cow::Borrowed(field);
    }
    let safe = field.replace(['\t', '\n', '\r'], "_");
    warn!(original = ?field, written = %safe, "replaced tab or line break in exported field");
    Cow::Owned(safe)
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path)?;
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .has_headers(false)
        .flexible(true)
        .from_writer(BufWriter::new(file)))
}

/// Joins name parts, falling back to (or prefixing with) the basename.
fn compose(basename: &str, parts: &[String], config: &CurationConfig) -> String {
    if parts.is_empty() {
        basename.to_string()
    } else if config.keep_basenames {
        format!("{basename}{}{}", config.name_separator, parts.join(&config.name_separator))
    } else {
        parts.join(&config.name_separator)
    }
}

/// Returns `name`, or `name_2`, `name_3`, ... if taken, and marks the result as used.
fn unique(name: String, used: &mut HashSet<String>) -> String {
    let mut candidate = name.clone();
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{name}_{n}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

// =#========================================================================#=
// RELATION TABLE READING
// =#========================================================================#=
/// Reads a relation table written by [Exporter::write_to_dir].
pub fn read_relations_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RelationRow>> {
    read_relations(File::open(path)?)
}

/// Reads relation rows from tab-separated text with a `parent child [rank]` header.
pub fn read_relations<R: Read>(reader: R) -> Result<Vec<RelationRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let with_rank = reader.headers()?.get(2) == Some("rank");
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(RelationRow {
            parent: record.get(0).unwrap_or_default().to_string(),
            child: record.get(1).unwrap_or_default().to_string(),
            rank: with_rank.then(|| record.get(2).unwrap_or_default().to_string()),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_appends_counter() {
        let mut used = HashSet::new();
        assert_eq!(unique("x".to_string(), &mut used), "x");
        assert_eq!(unique("x".to_string(), &mut used), "x_2");
        assert_eq!(unique("x".to_string(), &mut used), "x_3");
        assert_eq!(unique("x_2".to_string(), &mut used), "x_2_2");
    }

    #[test]
    fn test_tsv_field_replaces_separators() {
        assert!(matches!(tsv_field("Francisella"), Cow::Borrowed("Francisella")));
        assert_eq!(tsv_field("a\tb\r\nc"), "a_b__c");
    }

    #[test]
    fn test_compose_basename_rules() {
        let config = CurationConfig::new();
        let parts = vec!["Francisella".to_string(), "tularensis".to_string()];
        assert_eq!(compose("branch", &parts, &config), "Francisella_tularensis");
        assert_eq!(compose("branch", &[], &config), "branch");

        let keep = CurationConfig::new().with_keep_basenames();
        assert_eq!(compose("branch", &parts, &keep), "branch_Francisella_tularensis");
    }
}
