//! phylocurate - curate a Newick tree against leaf metadata

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use phylocurate::config::{CurationConfig, MissingPolicy, OverwritePolicy};
use phylocurate::curate::Curator;
use phylocurate::export::{self, Exporter};
use phylocurate::metadata::{LeafKeyer, MetadataTable, SubstringKeyer, TableOptions, VerbatimKeyer, read_additional_genomes};
use phylocurate::newick;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Curate a phylogenetic tree: debranch, collapse by classification,
/// resolve branch metadata and export relation tables
#[derive(Parser, Debug)]
#[command(name = "phylocurate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Newick tree file, or `-` for stdin
    tree: String,

    /// Where to write the curated Newick tree (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Delimited metadata table with a header row
    #[arg(short, long)]
    metadata: Option<PathBuf>,

    /// Field delimiter of the metadata table
    #[arg(long, default_value = "\t")]
    sep: char,

    /// 0-based index of the identifier column
    #[arg(long, default_value = "0")]
    id_column: usize,

    /// Remove double quotes from metadata cells
    #[arg(long)]
    strip_quotes: bool,

    /// Value written into empty metadata cells
    #[arg(long)]
    empty_value: Option<String>,

    /// How leaf labels are matched to metadata identifiers
    #[arg(long, value_enum, default_value = "verbatim")]
    match_ids: IdMatching,

    /// Leaf to remove before any other pass
    #[arg(long)]
    outgroup: Option<String>,

    /// Debranch with this distance threshold
    #[arg(long)]
    debranch: Option<f64>,

    /// Metadata columns classifying leaves (and naming them), in order
    #[arg(short, long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Suppress repeated values in classification keys
    #[arg(long)]
    dedup_key: bool,

    /// Collapse branches whose leaves share one classification
    #[arg(long)]
    collapse: bool,

    /// Keep one leaf per classification under each branch
    #[arg(long)]
    collapse_leaves: bool,

    /// What to do with leaves without metadata
    #[arg(long, value_enum, default_value = "fatal")]
    missing: Missing,

    /// Wedge a zero-length branch above every leaf
    #[arg(long)]
    branchify_leaves: bool,

    /// Name unnamed branches `<branch-basename><n>` in the curated tree
    #[arg(long)]
    name_branches: bool,

    /// Metadata columns resolved onto branches, in order
    #[arg(short, long, value_delimiter = ',')]
    branch_columns: Vec<String>,

    /// Branch columns designating a rank
    #[arg(long, value_delimiter = ',')]
    rank_columns: Vec<String>,

    /// Leave rank columns out of exported branch names
    #[arg(long)]
    strip_rank_columns: bool,

    /// Inherit branch metadata down the lineage
    #[arg(long)]
    apply_downstream: bool,

    /// Column of `;`-separated CanSNPs to expand into flag columns
    #[arg(long)]
    cansnp_column: Option<String>,

    /// CanSNPs to expand (default: all found)
    #[arg(long, value_delimiter = ',')]
    cansnps: Vec<String>,

    /// Directory for the relation table and identifier map
    #[arg(short, long)]
    export_dir: Option<PathBuf>,

    /// Write into an existing export directory
    #[arg(short, long)]
    force: bool,

    /// Headerless `identifier<TAB>leaf name` table of extra identifiers for the identifier map
    #[arg(long)]
    additional_genomes: Option<PathBuf>,

    /// Synthetic root name prefixed to every exported path
    #[arg(long)]
    root_linker: Option<String>,

    #[arg(long, default_value = "branch")]
    branch_basename: String,

    #[arg(long, default_value = "leaf")]
    leaf_basename: String,

    #[arg(long, default_value = "_")]
    name_separator: String,

    /// Keep the basename in exported names that carry metadata
    #[arg(long)]
    keep_basenames: bool,

    /// Leave missing values out of exported branch names
    #[arg(long)]
    skip_missing_metadata: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IdMatching {
    /// The whole leaf label is the identifier
    Verbatim,
    /// The longest identifier contained in the label
    Substring,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Missing {
    Skip,
    Notify,
    Fatal,
}

impl From<Missing> for MissingPolicy {
    fn from(missing: Missing) -> Self {
        match missing {
            Missing::Skip => MissingPolicy::Skip,
            Missing::Notify => MissingPolicy::Notify,
            Missing::Fatal => MissingPolicy::Fatal,
        }
    }
}

impl Cli {
    fn config(&self) -> CurationConfig {
        let mut config = CurationConfig::new()
            .with_columns(self.columns.iter().cloned())
            .with_branch_columns(self.branch_columns.iter().cloned())
            .with_rank_columns(self.rank_columns.iter().cloned())
            .with_basenames(self.branch_basename.clone(), self.leaf_basename.clone())
            .with_name_separator(self.name_separator.clone())
            .with_missing_policy(self.missing.into())
            .with_overwrite_policy(if self.force { OverwritePolicy::Force } else { OverwritePolicy::Fail });

        config.debranch_threshold = self.debranch;
        config.dedup_key = self.dedup_key;
        config.collapse_classification = self.collapse;
        config.collapse_leaves = self.collapse_leaves;
        config.branchify_leaves = self.branchify_leaves;
        config.name_branches = self.name_branches;
        config.strip_rank_columns = self.strip_rank_columns;
        config.apply_downstream = self.apply_downstream;
        config.keep_basenames = self.keep_basenames;
        config.skip_missing_metadata = self.skip_missing_metadata;
        config.outgroup = self.outgroup.clone();
        config.root_linker = self.root_linker.clone();
        if let Some(column) = &self.cansnp_column {
            config = config.with_cansnp_column(column.clone(), self.cansnps.iter().cloned());
        }
        config
    }

    fn table_options(&self) -> Result<TableOptions> {
        if !self.sep.is_ascii() {
            bail!("metadata delimiter must be a single ASCII character, got {:?}", self.sep);
        }
        let mut options = TableOptions::new()
            .with_delimiter(self.sep as u8)
            .with_id_column(self.id_column);
        if self.strip_quotes {
            options = options.with_strip_quotes();
        }
        if let Some(value) = &self.empty_value {
            options = options.with_empty_value(value.clone());
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "phylocurate=info".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = cli.config();
    config.validate().context("invalid configuration")?;

    let mut tree = if cli.tree == "-" {
        newick::parse_reader(io::stdin().lock()).context("failed to parse Newick tree from stdin")?
    } else {
        newick::parse_file(&cli.tree).with_context(|| format!("failed to parse Newick tree {}", cli.tree))?
    };
    info!(leaves = tree.num_leaves(), branches = tree.num_branches(), "tree loaded");

    let table = match &cli.metadata {
        Some(path) => {
            let mut table = MetadataTable::from_path(path, &cli.table_options()?)
                .with_context(|| format!("failed to read metadata {}", path.display()))?;
            config
                .expand_cansnps(&mut table)
                .context("failed to expand CanSNP column")?;
            Some(table)
        }
        None => None,
    };

    let keyer: Box<dyn LeafKeyer> = match (cli.match_ids, &table) {
        (IdMatching::Substring, Some(table)) => Box::new(SubstringKeyer::from_table(table)),
        _ => Box::new(VerbatimKeyer),
    };

    let mut curator = Curator::new(&config).with_keyer(keyer.as_ref());
    if let Some(table) = &table {
        curator = curator.with_metadata(table);
    }
    let report = curator.run(&mut tree).context("curation failed")?;
    for line in report.audit_lines() {
        info!("leaf-collapse kept {line}");
    }

    let additional = match (&cli.export_dir, &cli.additional_genomes) {
        (Some(_), Some(path)) => Some(
            read_additional_genomes(path)
                .with_context(|| format!("failed to read additional genomes {}", path.display()))?,
        ),
        _ => None,
    };
    let mut exporter = Exporter::new(&tree, &config).with_branch_metadata(&report.branch_metadata);
    if let Some(table) = &table {
        exporter = exporter.with_leaf_metadata(table, keyer.as_ref());
    }
    if let Some(additional) = &additional {
        exporter = exporter.with_additional_genomes(additional);
    }

    let export = cli.export_dir.as_deref().map(|dir| (&exporter, dir));
    export::write_outputs(&tree, cli.output.as_deref(), export).context("failed to write curated outputs")?;

    Ok(())
}
