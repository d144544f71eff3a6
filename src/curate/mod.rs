//! Curation passes and the pipeline running them.
//!
//! The [Curator] runs the passes in a fixed order on a working copy of the
//! tree and only commits the result if every pass succeeds:
//! 1. outgroup removal
//! 2. [debranch](debranch::debranch)
//! 3. [classification collapse](collapse::collapse_classification)
//! 4. [leaf-collapse](collapse::collapse_leaves)
//! 5. branchifying leaves and naming unnamed branches
//! 6. [branch metadata resolution](resolve::resolve_from_table)
//!
//! Errors are wrapped with the name of the pass they aborted.

pub mod collapse;
pub mod debranch;
pub mod resolve;

use crate::config::CurationConfig;
use crate::error::{CurationError, Result};
use crate::metadata::{LeafClassifier, LeafKeyer, MetadataTable, VerbatimKeyer};
use crate::model::Tree;
use debranch::DebranchStats;
use resolve::BranchMetadata;
use std::collections::BTreeMap;
use tracing::info;

/// Lower bound for fixpoint iteration caps.
pub const MIN_ITERATION_CAP: usize = 64;
/// Upper bound for fixpoint iteration caps.
pub const MAX_ITERATION_CAP: usize = 1_000_000;

/// Iteration cap for a fixpoint over a tree with `num_vertices` arena vertices.
///
/// # Example
/// ```
/// use phylocurate::curate::iteration_cap;
///
/// assert_eq!(iteration_cap(3), 64);
/// assert_eq!(iteration_cap(100), 10_000);
/// assert_eq!(iteration_cap(5_000), 1_000_000);
/// ```
pub fn iteration_cap(num_vertices: usize) -> usize {
    num_vertices
        .saturating_mul(num_vertices)
        .clamp(MIN_ITERATION_CAP, MAX_ITERATION_CAP)
}

static VERBATIM: VerbatimKeyer = VerbatimKeyer;

// =#========================================================================#=
// REPORT
// =#========================================================================#=
/// What a [Curator] run changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurationReport {
    pub pruned_outgroup: Option<String>,
    pub debranch: Option<DebranchStats>,
    pub collapsed_branches: usize,
    /// Surviving leaf name → leaves discarded by leaf-collapse
    pub collapse_audit: BTreeMap<String, Vec<String>>,
    pub branchified: usize,
    pub named_branches: usize,
    pub branch_metadata: BranchMetadata,
}

impl CurationReport {
    /// One `kept: discarded, discarded` line per leaf-collapse representative.
    pub fn audit_lines(&self) -> Vec<String> {
        self.collapse_audit
            .iter()
            .map(|(kept, discarded)| format!("{kept}: {}", discarded.join(", ")))
            .collect()
    }
}

// =#========================================================================#=
// CURATOR
// =#========================================================================#=
/// Runs the configured curation passes on a tree.
///
/// # Example
/// ```
/// use phylocurate::config::CurationConfig;
/// use phylocurate::curate::Curator;
/// use phylocurate::metadata::{MetadataTable, TableOptions};
/// use phylocurate::newick::{parse_str, to_newick};
///
/// let tsv = "id\tsp\nA\tx\nB\tx\nC\ty\nD\ty\n";
/// let table = MetadataTable::from_reader(tsv.as_bytes(), &TableOptions::new()).unwrap();
/// let config = CurationConfig::new()
///     .with_columns(["sp"])
///     .with_branch_columns(["sp"]);
///
/// let mut tree = parse_str("((A:1,B:1)N1:1,(C:1,D:1)N2:1)ROOT;").unwrap();
/// let report = Curator::new(&config).with_metadata(&table).run(&mut tree).unwrap();
///
/// let n1 = tree.find_vertex("N1").unwrap();
/// assert_eq!(report.branch_metadata.get(n1, "sp").unwrap().value.to_string(), "x");
/// ```
pub struct Curator<'a> {
    config: &'a CurationConfig,
    table: Option<&'a MetadataTable>,
    keyer: &'a dyn LeafKeyer,
}

impl<'a> Curator<'a> {
    /// Creates a curator without metadata; leaf labels are used verbatim as identifiers.
    pub fn new(config: &'a CurationConfig) -> Self {
        Curator {
            config,
            table: None,
            keyer: &VERBATIM,
        }
    }

    pub fn with_metadata(mut self, table: &'a MetadataTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Sets how leaf labels map to metadata identifiers.
    pub fn with_keyer(mut self, keyer: &'a dyn LeafKeyer) -> Self {
        self.keyer = keyer;
        self
    }

    /// Classifier over the configured leaf columns, if a table is present.
    pub fn classifier(&self) -> Option<LeafClassifier<'a>> {
        self.table.map(|table| {
            LeafClassifier::new(table, self.keyer, self.config.columns.clone())
                .with_dedup(self.config.dedup_key)
                .with_policy(self.config.missing_policy)
        })
    }

    /// Checks configuration and metadata before anything is mutated.
    pub fn check(&self) -> Result<()> {
        self.config.validate()?;
        let requested = self.config.requested_columns();
        match self.table {
            Some(table) => table.verify_columns(&requested),
            None if !requested.is_empty() => Err(CurationError::Configuration(format!(
                "metadata columns requested without a metadata table: {}",
                requested.join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// Runs all configured passes.
    ///
    /// The tree is only replaced by the curated version if every pass succeeds.
    pub fn run(&self, tree: &mut Tree) -> Result<CurationReport> {
        self.check()?;

        let config = self.config;
        let classifier = self.classifier();
        let mut working = tree.clone();
        let mut report = CurationReport::default();
        info!(leaves = working.num_leaves(), branches = working.num_branches(), "starting curation");

        if let Some(outgroup) = &config.outgroup {
            working.prune_leaf(outgroup).map_err(|e| e.in_pass("outgroup"))?;
            info!(outgroup = %outgroup, "removed outgroup");
            report.pruned_outgroup = Some(outgroup.clone());
        }

        if let Some(threshold) = config.debranch_threshold {
            let stats = debranch::debranch(&mut working, threshold).map_err(|e| e.in_pass(debranch::PASS))?;
            report.debranch = Some(stats);
        }

        if config.collapse_classification {
            // check() guarantees a table, and with it a classifier
            if let Some(classifier) = &classifier {
                report.collapsed_branches = collapse::collapse_classification(&mut working, classifier)
                    .map_err(|e| e.in_pass(collapse::PASS))?;
            }
        }

        if config.collapse_leaves {
            let leaf_report = collapse::collapse_leaves(&mut working, classifier.as_ref())
                .map_err(|e| e.in_pass(collapse::LEAF_PASS))?;
            report.collapse_audit = leaf_report.discarded;
        }

        if config.branchify_leaves {
            report.branchified = working.branchify_leaves();
            info!(added = report.branchified, "branchified leaves");
        }

        if config.name_branches {
            report.named_branches = working.name_unnamed_branches(&config.branch_basename);
        }

        if !config.branch_columns.is_empty() {
            if let Some(table) = self.table {
                report.branch_metadata = resolve::resolve_from_table(
                    &working,
                    table,
                    self.keyer,
                    &config.branch_columns,
                    config.apply_downstream,
                )
                .map_err(|e| e.in_pass(resolve::PASS))?;
            }
        }

        if !working.is_valid() {
            return Err(CurationError::invariant("curation", "curated tree failed validation"));
        }

        *tree = working;
        info!(leaves = tree.num_leaves(), branches = tree.num_branches(), "curation done");
        Ok(report)
    }
}
