//! Configuration of a curation run.
//!
//! [CurationConfig] is built with consuming `with_*` methods and checked with
//! [CurationConfig::validate] before any pass touches the tree.

use crate::error::{CurationError, Result};
use crate::metadata::MetadataTable;

/// What to do when a leaf has no metadata entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Leave the leaf unclassified without a message
    Skip,
    /// Leave the leaf unclassified and log a warning
    Notify,
    /// Abort with [CurationError::MissingMatch]
    #[default]
    Fatal,
}

/// What to do when the export directory already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Abort with [CurationError::OutputExists] before writing anything
    #[default]
    Fail,
    /// Write into the existing directory, replacing the export files
    Force,
}

// =#========================================================================#=
// CURATION CONFIG
// =#========================================================================#=
/// Options controlling which passes run and how names are exported.
///
/// # Example
/// ```
/// use phylocurate::config::{CurationConfig, MissingPolicy};
///
/// let config = CurationConfig::new()
///     .with_debranch_threshold(0.01)
///     .with_columns(["genus", "species"])
///     .with_classification_collapse()
///     .with_missing_policy(MissingPolicy::Notify);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CurationConfig {
    /// Enables debranching with this distance threshold
    pub debranch_threshold: Option<f64>,
    /// Enables the classification collapse fixpoint
    pub collapse_classification: bool,
    /// Enables leaf-collapse (one representative per key and branch)
    pub collapse_leaves: bool,
    /// Metadata columns for classification keys and leaf names, in order
    pub columns: Vec<String>,
    /// Use the duplicate-suppressing classification key
    pub dedup_key: bool,
    /// Metadata columns matched against branch leaf sets, in order
    pub branch_columns: Vec<String>,
    /// Branch columns that designate a rank
    pub rank_columns: Vec<String>,
    /// Leave rank columns out of exported branch names
    pub strip_rank_columns: bool,
    /// Inherit branch assignments down the lineage
    pub apply_downstream: bool,
    /// Keep the basename prefix in names that carry metadata
    pub keep_basenames: bool,
    /// Leave missing values out of branch names instead of writing `None`
    pub skip_missing_metadata: bool,
    pub branch_basename: String,
    pub leaf_basename: String,
    pub name_separator: String,
    /// Synthetic root name prefixed to every exported path
    pub root_linker: Option<String>,
    pub missing_policy: MissingPolicy,
    pub overwrite_policy: OverwritePolicy,
    /// Wedge a zero-length branch above every leaf before resolving
    pub branchify_leaves: bool,
    /// Name unnamed branch vertices `branch_basename{n}` after the structural passes
    pub name_branches: bool,
    /// Leaf removed from the tree before any other pass
    pub outgroup: Option<String>,
    /// Column holding `;`-separated CanSNP paths to expand into boolean columns
    pub cansnp_column: Option<String>,
    /// CanSNPs to expand; all found ones if empty
    pub cansnps: Vec<String>,
}

impl Default for CurationConfig {
    fn default() -> Self {
        CurationConfig {
            debranch_threshold: None,
            collapse_classification: false,
            collapse_leaves: false,
            columns: Vec::new(),
            dedup_key: false,
            branch_columns: Vec::new(),
            rank_columns: Vec::new(),
            strip_rank_columns: false,
            apply_downstream: false,
            keep_basenames: false,
            skip_missing_metadata: false,
            branch_basename: "branch".to_string(),
            leaf_basename: "leaf".to_string(),
            name_separator: "_".to_string(),
            root_linker: None,
            missing_policy: MissingPolicy::default(),
            overwrite_policy: OverwritePolicy::default(),
            branchify_leaves: false,
            name_branches: false,
            outgroup: None,
            cansnp_column: None,
            cansnps: Vec::new(),
        }
    }
}

fn to_strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl CurationConfig {
    /// Creates a configuration with every pass disabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debranch_threshold(mut self, threshold: f64) -> Self {
        self.debranch_threshold = Some(threshold);
        self
    }

    pub fn with_classification_collapse(mut self) -> Self {
        self.collapse_classification = true;
        self
    }

    pub fn with_leaf_collapse(mut self) -> Self {
        self.collapse_leaves = true;
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = to_strings(columns);
        self
    }

    pub fn with_dedup_key(mut self) -> Self {
        self.dedup_key = true;
        self
    }

    pub fn with_branch_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branch_columns = to_strings(columns);
        self
    }

    pub fn with_rank_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rank_columns = to_strings(columns);
        self
    }

    pub fn with_strip_rank_columns(mut self) -> Self {
        self.strip_rank_columns = true;
        self
    }

    pub fn with_apply_downstream(mut self) -> Self {
        self.apply_downstream = true;
        self
    }

    pub fn with_keep_basenames(mut self) -> Self {
        self.keep_basenames = true;
        self
    }

    pub fn with_skip_missing_metadata(mut self) -> Self {
        self.skip_missing_metadata = true;
        self
    }

    pub fn with_basenames(mut self, branch: impl Into<String>, leaf: impl Into<String>) -> Self {
        self.branch_basename = branch.into();
        self.leaf_basename = leaf.into();
        self
    }

    pub fn with_name_separator(mut self, separator: impl Into<String>) -> Self {
        self.name_separator = separator.into();
        self
    }

    pub fn with_root_linker(mut self, name: impl Into<String>) -> Self {
        self.root_linker = Some(name.into());
        self
    }

    pub fn with_missing_policy(mut self, policy: MissingPolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    pub fn with_overwrite_policy(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite_policy = policy;
        self
    }

    pub fn with_branchify_leaves(mut self) -> Self {
        self.branchify_leaves = true;
        self
    }

    pub fn with_name_branches(mut self) -> Self {
        self.name_branches = true;
        self
    }

    pub fn with_outgroup(mut self, leaf: impl Into<String>) -> Self {
        self.outgroup = Some(leaf.into());
        self
    }

    pub fn with_cansnp_column<I, S>(mut self, column: impl Into<String>, cansnps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cansnp_column = Some(column.into());
        self.cansnps = to_strings(cansnps);
        self
    }

    /// Checks the configuration for contradictions.
    ///
    /// # Errors
    /// [CurationError::Configuration] naming the offending option.
    pub fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.debranch_threshold {
            if !(threshold.is_finite() && threshold >= 0.0) {
                return Err(CurationError::Configuration(format!(
                    "debranch threshold must be a finite number >= 0, got {threshold}"
                )));
            }
        }

        if self.collapse_classification && self.columns.is_empty() {
            return Err(CurationError::Configuration(
                "classification collapse requires at least one metadata column".to_string(),
            ));
        }

        let stray_ranks: Vec<&str> = self
            .rank_columns
            .iter()
            .filter(|c| !self.branch_columns.contains(c))
            .map(String::as_str)
            .collect();
        if !stray_ranks.is_empty() {
            return Err(CurationError::Configuration(format!(
                "rank columns must also be branch columns: {}",
                stray_ranks.join(", ")
            )));
        }

        if self.apply_downstream && self.branch_columns.is_empty() {
            return Err(CurationError::Configuration(
                "apply-downstream requires at least one branch column".to_string(),
            ));
        }

        for (option, value) in [
            ("branch basename", &self.branch_basename),
            ("leaf basename", &self.leaf_basename),
            ("name separator", &self.name_separator),
        ] {
            if value.is_empty() {
                return Err(CurationError::Configuration(format!("{option} must not be empty")));
            }
        }

        match &self.cansnp_column {
            Some(column) if !self.columns.contains(column) && !self.branch_columns.contains(column) => {
                Err(CurationError::Configuration(format!(
                    "CanSNP column '{column}' is neither a leaf nor a branch column"
                )))
            }
            None if !self.cansnps.is_empty() => Err(CurationError::Configuration(
                "CanSNPs given without a CanSNP column".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// All metadata columns the run reads, leaf columns first, without duplicates.
    pub fn requested_columns(&self) -> Vec<String> {
        let mut requested: Vec<String> = Vec::new();
        for column in self.columns.iter().chain(&self.branch_columns) {
            if !requested.contains(column) {
                requested.push(column.clone());
            }
        }
        requested
    }

    /// Expands the CanSNP column of `table` into boolean columns and puts
    /// them in its place in the leaf, branch and rank column lists.
    ///
    /// Afterwards no CanSNP column is configured any more.
    ///
    /// # Returns
    /// The expanded CanSNP columns; empty if no CanSNP column is configured
    pub fn expand_cansnps(&mut self, table: &mut MetadataTable) -> Result<Vec<String>> {
        let Some(column) = self.cansnp_column.take() else {
            return Ok(Vec::new());
        };
        let wanted = std::mem::take(&mut self.cansnps);

        let expanded = match table.expand_cansnp_column(&column, &wanted, &mut self.columns) {
            Ok(expanded) => expanded,
            Err(e) => {
                self.cansnp_column = Some(column);
                self.cansnps = wanted;
                return Err(e);
            }
        };

        for list in [&mut self.branch_columns, &mut self.rank_columns] {
            if let Some(position) = list.iter().position(|c| *c == column) {
                list.splice(position..=position, expanded.iter().cloned());
            }
        }
        Ok(expanded)
    }
}
