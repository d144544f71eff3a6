//! Newick string and file writing for [Tree]s.

use crate::model::tree::{Tree, VertexIndex};
use crate::model::vertex::BranchLength;
use crate::newick::defs::BUFFER_CHARS;
use crate::parser::utils::escape_label;
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Writes the tree to a file in Newick format, followed by a newline.
///
/// # Errors
/// Returns an I/O error if writing fails.
///
/// # Example
/// ```no_run
/// use phylocurate::newick::{parse_str, write_newick_file};
/// use std::fs::File;
///
/// let tree = parse_str("((A,B)N1,C);").unwrap();
/// let file = File::create("curated.nwk")?;
/// write_newick_file(file, &tree)?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn write_newick_file(file: File, tree: &Tree) -> io::Result<()> {
    write_newick(BufWriter::new(file), tree)
}

/// Writes the Newick string of the tree and a newline to `writer`, then flushes it.
pub fn write_newick<W: Write>(mut writer: W, tree: &Tree) -> io::Result<()> {
    let newick = to_newick(tree);
    writer.write_all(newick.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Returns the Newick representation of this tree with closing semicolon.
///
/// Labels of leaves and named branches are escaped if necessary; branch
/// lengths are written where present, including on the root. Returns `";"`
/// for a tree without root.
///
/// # Example
/// ```
/// use phylocurate::model::{BranchLength, Tree};
/// use phylocurate::newick::to_newick;
///
/// let mut tree = Tree::new();
/// let a = tree.add_leaf("A", Some(BranchLength::new(1.0)));
/// let b = tree.add_leaf("Wilson's", Some(BranchLength::new(2.5)));
/// let root = tree.add_branch(Some("R".to_string()), vec![a, b], None);
/// tree.set_root(root);
///
/// assert_eq!(to_newick(&tree), "(A:1,'Wilson''s':2.5)R;");
/// ```
pub fn to_newick(tree: &Tree) -> String {
    // Helper for adding branch lengths
    fn build_newick_branch_length(newick: &mut String, branch_length: Option<BranchLength>) {
        if let Some(branch_length) = branch_length {
            newick.push(':');
            newick.push_str(&branch_length.to_string());
        }
    }

    // Recursive helper for building the Newick string
    fn build_newick(tree: &Tree, newick: &mut String, index: VertexIndex) {
        let vertex = &tree[index];

        if !vertex.is_leaf() {
            newick.push('(');
            for (i, &child) in vertex.children().iter().enumerate() {
                if i > 0 {
                    newick.push(',');
                }
                build_newick(tree, newick, child);
            }
            newick.push(')');
        }
        if let Some(name) = vertex.name() {
            newick.push_str(&escape_label(name));
        }
        build_newick_branch_length(newick, vertex.branch_length());
    }

    let mut newick = String::with_capacity(estimate_newick_len(tree));
    if tree.is_root_set() {
        build_newick(tree, &mut newick, tree.root_index());
    }
    newick.push(';');

    newick
}

/// Estimates the length of the Newick string of a tree.
///
/// Counts structure characters, labels and a fixed width per branch length.
pub(crate) fn estimate_newick_len(tree: &Tree) -> usize {
    // "(", ")" and "," per child
    const STRUCTURE_CHARS: usize = 2;
    // Branch lengths: ~20 chars each (e.g., ":0.009529961339106089")
    const BRANCH_LENGTH_CHARS: usize = 20;

    if !tree.is_root_set() {
        return BUFFER_CHARS;
    }

    tree.pre_order_iter()
        .map(|v| {
            let label = v.name().map_or(0, str::len);
            let length = if v.branch_length().is_some() { BRANCH_LENGTH_CHARS } else { 0 };
            STRUCTURE_CHARS + label + length
        })
        .sum::<usize>()
        + BUFFER_CHARS
}
