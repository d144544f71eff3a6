use phylocurate::config::{CurationConfig, OverwritePolicy};
use phylocurate::curate::Curator;
use phylocurate::error::CurationError;
use phylocurate::export::{
    Exporter, GENOME_MAP_FILE, RELATIONS_FILE, RelationRow, read_relations_from_path, write_outputs,
};
use phylocurate::metadata::{MetadataTable, TableOptions, VerbatimKeyer};
use phylocurate::model::{BranchLength, Tree};
use phylocurate::newick::parse_str;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;

const TREE: &str = "((A:1,B:1)N1:1,(C:1,D:1)N2:1)ROOT;";
const METADATA: &str = "id\tgenus\tsp\nA\tF\tx\nB\tF\tx\nC\tF\ty\nD\tF\ty\n";

fn table(tsv: &str) -> MetadataTable {
    MetadataTable::from_reader(tsv.as_bytes(), &TableOptions::new()).unwrap()
}

fn ranked_config() -> CurationConfig {
    CurationConfig::new()
        .with_columns(["sp"])
        .with_branch_columns(["genus", "sp"])
        .with_rank_columns(["genus", "sp"])
}

fn row(parent: &str, child: &str, rank: Option<&str>) -> RelationRow {
    RelationRow {
        parent: parent.to_string(),
        child: child.to_string(),
        rank: rank.map(str::to_string),
    }
}

fn name_of(tree: &Tree, names: &std::collections::HashMap<usize, String>, vertex: &str) -> String {
    names[&tree.find_vertex(vertex).unwrap()].clone()
}

// --- TESTS NAMING ---
#[test]
fn test_names_from_metadata_are_unique() {
    let mut tree = parse_str(TREE).unwrap();
    let table = table(METADATA);
    let config = ranked_config();
    let report = Curator::new(&config).with_metadata(&table).run(&mut tree).unwrap();

    let keyer = VerbatimKeyer;
    let names = Exporter::new(&tree, &config)
        .with_branch_metadata(&report.branch_metadata)
        .with_leaf_metadata(&table, &keyer)
        .node_names();

    assert_eq!(name_of(&tree, &names, "ROOT"), "F");
    assert_eq!(name_of(&tree, &names, "N1"), "x");
    assert_eq!(name_of(&tree, &names, "N2"), "y");
    assert_eq!(name_of(&tree, &names, "A"), "x_2");
    assert_eq!(name_of(&tree, &names, "B"), "x_3");
    assert_eq!(name_of(&tree, &names, "D"), "y_3");

    let distinct: HashSet<&String> = names.values().collect();
    assert_eq!(distinct.len(), names.len());
    assert_eq!(names.len(), tree.num_vertices());
}

#[test]
fn test_names_without_metadata_fall_back_to_labels() {
    let tree = parse_str("((A,B),(C,D)N2,(E,F))ROOT;").unwrap();
    let config = CurationConfig::new();
    let names = Exporter::new(&tree, &config).node_names();

    assert_eq!(name_of(&tree, &names, "ROOT"), "ROOT");
    assert_eq!(name_of(&tree, &names, "N2"), "N2");
    assert_eq!(name_of(&tree, &names, "A"), "A");

    let a = tree.find_leaf("A").unwrap();
    let e = tree.find_leaf("E").unwrap();
    assert_eq!(names[&tree.parent(a).unwrap()], "branch0");
    assert_eq!(names[&tree.parent(e).unwrap()], "branch1");
}

#[test]
fn test_keep_basenames_and_separator() {
    let mut tree = parse_str(TREE).unwrap();
    let table = table(METADATA);
    let config = ranked_config().with_keep_basenames().with_name_separator("-");
    let report = Curator::new(&config).with_metadata(&table).run(&mut tree).unwrap();

    let names = Exporter::new(&tree, &config)
        .with_branch_metadata(&report.branch_metadata)
        .node_names();

    assert_eq!(name_of(&tree, &names, "N1"), "branch-x");
    assert_eq!(name_of(&tree, &names, "ROOT"), "branch-F");
}

#[test]
fn test_missing_branch_values() {
    let tsv = "id\tgenus\tsp\nA\t\tx\nB\t\tx\nC\t\ty\nD\t\ty\n";
    let mut tree = parse_str(TREE).unwrap();
    let table = table(tsv);
    let config = ranked_config();
    let report = Curator::new(&config).with_metadata(&table).run(&mut tree).unwrap();

    let names = Exporter::new(&tree, &config)
        .with_branch_metadata(&report.branch_metadata)
        .node_names();
    assert_eq!(name_of(&tree, &names, "ROOT"), "None");

    let skipping = ranked_config().with_skip_missing_metadata();
    let names = Exporter::new(&tree, &skipping)
        .with_branch_metadata(&report.branch_metadata)
        .node_names();
    assert_eq!(name_of(&tree, &names, "ROOT"), "branch");
}

#[test]
fn test_stripped_rank_columns_keep_label() {
    let mut tree = parse_str(TREE).unwrap();
    let table = table(METADATA);
    let config = CurationConfig::new()
        .with_branch_columns(["genus", "sp"])
        .with_rank_columns(["genus"])
        .with_strip_rank_columns();
    let report = Curator::new(&config).with_metadata(&table).run(&mut tree).unwrap();

    let names = Exporter::new(&tree, &config)
        .with_branch_metadata(&report.branch_metadata)
        .node_names();
    assert_eq!(name_of(&tree, &names, "ROOT"), "ROOT");
    assert_eq!(name_of(&tree, &names, "N1"), "x");
}

// --- TESTS TABLES ---
#[test]
fn test_relation_rows_with_ranks() {
    let mut tree = parse_str(TREE).unwrap();
    let table = table(METADATA);
    let config = ranked_config().with_root_linker("root");
    let report = Curator::new(&config).with_metadata(&table).run(&mut tree).unwrap();

    let keyer = VerbatimKeyer;
    let tables = Exporter::new(&tree, &config)
        .with_branch_metadata(&report.branch_metadata)
        .with_leaf_metadata(&table, &keyer)
        .tables()
        .unwrap();

    assert!(tables.with_rank);
    assert_eq!(
        tables.relations,
        vec![
            row("root", "F", Some("genus")),
            row("F", "x", Some("sp")),
            row("x", "x_2", Some("")),
            row("x", "x_3", Some("")),
            row("F", "y", Some("sp")),
            row("y", "y_2", Some("")),
            row("y", "y_3", Some("")),
        ]
    );
    assert_eq!(tables.genome_map[0], ("A".to_string(), "x_2".to_string()));
    assert_eq!(tables.genome_map.len(), 4);
}

#[test]
fn test_relation_rows_without_ranks() {
    let tree = parse_str("((A,B)N1,C)ROOT;").unwrap();
    let config = CurationConfig::new();
    let tables = Exporter::new(&tree, &config).tables().unwrap();

    assert!(!tables.with_rank);
    assert_eq!(
        tables.relations,
        vec![row("ROOT", "N1", None), row("N1", "A", None), row("N1", "B", None), row("ROOT", "C", None)]
    );
    assert!(tables.genome_map.is_empty());
}

#[test]
fn test_additional_genomes_map_to_exported_names() {
    let mut tree = parse_str(TREE).unwrap();
    let table = table(METADATA);
    let config = ranked_config();
    let report = Curator::new(&config).with_metadata(&table).run(&mut tree).unwrap();

    let mut additional = BTreeMap::new();
    additional.insert("A".to_string(), BTreeSet::from(["GCA_1".to_string()]));
    additional.insert("Q".to_string(), BTreeSet::from(["GCA_9".to_string()]));

    let keyer = VerbatimKeyer;
    let tables = Exporter::new(&tree, &config)
        .with_branch_metadata(&report.branch_metadata)
        .with_leaf_metadata(&table, &keyer)
        .with_additional_genomes(&additional)
        .tables()
        .unwrap();

    assert!(tables.genome_map.contains(&("GCA_1".to_string(), "x_2".to_string())));
    assert!(tables.genome_map.contains(&("GCA_9".to_string(), "Q".to_string())));
    assert_eq!(tables.genome_map.len(), 6);
}

// --- TESTS WRITING ---
#[test]
fn test_write_and_read_back_relations() {
    let mut tree = parse_str(TREE).unwrap();
    let table = table(METADATA);
    let config = ranked_config();
    let report = Curator::new(&config).with_metadata(&table).run(&mut tree).unwrap();

    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("export");
    let keyer = VerbatimKeyer;
    let tables = Exporter::new(&tree, &config)
        .with_branch_metadata(&report.branch_metadata)
        .with_leaf_metadata(&table, &keyer)
        .write_to_dir(&dir, OverwritePolicy::Fail)
        .unwrap();

    let relations = read_relations_from_path(dir.join(RELATIONS_FILE)).unwrap();
    assert_eq!(relations, tables.relations);

    // Every edge of the tree comes back exactly once, with its rank
    let root = tree.root_index();
    let expected: HashSet<RelationRow> = tree
        .pre_order_indices()
        .into_iter()
        .filter(|&v| v != root)
        .map(|v| {
            let parent = tree.parent(v).unwrap();
            RelationRow {
                parent: tables.names[&parent].clone(),
                child: tables.names[&v].clone(),
                rank: Some(report.branch_metadata.ranks(v, &config.rank_columns).join(",")),
            }
        })
        .collect();
    assert_eq!(relations.len(), tree.num_vertices() - 1);
    assert_eq!(relations.into_iter().collect::<HashSet<_>>(), expected);

    let genome_map = fs::read_to_string(dir.join(GENOME_MAP_FILE)).unwrap();
    assert_eq!(genome_map.lines().next(), Some("A\tx_2"));
    assert_eq!(genome_map.lines().count(), 4);
}

#[test]
fn test_existing_directory_requires_force() {
    let tree = parse_str("((A,B)N1,C)ROOT;").unwrap();
    let config = CurationConfig::new();
    let temp = tempfile::tempdir().unwrap();

    let err = Exporter::new(&tree, &config)
        .write_to_dir(temp.path(), OverwritePolicy::Fail)
        .unwrap_err();
    assert!(matches!(err, CurationError::OutputExists(_)));
    assert!(!temp.path().join(RELATIONS_FILE).exists());

    Exporter::new(&tree, &config)
        .write_to_dir(temp.path(), OverwritePolicy::Force)
        .unwrap();
    assert!(temp.path().join(RELATIONS_FILE).exists());
    assert!(temp.path().join(GENOME_MAP_FILE).exists());
}

#[test]
fn test_rejected_export_writes_no_tree() {
    let tree = parse_str("((A,B)N1,C)ROOT;").unwrap();
    let config = CurationConfig::new();
    let temp = tempfile::tempdir().unwrap();
    let newick_path = temp.path().join("curated.nwk");
    let existing = temp.path().join("export");
    fs::create_dir(&existing).unwrap();

    let exporter = Exporter::new(&tree, &config);
    let err = write_outputs(&tree, Some(&newick_path), Some((&exporter, &existing))).unwrap_err();

    assert!(matches!(err, CurationError::OutputExists(_)));
    assert!(!newick_path.exists());
    assert_eq!(fs::read_dir(&existing).unwrap().count(), 0);
}

#[test]
fn test_write_outputs_writes_tree_and_tables() {
    let tree = parse_str("((A,B)N1,C)ROOT;").unwrap();
    let config = CurationConfig::new();
    let temp = tempfile::tempdir().unwrap();
    let newick_path = temp.path().join("curated.nwk");
    let dir = temp.path().join("export");

    let exporter = Exporter::new(&tree, &config);
    let tables = write_outputs(&tree, Some(&newick_path), Some((&exporter, &dir))).unwrap();

    assert_eq!(fs::read_to_string(&newick_path).unwrap(), "((A,B)N1,C)ROOT;\n");
    assert_eq!(tables.unwrap().relations.len(), 4);
    assert!(dir.join(RELATIONS_FILE).exists());
}

#[test]
fn test_tabs_and_line_breaks_do_not_split_rows() {
    let mut tree = Tree::new();
    let a = tree.add_leaf("Lab\tstrain", Some(BranchLength::new(1.0)));
    let b = tree.add_leaf("two\nlines", Some(BranchLength::new(1.0)));
    let clade = tree.add_branch(Some("clade\r1".to_string()), vec![a, b], None);
    let c = tree.add_leaf("C", None);
    let root = tree.add_branch(Some("ROOT".to_string()), vec![clade, c], None);
    tree.set_root(root);

    let config = CurationConfig::new();
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("export");
    let tables = Exporter::new(&tree, &config).write_to_dir(&dir, OverwritePolicy::Fail).unwrap();

    assert_eq!(tables.names[&a], "Lab_strain");
    assert_eq!(tables.names[&b], "two_lines");
    assert_eq!(tables.names[&clade], "clade_1");

    let written = fs::read_to_string(dir.join(RELATIONS_FILE)).unwrap();
    assert_eq!(written.lines().count(), 1 + 4);
    assert!(written.lines().all(|line| line.split('\t').count() == 2));
    assert_eq!(read_relations_from_path(dir.join(RELATIONS_FILE)).unwrap(), tables.relations);
}
