use phylocurate::curate::resolve::{resolve_from_table, resolve_partitions};
use phylocurate::error::CurationError;
use phylocurate::metadata::{ColumnPartition, MetadataTable, MetadataValue, TableOptions, VerbatimKeyer};
use phylocurate::model::{LeafSet, Tree};
use phylocurate::newick::parse_str;

fn table(tsv: &str) -> MetadataTable {
    MetadataTable::from_reader(tsv.as_bytes(), &TableOptions::new()).unwrap()
}

fn text(value: &str) -> MetadataValue {
    MetadataValue::Text(value.to_string())
}

fn leaves(tree: &Tree, names: &[&str]) -> LeafSet {
    names.iter().map(|n| tree.find_leaf(n).unwrap()).collect()
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|c| c.to_string()).collect()
}

#[test]
fn test_exact_leaf_set_match() {
    let tree = parse_str("((A,B)N1,(C,D)N2)ROOT;").unwrap();
    let table = table("id\tsp\nA\tx\nB\tx\nC\ty\nD\ty\n");

    let metadata = resolve_from_table(&tree, &table, &VerbatimKeyer, &columns(&["sp"]), false).unwrap();

    let n1 = tree.find_vertex("N1").unwrap();
    let n2 = tree.find_vertex("N2").unwrap();
    assert_eq!(metadata.get(n1, "sp").unwrap().value, text("x"));
    assert_eq!(metadata.get(n2, "sp").unwrap().value, text("y"));
    assert!(!metadata.get(n1, "sp").unwrap().inherited);
    assert!(metadata.get(tree.root_index(), "sp").is_none());
    assert_eq!(metadata.len(), 2);
}

#[test]
fn test_subset_does_not_match() {
    let tree = parse_str("((A,B)N1,C)ROOT;").unwrap();
    let table = table("id\tsp\nA\tx\nB\tx\nC\tx\n");

    let metadata = resolve_from_table(&tree, &table, &VerbatimKeyer, &columns(&["sp"]), false).unwrap();

    let n1 = tree.find_vertex("N1").unwrap();
    assert_eq!(metadata.get(tree.root_index(), "sp").unwrap().value, text("x"));
    assert!(metadata.get(n1, "sp").is_none());
}

#[test]
fn test_leaves_without_rows_break_the_match() {
    let tree = parse_str("((A,B)N1,(C,Z)N2)ROOT;").unwrap();
    let table = table("id\tsp\nA\tx\nB\tx\nC\ty\n");

    let metadata = resolve_from_table(&tree, &table, &VerbatimKeyer, &columns(&["sp"]), false).unwrap();

    // {C} is the whole y-group, but N2 also holds Z
    let n2 = tree.find_vertex("N2").unwrap();
    assert!(metadata.get(n2, "sp").is_none());
}

#[test]
fn test_single_child_chain_shares_assignment() {
    let tree = parse_str("(((A,B)N2)N1,C)ROOT;").unwrap();
    let table = table("id\tsp\nA\tx\nB\tx\nC\ty\n");

    let metadata = resolve_from_table(&tree, &table, &VerbatimKeyer, &columns(&["sp"]), false).unwrap();

    for name in ["N1", "N2"] {
        let branch = tree.find_vertex(name).unwrap();
        assert_eq!(metadata.get(branch, "sp").unwrap().value, text("x"), "{name}");
    }
}

#[test]
fn test_conflicting_values_are_rejected() {
    let tree = parse_str("((A,B)N1,C)ROOT;").unwrap();
    let mut partition = ColumnPartition::new("sp");
    partition.add_group(text("x"), leaves(&tree, &["A", "B"]));
    partition.add_group(text("y"), leaves(&tree, &["A", "B"]));

    let err = resolve_partitions(&tree, &[partition], false).unwrap_err();
    match err {
        CurationError::Configuration(msg) => {
            assert!(msg.contains("'sp'"));
            assert!(msg.contains("N1"));
        }
        other => panic!("expected configuration error, got {other}"),
    }
}

#[test]
fn test_downstream_inheritance() {
    let tree = parse_str("(((A,B)N2,C)N1,D)ROOT;").unwrap();
    let table = table("id\tgenus\tsp\nA\tg\ts1\nB\tg\ts1\nC\tg\ts2\nD\th\ts3\n");
    let cols = columns(&["genus", "sp"]);

    let metadata = resolve_from_table(&tree, &table, &VerbatimKeyer, &cols, true).unwrap();

    let n1 = tree.find_vertex("N1").unwrap();
    let n2 = tree.find_vertex("N2").unwrap();
    let genus_n1 = metadata.get(n1, "genus").unwrap();
    assert_eq!(genus_n1.value, text("g"));
    assert!(!genus_n1.inherited);

    let genus_n2 = metadata.get(n2, "genus").unwrap();
    assert_eq!(genus_n2.value, text("g"));
    assert!(genus_n2.inherited);

    let sp_n2 = metadata.get(n2, "sp").unwrap();
    assert_eq!(sp_n2.value, text("s1"));
    assert!(!sp_n2.inherited);
}

#[test]
fn test_inheritance_never_overwrites_exact_match() {
    let tree = parse_str("((A,B)N1,C)ROOT;").unwrap();
    let mut partition = ColumnPartition::new("clade");
    partition.add_group(text("outer"), leaves(&tree, &["A", "B", "C"]));
    partition.add_group(text("inner"), leaves(&tree, &["A", "B"]));

    let metadata = resolve_partitions(&tree, &[partition], true).unwrap();

    let n1 = tree.find_vertex("N1").unwrap();
    assert_eq!(metadata.get(tree.root_index(), "clade").unwrap().value, text("outer"));
    assert_eq!(metadata.get(n1, "clade").unwrap().value, text("inner"));
    assert!(!metadata.get(n1, "clade").unwrap().inherited);
}

#[test]
fn test_ranks_come_from_exact_matches_only() {
    let tree = parse_str("(((A,B)N2,C)N1,D)ROOT;").unwrap();
    let table = table("id\tgenus\tsp\nA\tg\ts1\nB\tg\ts1\nC\tg\ts2\nD\th\ts3\n");
    let cols = columns(&["genus", "sp"]);

    let metadata = resolve_from_table(&tree, &table, &VerbatimKeyer, &cols, true).unwrap();

    let n1 = tree.find_vertex("N1").unwrap();
    let n2 = tree.find_vertex("N2").unwrap();
    assert_eq!(metadata.ranks(n1, &cols), vec!["genus"]);
    assert_eq!(metadata.ranks(n2, &cols), vec!["sp"]);
    assert!(metadata.ranks(tree.root_index(), &cols).is_empty());
}
