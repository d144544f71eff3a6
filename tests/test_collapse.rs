use phylocurate::config::{CurationConfig, MissingPolicy};
use phylocurate::curate::Curator;
use phylocurate::curate::collapse::{collapse_classification, collapse_leaves};
use phylocurate::error::CurationError;
use phylocurate::metadata::{LeafClassifier, MetadataTable, TableOptions, VerbatimKeyer};
use phylocurate::newick::{parse_str, to_newick};

/// Table with a single `sp` column.
fn species_table(rows: &[(&str, &str)]) -> MetadataTable {
    let mut tsv = String::from("id\tsp\n");
    for (id, sp) in rows {
        tsv.push_str(&format!("{id}\t{sp}\n"));
    }
    MetadataTable::from_reader(tsv.as_bytes(), &TableOptions::new()).unwrap()
}

fn species() -> Vec<String> {
    vec!["sp".to_string()]
}

// --- TESTS CLASSIFICATION COLLAPSE ---
#[test]
fn test_uniform_branch_lifts_into_root() {
    let table = species_table(&[("A", "x"), ("B", "x"), ("C", "y"), ("D", "y")]);
    let keyer = VerbatimKeyer;
    let classifier = LeafClassifier::new(&table, &keyer, species());
    let mut tree = parse_str("((A:1,B:1)N1:1,(C:1,D:1)N2:1)ROOT;").unwrap();

    let collapsed = collapse_classification(&mut tree, &classifier).unwrap();

    // N1 lifts first; afterwards the root holds x-leaves and blocks N2
    assert_eq!(collapsed, 1);
    assert_eq!(to_newick(&tree), "((C:1,D:1)N2:1,A:2,B:2)ROOT;");
}

#[test]
fn test_agreeing_branches_all_collapse() {
    let table = species_table(&[("A", "x"), ("B", "x"), ("C", "x"), ("D", "x")]);
    let keyer = VerbatimKeyer;
    let classifier = LeafClassifier::new(&table, &keyer, species());
    let mut tree = parse_str("((A:1,B:1)N1:1,(C:1,D:1)N2:1)ROOT;").unwrap();

    let collapsed = collapse_classification(&mut tree, &classifier).unwrap();
    assert_eq!(collapsed, 2);
    assert_eq!(to_newick(&tree), "(A:2,B:2,C:2,D:2)ROOT;");
}

#[test]
fn test_nested_collapse_restarts_scan() {
    let table = species_table(&[("A", "x"), ("B", "x"), ("C", "x"), ("D", "x")]);
    let keyer = VerbatimKeyer;
    let classifier = LeafClassifier::new(&table, &keyer, species());
    let mut tree = parse_str("(((A:1,B:1)N2:1,C:1)N1:1,D:1)ROOT;").unwrap();

    let collapsed = collapse_classification(&mut tree, &classifier).unwrap();
    assert_eq!(collapsed, 2);
    assert_eq!(to_newick(&tree), "(D:1,C:2,A:3,B:3)ROOT;");
}

#[test]
fn test_disagreeing_parent_blocks_collapse() {
    let table = species_table(&[("A", "x"), ("B", "x"), ("C", "y")]);
    let keyer = VerbatimKeyer;
    let classifier = LeafClassifier::new(&table, &keyer, species());
    let mut tree = parse_str("((A:1,B:1)N1:1,C:1)ROOT;").unwrap();
    let before = tree.clone();

    assert_eq!(collapse_classification(&mut tree, &classifier).unwrap(), 0);
    assert_eq!(tree, before);
}

#[test]
fn test_unclassified_leaf_blocks_its_branch() {
    let table = species_table(&[("A", "x"), ("C", "x")]);
    let keyer = VerbatimKeyer;
    let classifier = LeafClassifier::new(&table, &keyer, species()).with_policy(MissingPolicy::Skip);
    let mut tree = parse_str("((A:1,B:1)N1:1,C:1)ROOT;").unwrap();

    assert_eq!(collapse_classification(&mut tree, &classifier).unwrap(), 0);
}

#[test]
fn test_missing_leaf_is_fatal_by_default() {
    let table = species_table(&[("A", "x"), ("C", "x")]);
    let keyer = VerbatimKeyer;
    let classifier = LeafClassifier::new(&table, &keyer, species());
    let mut tree = parse_str("((A:1,B:1)N1:1,C:1)ROOT;").unwrap();

    let err = collapse_classification(&mut tree, &classifier).unwrap_err();
    assert!(matches!(err, CurationError::MissingMatch { ref leaf } if leaf == "B"));
}

#[test]
fn test_failed_pass_leaves_tree_untouched() {
    let table = species_table(&[("A", "x"), ("B", "x"), ("C", "x")]);
    let config = CurationConfig::new()
        .with_debranch_threshold(1.5)
        .with_columns(["sp"])
        .with_classification_collapse();
    let mut tree = parse_str("((A:1,B:1)N1:1,(C:1,D:1)N2:1)ROOT;").unwrap();
    let before = tree.clone();

    let err = Curator::new(&config).with_metadata(&table).run(&mut tree).unwrap_err();

    assert!(matches!(err, CurationError::Pass { pass: "collapse", .. }));
    assert!(matches!(err.root_cause(), CurationError::MissingMatch { .. }));
    assert_eq!(tree, before);
}

// --- TESTS LEAF-COLLAPSE ---
#[test]
fn test_leaf_collapse_keeps_closest_leaf() {
    let table = species_table(&[("A", "x"), ("B", "x"), ("C", "x"), ("D", "y")]);
    let keyer = VerbatimKeyer;
    let classifier = LeafClassifier::new(&table, &keyer, species());
    let mut tree = parse_str("((A:1,B:0.5,C:2)N1:1,D:1)ROOT;").unwrap();

    let report = collapse_leaves(&mut tree, Some(&classifier)).unwrap();

    assert_eq!(report.num_discarded(), 2);
    assert_eq!(report.discarded["B"], vec!["A", "C"]);
    assert_eq!(report.merged, 1);
    assert_eq!(to_newick(&tree), "(B:1.5,D:1)ROOT;");
    assert!(tree.is_valid());
}

#[test]
fn test_leaf_collapse_without_classifier_keeps_first_on_ties() {
    let mut tree = parse_str("((A:1,B:1)N1:1,C:1)ROOT;").unwrap();
    let report = collapse_leaves(&mut tree, None).unwrap();

    assert_eq!(report.discarded["A"], vec!["B"]);
    assert_eq!(to_newick(&tree), "(A:2,C:1)ROOT;");
}

#[test]
fn test_leaf_collapse_ignores_unclassified_leaves() {
    let table = species_table(&[("A", "x"), ("B", "x"), ("C", "y")]);
    let keyer = VerbatimKeyer;
    let classifier = LeafClassifier::new(&table, &keyer, species()).with_policy(MissingPolicy::Notify);
    let mut tree = parse_str("((A:1,B:1,Z:1)N1:1,C:1)ROOT;").unwrap();

    let report = collapse_leaves(&mut tree, Some(&classifier)).unwrap();
    assert_eq!(report.num_discarded(), 1);
    assert_eq!(to_newick(&tree), "((A:1,Z:1)N1:1,C:1)ROOT;");
}

#[test]
fn test_leaf_collapse_conserves_leaves_up_to_audit() {
    let table = species_table(&[("A", "x"), ("B", "x"), ("C", "y"), ("D", "y"), ("E", "x")]);
    let keyer = VerbatimKeyer;
    let classifier = LeafClassifier::new(&table, &keyer, species());
    let mut tree = parse_str("(((A:1,B:2)N2:1,C:1,D:3)N1:1,E:1)ROOT;").unwrap();
    let before = tree.leaf_names_multiset();

    let report = collapse_leaves(&mut tree, Some(&classifier)).unwrap();

    let mut after = tree.leaf_names_multiset();
    for name in report.discarded.values().flatten() {
        *after.entry(name.clone()).or_insert(0) += 1;
    }
    assert_eq!(after, before);
}
