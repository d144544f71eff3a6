use criterion::{Criterion, criterion_group, criterion_main};
use phylocurate::config::CurationConfig;
use phylocurate::curate::Curator;
use phylocurate::curate::debranch::debranch;
use phylocurate::metadata::{MetadataTable, TableOptions};
use phylocurate::newick::{parse_str, to_newick};
use std::hint::black_box;

const TREE_SIZES: &[usize] = &[64, 512, 2048];

/// Collapse rescans after every change, so curation is benchmarked on smaller trees
const CURATION_SIZES: &[usize] = &[16, 64, 256];

/// Caterpillar of leaf pairs: `((L0:1,L1:1)N0:0.5,((L2:1,L3:1)N1:0.5,OUT:1)C1:0.25)ROOT;`
fn caterpillar_newick(num_pairs: usize) -> String {
    let mut newick = String::new();
    for i in 0..num_pairs {
        newick.push_str(&format!("((L{}:1,L{}:1)N{i}:0.5,", 2 * i, 2 * i + 1));
    }
    newick.push_str("OUT:1");
    for i in 1..num_pairs {
        newick.push_str(&format!(")C{i}:0.25"));
    }
    newick.push_str(")ROOT;");
    newick
}

/// Metadata assigning each leaf pair to one of eight genera.
fn genus_table(num_pairs: usize) -> MetadataTable {
    let mut tsv = String::from("id\tgenus\n");
    for i in 0..2 * num_pairs {
        tsv.push_str(&format!("L{i}\tg{}\n", (i / 2) % 8));
    }
    tsv.push_str("OUT\tout\n");
    MetadataTable::from_reader(tsv.as_bytes(), &TableOptions::new()).expect("generated table is valid")
}

fn newick_round_trip(c: &mut Criterion) {
    for &pairs in TREE_SIZES {
        let newick = caterpillar_newick(pairs);
        c.bench_function(&format!("newick_round_trip_{pairs}"), |b| {
            b.iter(|| to_newick(&parse_str(black_box(&newick)).unwrap()));
        });
    }
}

fn debranching(c: &mut Criterion) {
    for &pairs in TREE_SIZES {
        let tree = parse_str(caterpillar_newick(pairs)).unwrap();
        c.bench_function(&format!("debranch_{pairs}"), |b| {
            b.iter(|| {
                let mut tree = tree.clone();
                debranch(&mut tree, black_box(0.6)).unwrap()
            });
        });
    }
}

fn full_curation(c: &mut Criterion) {
    for &pairs in CURATION_SIZES {
        let tree = parse_str(caterpillar_newick(pairs)).unwrap();
        let table = genus_table(pairs);
        let config = CurationConfig::new()
            .with_columns(["genus"])
            .with_classification_collapse()
            .with_leaf_collapse()
            .with_branch_columns(["genus"]);
        c.bench_function(&format!("curate_{pairs}"), |b| {
            b.iter(|| {
                let mut tree = tree.clone();
                Curator::new(&config).with_metadata(&table).run(&mut tree).unwrap()
            });
        });
    }
}

criterion_group!(parsing, newick_round_trip);
criterion_group! {
    name = curation;
    config = Criterion::default().sample_size(10);
    targets = debranching, full_curation
}
criterion_main!(parsing, curation);
