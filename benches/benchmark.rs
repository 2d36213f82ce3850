use criterion::{Criterion, criterion_group, criterion_main};
use dlcrecon::model::{Gene2Species, Tree};
use dlcrecon::newick::parse_str;
use dlcrecon::recon::{ExactConfig, SearchConfig, labeledrecon_to_recon, reconcile_exact, reconcile_search};
use std::hint::black_box;

const SPECIES_TREE: &str = "(((A,B)AB,(C,D)CD)ABCD,E)R;";

const GENE_TREES: &[(&str, &str)] = &[
    ("congruent", "(((a1,b1),(c1,d1)),e1);"),
    ("two_dups", "((((a1,b1),(a2,b2)),((c1,d1),(c2,d2))),(e1,e2));"),
    ("discordant", "((((a1,c1),(b1,d1)),(a2,(b2,e1))),((c2,d2),e2));"),
];

fn setup() -> (Tree, Gene2Species) {
    let species_tree = parse_str(SPECIES_TREE).unwrap();
    let g2s = Gene2Species::from_smap("a*\tA\nb*\tB\nc*\tC\nd*\tD\ne*\tE\n").unwrap();
    (species_tree, g2s)
}

fn exact_engine(c: &mut Criterion) {
    let (species_tree, g2s) = setup();
    let config = ExactConfig::default();
    for (name, newick) in GENE_TREES {
        let gene_tree = parse_str(*newick).unwrap();
        c.bench_function(&format!("exact/{name}"), |b| {
            b.iter(|| reconcile_exact(black_box(&gene_tree), &species_tree, &g2s, &config).unwrap());
        });
    }
}

fn search_engine(c: &mut Criterion) {
    let (species_tree, g2s) = setup();
    let config = SearchConfig::default().with_nsearch(200).with_seed(1);
    for (name, newick) in GENE_TREES {
        let coal_tree = parse_str(*newick).unwrap();
        let trees = [coal_tree];
        c.bench_function(&format!("search/{name}"), |b| {
            b.iter(|| reconcile_search(black_box(&trees), &species_tree, &g2s, &config, None).unwrap());
        });
    }
}

fn conversion(c: &mut Criterion) {
    let (species_tree, g2s) = setup();
    let (_, newick) = GENE_TREES[2];
    let result = reconcile_exact(&parse_str(newick).unwrap(), &species_tree, &g2s, &ExactConfig::default()).unwrap();
    c.bench_function("labeledrecon_to_recon", |b| {
        b.iter(|| labeledrecon_to_recon(black_box(&result.gene_tree), &result.labeled_recon, &species_tree).unwrap());
    });
}

criterion_group!(regression, exact_engine, conversion);
criterion_group! {
    name = heuristic;
    config = Criterion::default().sample_size(10);
    targets = search_engine
}
criterion_main!(regression, heuristic);
