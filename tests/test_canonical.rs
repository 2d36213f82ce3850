use dlcrecon::model::{Gene2Species, LabeledRecon, Tree};
use dlcrecon::newick::parse_str;
use dlcrecon::recon::{
    ExactConfig, Reconciliation, canonical_labeled, canonical_names, canonical_newick, labeledrecon_to_recon,
    reconcile_exact, reconciliations_equal, structural_hash,
};
use std::collections::BTreeMap;

fn species_tree() -> Tree {
    parse_str("((A,B)AB,C)R;").unwrap()
}

fn g2s() -> Gene2Species {
    Gene2Species::from_smap("a*\tA\nb*\tB\nc*\tC\n").unwrap()
}

// ============= Canonical Names =============
#[test]
fn test_names_ignore_child_order_and_internal_names() {
    let t1 = parse_str("((b,a)x,c)y;").unwrap();
    let t2 = parse_str("(c,(a,b)n7)root;").unwrap();
    let n1 = canonical_names(&t1);
    let n2 = canonical_names(&t2);

    assert_eq!(n1[t1.find("x").unwrap()], "(a,b)");
    assert_eq!(n2[t2.find("n7").unwrap()], "(a,b)");
    assert_eq!(n1[t1.root_index()], n2[t2.root_index()]);
    assert_eq!(n1[t1.find("c").unwrap()], "c");
}

#[test]
fn test_unary_chain_names() {
    let tree = parse_str("((((a,b)x)u)v,c);").unwrap();
    let names = canonical_names(&tree);
    assert_eq!(names[tree.find("v").unwrap()], "(a,b)");
    assert_eq!(names[tree.find("u").unwrap()], "(a,b)#1");
    assert_eq!(names[tree.find("x").unwrap()], "(a,b)#2");

    let mut sorted = names.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), tree.num_vertices());
}

#[test]
fn test_canonical_newick_and_hash() {
    let t1 = parse_str("(c,(b,a)x)y;").unwrap();
    let t2 = parse_str("((a,b),c);").unwrap();
    let t3 = parse_str("((a,c),b);").unwrap();

    assert_eq!(canonical_newick(&t1), "((a,b),c);");
    assert_eq!(structural_hash(&t1), structural_hash(&t2));
    assert_ne!(structural_hash(&t1), structural_hash(&t3));
}

// ============= Labeled Equality =============
#[test]
fn test_equal_up_to_child_order() {
    let species_tree = species_tree();
    let config = ExactConfig::default();
    let r1 = reconcile_exact(&parse_str("((a,b),c);").unwrap(), &species_tree, &g2s(), &config).unwrap();
    let r2 = reconcile_exact(&parse_str("(c,(b,a));").unwrap(), &species_tree, &g2s(), &config).unwrap();

    let l1 = Reconciliation::Labeled {
        gene_tree: &r1.gene_tree,
        recon: &r1.labeled_recon,
    };
    let l2 = Reconciliation::Labeled {
        gene_tree: &r2.gene_tree,
        recon: &r2.labeled_recon,
    };
    assert!(reconciliations_equal(l1, l2, &species_tree));
    assert_eq!(
        canonical_labeled(&r1.gene_tree, &r1.labeled_recon, &species_tree),
        canonical_labeled(&r2.gene_tree, &r2.labeled_recon, &species_tree)
    );
}

#[test]
fn test_founding_copy_matters() {
    let species_tree = species_tree();
    let config = ExactConfig::default();
    let r1 = reconcile_exact(&parse_str("(a1,a2);").unwrap(), &species_tree, &g2s(), &config).unwrap();
    let r2 = reconcile_exact(&parse_str("(a2,a1);").unwrap(), &species_tree, &g2s(), &config).unwrap();

    // a1 founds the new locus in the first, a2 in the second
    let l1 = Reconciliation::Labeled {
        gene_tree: &r1.gene_tree,
        recon: &r1.labeled_recon,
    };
    let l2 = Reconciliation::Labeled {
        gene_tree: &r2.gene_tree,
        recon: &r2.labeled_recon,
    };
    assert!(!reconciliations_equal(l1, l2, &species_tree));
    assert!(reconciliations_equal(l1, l1, &species_tree));
}

#[test]
fn test_redundant_unary_vertex_is_ignored() {
    let species_tree = parse_str("(A,B)R;").unwrap();
    let a = species_tree.find("A").unwrap();

    let plain = parse_str("(a1,a2)r;").unwrap();
    let plain_recon = LabeledRecon::new(
        vec![a, a, a],
        vec![1, 0, 0],
        BTreeMap::from([((a, 0), vec![2, 0])]),
    );

    let padded = parse_str("((a1,a2)r)top;").unwrap();
    let padded_recon = LabeledRecon::new(
        vec![a, a, a, a],
        vec![1, 0, 0, 0],
        BTreeMap::from([((a, 0), vec![2, 0])]),
    );

    let l1 = Reconciliation::Labeled {
        gene_tree: &plain,
        recon: &plain_recon,
    };
    let l2 = Reconciliation::Labeled {
        gene_tree: &padded,
        recon: &padded_recon,
    };
    assert!(reconciliations_equal(l1, l2, &species_tree));

    // Relabeling the loci does not matter either
    let renamed = LabeledRecon::new(
        vec![a, a, a],
        vec![7, 3, 3],
        BTreeMap::from([((a, 3), vec![2, 0])]),
    );
    let l3 = Reconciliation::Labeled {
        gene_tree: &plain,
        recon: &renamed,
    };
    assert!(reconciliations_equal(l1, l3, &species_tree));
}

#[test]
fn test_unary_root_is_ignored() {
    let species_tree = species_tree();
    let s = |name: &str| species_tree.find(name).unwrap();

    // The root above x sits in another species but adds no event
    let padded = parse_str("((a,b)x)r;").unwrap();
    let padded_recon = LabeledRecon::new(vec![s("A"), s("B"), s("AB"), s("R")], vec![0; 4], BTreeMap::new());
    let plain = parse_str("(a,b)x;").unwrap();
    let plain_recon = LabeledRecon::new(vec![s("A"), s("B"), s("AB")], vec![0; 3], BTreeMap::new());

    let l1 = Reconciliation::Labeled {
        gene_tree: &padded,
        recon: &padded_recon,
    };
    let l2 = Reconciliation::Labeled {
        gene_tree: &plain,
        recon: &plain_recon,
    };
    assert!(reconciliations_equal(l1, l2, &species_tree));
    assert!(reconciliations_equal(l2, l1, &species_tree));
}

#[test]
fn test_order_of_splits_between_duplications_is_a_set() {
    let species_tree = parse_str("(A,B)R;").unwrap();
    let a = species_tree.find("A").unwrap();
    // ((a1,a2)x,(a3,a4)y)r: a1 and a3 found new loci
    let gene_tree = parse_str("((a1,a2)x,(a3,a4)y)r;").unwrap();
    let v = |name: &str| gene_tree.find(name).unwrap();
    let mut locus_map = vec![0; gene_tree.num_vertices()];
    locus_map[v("a1")] = 1;
    locus_map[v("a3")] = 2;
    let species_map = vec![a; gene_tree.num_vertices()];

    let order1 = BTreeMap::from([((a, 0), vec![v("r"), v("x"), v("y"), v("a1"), v("a3")])]);
    let order2 = BTreeMap::from([((a, 0), vec![v("r"), v("y"), v("x"), v("a1"), v("a3")])]);
    let order3 = BTreeMap::from([((a, 0), vec![v("r"), v("x"), v("a1"), v("y"), v("a3")])]);
    let r1 = LabeledRecon::new(species_map.clone(), locus_map.clone(), order1);
    let r2 = LabeledRecon::new(species_map.clone(), locus_map.clone(), order2);
    let r3 = LabeledRecon::new(species_map, locus_map, order3);

    let c1 = canonical_labeled(&gene_tree, &r1, &species_tree);
    assert_eq!(c1, canonical_labeled(&gene_tree, &r2, &species_tree));
    assert_ne!(c1, canonical_labeled(&gene_tree, &r3, &species_tree));
}

// ============= Three-Tree Equality =============
#[test]
fn test_three_tree_equality() {
    let species_tree = species_tree();
    let config = ExactConfig::default();
    let r1 = reconcile_exact(&parse_str("(((a1,b1),(a2,b2)),c1);").unwrap(), &species_tree, &g2s(), &config).unwrap();
    let r2 = reconcile_exact(&parse_str("(c1,((b1,a1),(b2,a2)));").unwrap(), &species_tree, &g2s(), &config).unwrap();
    let (t1, x1) = labeledrecon_to_recon(&r1.gene_tree, &r1.labeled_recon, &species_tree).unwrap();
    let (t2, x2) = labeledrecon_to_recon(&r2.gene_tree, &r2.labeled_recon, &species_tree).unwrap();

    let a = Reconciliation::ThreeTree {
        coal_tree: &t1,
        recon: &x1,
    };
    let b = Reconciliation::ThreeTree {
        coal_tree: &t2,
        recon: &x2,
    };
    assert!(reconciliations_equal(a, b, &species_tree));
}
