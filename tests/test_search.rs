use dlcrecon::error::ReconError;
use dlcrecon::model::{Gene2Species, Tree};
use dlcrecon::newick::parse_str;
use dlcrecon::recon::{ExactConfig, SearchConfig, SearchResult, reconcile_exact, reconcile_search};

fn species_tree() -> Tree {
    parse_str("((A,B)AB,C)R;").unwrap()
}

fn g2s() -> Gene2Species {
    Gene2Species::from_smap("a*\tA\nb*\tB\nc*\tC\n").unwrap()
}

fn search(newick: &str, config: &SearchConfig) -> SearchResult {
    reconcile_search(&[parse_str(newick).unwrap()], &species_tree(), &g2s(), config, None).unwrap()
}

// ============= Trajectory =============
#[test]
fn test_history_never_increases() {
    let config = SearchConfig::default().with_nsearch(60).with_seed(3);
    let result = search("(((a1,c1),(a2,b1)),(b2,c2));", &config);

    assert_eq!(result.history.len(), 60);
    assert_eq!(result.iterations, 60);
    assert!(result.history.windows(2).all(|w| w[1] <= w[0] + 1e-9));
    assert!(result.cost.is_finite());
}

#[test]
fn test_same_seed_same_result() {
    let config = SearchConfig::default().with_nsearch(40).with_seed(11);
    let first = search("(((a1,c1),(a2,b1)),(b2,c2));", &config);
    let second = search("(((a1,c1),(a2,b1)),(b2,c2));", &config);

    assert_eq!(first.history, second.history);
    assert_eq!(first.labeled_recon, second.labeled_recon);
    assert_eq!(first.counts, second.counts);
}

#[test]
fn test_converges_early() {
    let config = SearchConfig::default().with_nsearch(100).with_nconverge(Some(5));
    let result = search("((a,b),c);", &config);

    assert_eq!(result.iterations, 5);
    assert_eq!(result.history, vec![0.0; 5]);
}

// ============= Quality =============
#[test]
fn test_congruent_tree() {
    let species_tree = species_tree();
    let result = search("((a,b),c);", &SearchConfig::default().with_nsearch(20));

    assert_eq!(result.cost, 0.0);
    assert_eq!(result.counts.dups, 0);
    result.labeled_recon.validate(&result.gene_tree, &species_tree).unwrap();
    result.recon.validate(&result.coal_tree, &species_tree).unwrap();
}

#[test]
fn test_two_copies_need_one_duplication() {
    let species_tree = species_tree();
    let result = search("(a1,a2);", &SearchConfig::default().with_nsearch(20));

    assert_eq!(result.counts.dups, 1);
    assert_eq!(result.cost, 1.0);
    assert_eq!(result.recon.daughters.len(), 1);
    result.recon.validate(&result.coal_tree, &species_tree).unwrap();
}

#[test]
fn test_matches_exact_optimum() {
    let species_tree = species_tree();
    let gene_tree = parse_str("((a,c),b);").unwrap();
    let exact = reconcile_exact(
        &gene_tree,
        &species_tree,
        &g2s(),
        &ExactConfig::default().with_implied(false),
    )
    .unwrap();

    let config = SearchConfig::default()
        .with_implied(false)
        .with_nsearch(200)
        .with_seed(5);
    let result = reconcile_search(&[gene_tree], &species_tree, &g2s(), &config, None).unwrap();
    assert!((result.cost - exact.cost).abs() < 1e-9);
}

// ============= Seeds And Inputs =============
#[test]
fn test_init_locus_tree() {
    let species_tree = species_tree();
    let coal_tree = parse_str("((a,c),b);").unwrap();
    let locus_tree = parse_str("((a,b),c);").unwrap();
    let config = SearchConfig::default().with_nsearch(30);

    let result = reconcile_search(&[coal_tree], &species_tree, &g2s(), &config, Some(&locus_tree)).unwrap();
    // The seed is already a labeling without duplications
    assert!(result.cost <= 4.0 + 1e-9);
    assert_eq!(result.history.len(), 30);
}

#[test]
fn test_init_locus_tree_over_other_leaves() {
    let coal_tree = parse_str("((a,c),b);").unwrap();
    let locus_tree = parse_str("((a,b),c2);").unwrap();
    let error = reconcile_search(
        &[coal_tree],
        &species_tree(),
        &g2s(),
        &SearchConfig::default(),
        Some(&locus_tree),
    )
    .unwrap_err();
    assert!(matches!(error, ReconError::InputInconsistency(_)));
}

#[test]
fn test_tree_lists() {
    let species_tree = species_tree();
    let config = SearchConfig::default().with_nsearch(10);

    let error = reconcile_search(&[], &species_tree, &g2s(), &config, None).unwrap_err();
    assert!(matches!(error, ReconError::UnsupportedConfiguration(_)));

    let trees = vec![parse_str("((a,b),c);").unwrap(), parse_str("((a,c),b);").unwrap()];
    let error = reconcile_search(&trees, &species_tree, &g2s(), &config, None).unwrap_err();
    assert!(matches!(error, ReconError::UnsupportedConfiguration(_)));
}

#[test]
fn test_consensus_of_several_trees() {
    let species_tree = species_tree();
    let trees = vec![
        parse_str("((a,b),c);").unwrap(),
        parse_str("(c,(b,a));").unwrap(),
        parse_str("((a,c),b);").unwrap(),
    ];
    let config = SearchConfig::default().with_nsearch(20).with_consensus(true);
    let result = reconcile_search(&trees, &species_tree, &g2s(), &config, None).unwrap();

    assert_eq!(result.coal_tree.num_leaves(), 3);
    assert_eq!(result.counts.dups, 0);
    assert_eq!(result.cost, 0.0);
    assert_eq!(result.history, vec![result.cost]);
    assert_eq!(result.iterations, 60);
    result.recon.validate(&result.coal_tree, &species_tree).unwrap();
}

#[test]
fn test_unmapped_leaf() {
    let coal_tree = parse_str("((a,b),x);").unwrap();
    let error = reconcile_search(&[coal_tree], &species_tree(), &g2s(), &SearchConfig::default(), None).unwrap_err();
    assert!(matches!(error, ReconError::InputInconsistency(_)));
}
