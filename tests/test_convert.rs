use dlcrecon::error::ReconError;
use dlcrecon::model::{Gene2Species, LabeledRecon, LocusEvent, Tree};
use dlcrecon::newick::parse_str;
use dlcrecon::recon::{
    ExactConfig, ExactResult, Reconciliation, labeledrecon_to_recon, lineage_counts, propose_daughters,
    recon_from_locus_tree, recon_to_labeledrecon, reconcile_exact, reconciliations_equal,
};

fn species_tree() -> Tree {
    parse_str("((A,B)AB,C)R;").unwrap()
}

fn g2s() -> Gene2Species {
    Gene2Species::from_smap("a*\tA\nb*\tB\nc*\tC\n").unwrap()
}

fn exact(newick: &str, config: &ExactConfig) -> ExactResult {
    reconcile_exact(&parse_str(newick).unwrap(), &species_tree(), &g2s(), config).unwrap()
}

fn labeled(result: &ExactResult) -> Reconciliation<'_> {
    Reconciliation::Labeled {
        gene_tree: &result.gene_tree,
        recon: &result.labeled_recon,
    }
}

// --- LABELED TO THREE-TREE ---
#[test]
fn test_congruent_locus_tree_is_the_species_tree() {
    let species_tree = species_tree();
    let result = exact("((a,b),c);", &ExactConfig::default());
    let (coal_tree, recon) = labeledrecon_to_recon(&result.gene_tree, &result.labeled_recon, &species_tree).unwrap();

    recon.validate(&coal_tree, &species_tree).unwrap();
    assert_eq!(recon.locus_tree.num_vertices(), 5);
    assert_eq!(recon.locus_tree.num_leaves(), 3);
    assert!(recon.daughters.is_empty());
    assert!(!recon.locus_events.contains(&LocusEvent::Duplication));

    // Every coalescent leaf sits on the locus leaf of the same name
    for leaf in coal_tree.leaves() {
        assert_eq!(recon.locus_tree.name(recon.coal_recon[leaf]), coal_tree.name(leaf));
    }
}

#[test]
fn test_duplication_materializes_with_daughter() {
    let species_tree = species_tree();
    let result = exact("(a1,a2);", &ExactConfig::default());
    let (coal_tree, recon) = labeledrecon_to_recon(&result.gene_tree, &result.labeled_recon, &species_tree).unwrap();

    recon.validate(&coal_tree, &species_tree).unwrap();
    let locus_root = recon.locus_tree.root_index();
    assert_eq!(recon.locus_events[locus_root], LocusEvent::Duplication);
    assert_eq!(recon.locus_tree.num_vertices(), 3);

    // The copy founding the new locus is the daughter
    let daughter = *recon.daughters.iter().next().unwrap();
    assert_eq!(recon.daughters.len(), 1);
    assert_eq!(recon.locus_tree.name(daughter), "a1");
    assert_eq!(recon.coal_recon[coal_tree.root_index()], locus_root);

    // A daughter carries exactly one lineage
    let counts = lineage_counts(&coal_tree, &recon.coal_recon, &recon.locus_tree);
    assert_eq!(counts[daughter], 1);
}

#[test]
fn test_duplication_in_ancestral_species() {
    let species_tree = species_tree();
    let config = ExactConfig::default().with_implied(false).with_delay(false);
    let result = exact("((a,c),b);", &config);
    let (coal_tree, recon) = labeledrecon_to_recon(&result.gene_tree, &result.labeled_recon, &species_tree).unwrap();

    recon.validate(&coal_tree, &species_tree).unwrap();
    let dups: Vec<_> = (0..recon.locus_tree.num_vertices())
        .filter(|&x| recon.locus_events[x] == LocusEvent::Duplication)
        .collect();
    assert_eq!(dups.len(), 1);
    assert_eq!(species_tree.name(recon.locus_recon[dups[0]]), "R");
    assert_eq!(recon.locus_tree.num_leaves(), 3);
}

#[test]
fn test_invalid_order_is_rejected() {
    let species_tree = species_tree();
    let result = exact("(a1,a2);", &ExactConfig::default());
    let mut broken: LabeledRecon = result.labeled_recon.clone();
    let species_a = species_tree.find("A").unwrap();
    // The duplication listed before the split that creates its lineage
    broken.order.insert((species_a, 0), vec![0, 2]);

    let error = labeledrecon_to_recon(&result.gene_tree, &broken, &species_tree).unwrap_err();
    assert!(matches!(error, ReconError::InputInconsistency(_)));
}

// --- THREE-TREE TO LABELED ---
#[test]
fn test_round_trip_by_positions() {
    let species_tree = species_tree();
    let cases = [
        ("((a,b),c);", ExactConfig::default()),
        ("(a1,a2);", ExactConfig::default()),
        ("((a,c),b);", ExactConfig::default().with_implied(false)),
        ("((a,c),b);", ExactConfig::default().with_implied(false).with_delay(false)),
        ("(((a1,b1),(a2,b2)),c1);", ExactConfig::default()),
        // A lost lineage shares its locus with a live one
        ("(b1,(c2,(a3,c4)));", ExactConfig::default().with_implied(false).with_delay(false)),
    ];
    for (newick, config) in cases {
        let result = exact(newick, &config);
        let (coal_tree, recon) =
            labeledrecon_to_recon(&result.gene_tree, &result.labeled_recon, &species_tree).unwrap();
        let (gene_tree, back) =
            recon_to_labeledrecon(&coal_tree, &recon, &species_tree, &g2s(), false, config.delay).unwrap();

        back.validate(&gene_tree, &species_tree).unwrap();
        let back = Reconciliation::Labeled {
            gene_tree: &gene_tree,
            recon: &back,
        };
        assert!(reconciliations_equal(labeled(&result), back, &species_tree), "{newick}");
    }
}

#[test]
fn test_round_trip_by_lca() {
    let species_tree = species_tree();
    let config = ExactConfig::default().with_implied(false);
    let result = exact("((a,c),b);", &config);
    let (coal_tree, recon) = labeledrecon_to_recon(&result.gene_tree, &result.labeled_recon, &species_tree).unwrap();
    let (gene_tree, back) = recon_to_labeledrecon(&coal_tree, &recon, &species_tree, &g2s(), true, true).unwrap();

    let back = Reconciliation::Labeled {
        gene_tree: &gene_tree,
        recon: &back,
    };
    assert!(reconciliations_equal(labeled(&result), back, &species_tree));
}

#[test]
fn test_no_delay_rejects_extra_lineages() {
    let species_tree = species_tree();
    let result = exact("((a,c),b);", &ExactConfig::default().with_implied(false));
    let (coal_tree, recon) = labeledrecon_to_recon(&result.gene_tree, &result.labeled_recon, &species_tree).unwrap();

    let error = recon_to_labeledrecon(&coal_tree, &recon, &species_tree, &g2s(), false, false).unwrap_err();
    assert!(matches!(error, ReconError::Infeasible(_)));
}

#[test]
fn test_leaf_species_disagreement() {
    let species_tree = species_tree();
    let result = exact("((a,b),c);", &ExactConfig::default());
    let (coal_tree, recon) = labeledrecon_to_recon(&result.gene_tree, &result.labeled_recon, &species_tree).unwrap();

    let swapped = Gene2Species::from_pairs([("a", "B"), ("b", "A"), ("c", "C")]);
    let error = recon_to_labeledrecon(&coal_tree, &recon, &species_tree, &swapped, false, true).unwrap_err();
    assert!(matches!(error, ReconError::InputInconsistency(_)));
}

// --- MIXED EQUALITY ---
#[test]
fn test_labeled_equals_its_expansion() {
    let species_tree = species_tree();
    let result = exact("(a1,a2);", &ExactConfig::default());
    let (coal_tree, recon) = labeledrecon_to_recon(&result.gene_tree, &result.labeled_recon, &species_tree).unwrap();
    let three_tree = Reconciliation::ThreeTree {
        coal_tree: &coal_tree,
        recon: &recon,
    };

    assert!(reconciliations_equal(labeled(&result), three_tree, &species_tree));
    assert!(reconciliations_equal(three_tree, labeled(&result), &species_tree));

    let other = exact("((a,b),c);", &ExactConfig::default());
    assert!(!reconciliations_equal(labeled(&other), three_tree, &species_tree));
}

// --- RECON FROM A LOCUS TREE ---
#[test]
fn test_recon_from_locus_tree() {
    let species_tree = species_tree();
    let locus_tree = parse_str("((a1,a2)d,(b1,c1)s)r;").unwrap();
    let coal_tree = parse_str("(((a1,a2),b1),c1);").unwrap();
    let recon = recon_from_locus_tree(&coal_tree, &locus_tree, &species_tree, &g2s()).unwrap();

    recon.validate(&coal_tree, &species_tree).unwrap();
    let d = locus_tree.find("d").unwrap();
    let s = locus_tree.find("s").unwrap();
    assert_eq!(recon.locus_events[d], LocusEvent::Duplication);
    assert_eq!(recon.locus_events[s], LocusEvent::Speciation);
    assert_eq!(recon.locus_events[locus_tree.root_index()], LocusEvent::Duplication);
    assert_eq!(species_tree.name(recon.locus_recon[d]), "A");
    assert_eq!(species_tree.name(recon.locus_recon[s]), "R");

    // The coalescent root and (a1,a2),b1 sit at the locus root
    assert_eq!(recon.coal_recon[coal_tree.root_index()], locus_tree.root_index());
    let a12 = coal_tree.parent(coal_tree.find("a1").unwrap()).unwrap();
    assert_eq!(recon.coal_recon[a12], d);
}

#[test]
fn test_recon_from_locus_tree_missing_leaf() {
    let species_tree = species_tree();
    let locus_tree = parse_str("((a1,a2),c1);").unwrap();
    let coal_tree = parse_str("((a1,b1),c1);").unwrap();
    let error = recon_from_locus_tree(&coal_tree, &locus_tree, &species_tree, &g2s()).unwrap_err();
    assert!(matches!(error, ReconError::InputInconsistency(_)));
}

// --- DAUGHTERS ---
#[test]
fn test_daughters_prefer_single_lineage() {
    let locus_tree = parse_str("((a1,a2)x,a3)d;").unwrap();
    let coal_tree = parse_str("((a1,a3),a2);").unwrap();
    let depths = locus_tree.depths();
    let mut coal_recon = vec![0; coal_tree.num_vertices()];
    for vertex in coal_tree.post_order_iter() {
        coal_recon[vertex.index()] = if vertex.is_leaf() {
            locus_tree.find(vertex.name()).unwrap()
        } else {
            let children = vertex.children();
            locus_tree.lca(&depths, coal_recon[children[0]], coal_recon[children[1]])
        };
    }
    let mut events = vec![LocusEvent::Leaf; locus_tree.num_vertices()];
    let (x, d) = (locus_tree.find("x").unwrap(), locus_tree.find("d").unwrap());
    events[x] = LocusEvent::Duplication;
    events[d] = LocusEvent::Duplication;

    let counts = lineage_counts(&coal_tree, &coal_recon, &locus_tree);
    // Lineages of a1 and a2 both pass the edge above x
    assert_eq!(counts[x], 2);
    assert_eq!(counts[locus_tree.find("a3").unwrap()], 1);

    let daughters = propose_daughters(&coal_tree, &coal_recon, &locus_tree, &events);
    assert_eq!(daughters.len(), 2);
    assert!(daughters.contains(&locus_tree.find("a3").unwrap()));
    assert!(daughters.contains(&locus_tree.find("a1").unwrap()));
}
