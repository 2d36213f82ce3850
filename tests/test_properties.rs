use dlcrecon::model::{Gene2Species, Tree};
use dlcrecon::newick::parse_str;
use dlcrecon::recon::{
    CostModel, ExactConfig, Reconciliation, canonical_newick, labeledrecon_to_recon, recon_to_labeledrecon,
    reconcile_exact, reconciliations_equal, structural_hash,
};
use proptest::prelude::*;

/// Tree shape with leaves drawn from three species.
#[derive(Debug, Clone)]
enum Shape {
    Leaf(usize),
    Node(Vec<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = (0..3usize).prop_map(Shape::Leaf);
    leaf.prop_recursive(2, 4, 2, |inner| {
        prop::collection::vec(inner, 2..=2).prop_map(Shape::Node)
    })
}

fn gene_shape() -> impl Strategy<Value = Shape> {
    prop::collection::vec(shape(), 2..=2).prop_map(Shape::Node)
}

/// Newick of a shape; leaves are numbered in stored order, so `reversed`
/// only flips child order and keeps the names.
fn render(shape: &Shape, reversed: bool, next: &mut usize) -> String {
    match shape {
        Shape::Leaf(species) => {
            *next += 1;
            format!("{}{}", ["a", "b", "c"][*species], *next)
        }
        Shape::Node(children) => {
            let mut parts: Vec<String> = children.iter().map(|c| render(c, reversed, next)).collect();
            if reversed {
                parts.reverse();
            }
            format!("({})", parts.join(","))
        }
    }
}

fn to_tree(shape: &Shape, reversed: bool) -> Tree {
    parse_str(format!("{};", render(shape, reversed, &mut 0))).unwrap()
}

fn species_tree() -> Tree {
    parse_str("((A,B)AB,C)R;").unwrap()
}

fn g2s() -> Gene2Species {
    Gene2Species::from_smap("a*\tA\nb*\tB\nc*\tC\n").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

    #[test]
    fn canonical_form_ignores_child_order(shape in gene_shape()) {
        let tree = to_tree(&shape, false);
        let mirrored = to_tree(&shape, true);
        prop_assert_eq!(canonical_newick(&tree), canonical_newick(&mirrored));
        prop_assert_eq!(structural_hash(&tree), structural_hash(&mirrored));
    }

    #[test]
    fn exact_optimum_is_monotone_in_costs(shape in gene_shape()) {
        let species_tree = species_tree();
        let g2s = g2s();
        let gene_tree = to_tree(&shape, false);

        let unit = CostModel::new(1.0, 1.0, 1.0);
        let config = ExactConfig::default().with_implied(false);
        let cheap = reconcile_exact(&gene_tree, &species_tree, &g2s, &config.clone().with_costs(unit)).unwrap();
        let dear = reconcile_exact(&gene_tree, &species_tree, &g2s, &config.with_costs(CostModel::new(2.0, 1.0, 1.0))).unwrap();

        cheap.labeled_recon.validate(&cheap.gene_tree, &species_tree).unwrap();
        prop_assert!((cheap.cost - cheap.counts.cost(&unit)).abs() < 1e-9);
        prop_assert!(dear.cost >= cheap.cost - 1e-9);
        // Optimal under unit costs, so no worse than the other optimum re-costed
        prop_assert!(cheap.cost <= dear.counts.cost(&unit) + 1e-9);
    }

    #[test]
    fn conversion_round_trip_keeps_the_reconciliation(
        shape in gene_shape(),
        implied in any::<bool>(),
        delay in any::<bool>(),
    ) {
        let species_tree = species_tree();
        let config = ExactConfig::default().with_implied(implied).with_delay(delay);
        let result = reconcile_exact(&to_tree(&shape, false), &species_tree, &g2s(), &config);
        prop_assume!(result.is_ok());
        let result = result.unwrap();

        let (coal_tree, recon) =
            labeledrecon_to_recon(&result.gene_tree, &result.labeled_recon, &species_tree).unwrap();
        recon.validate(&coal_tree, &species_tree).unwrap();
        let (gene_tree, back) =
            recon_to_labeledrecon(&coal_tree, &recon, &species_tree, &g2s(), false, delay).unwrap();
        back.validate(&gene_tree, &species_tree).unwrap();

        let original = Reconciliation::Labeled {
            gene_tree: &result.gene_tree,
            recon: &result.labeled_recon,
        };
        let returned = Reconciliation::Labeled {
            gene_tree: &gene_tree,
            recon: &back,
        };
        prop_assert!(reconciliations_equal(original, returned, &species_tree));
    }

    #[test]
    fn equality_is_reflexive_and_symmetric(shape in gene_shape(), implied in any::<bool>()) {
        let species_tree = species_tree();
        let config = ExactConfig::default().with_implied(implied);
        let result = reconcile_exact(&to_tree(&shape, false), &species_tree, &g2s(), &config).unwrap();
        let mirrored = reconcile_exact(&to_tree(&shape, true), &species_tree, &g2s(), &config).unwrap();
        let (coal_tree, recon) =
            labeledrecon_to_recon(&result.gene_tree, &result.labeled_recon, &species_tree).unwrap();

        let labeled = Reconciliation::Labeled {
            gene_tree: &result.gene_tree,
            recon: &result.labeled_recon,
        };
        let other = Reconciliation::Labeled {
            gene_tree: &mirrored.gene_tree,
            recon: &mirrored.labeled_recon,
        };
        let three_tree = Reconciliation::ThreeTree {
            coal_tree: &coal_tree,
            recon: &recon,
        };

        prop_assert!(reconciliations_equal(labeled, labeled, &species_tree));
        prop_assert!(reconciliations_equal(three_tree, three_tree, &species_tree));
        prop_assert!(reconciliations_equal(labeled, three_tree, &species_tree));
        prop_assert!(reconciliations_equal(three_tree, labeled, &species_tree));
        prop_assert_eq!(
            reconciliations_equal(labeled, other, &species_tree),
            reconciliations_equal(other, labeled, &species_tree)
        );
        prop_assert_eq!(
            reconciliations_equal(other, three_tree, &species_tree),
            reconciliations_equal(three_tree, other, &species_tree)
        );
    }
}
