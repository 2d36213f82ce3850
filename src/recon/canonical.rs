//! Canonical forms and equality of reconciliations.
//!
//! Vertex identifiers and names are arbitrary, so reconciliations are
//! compared on a canonical form: every vertex is named by the sorted leaf
//! names below it (with `#k` marking the k-th vertex of a unary chain),
//! loci are renumbered by first appearance in a name-sorted pre-order, and
//! runs of splits between two duplications are compared as sets.

use crate::model::{LabeledRecon, Locus, LocusEvent, Recon, Tree, VertexIndex};
use crate::parser::utils::escape_label;
use crate::recon::convert::labeledrecon_to_recon;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hasher;
use twox_hash::XxHash64;

/// A reconciliation in either form, borrowed together with its gene tree.
#[derive(Debug, Clone, Copy)]
pub enum Reconciliation<'a> {
    Labeled {
        gene_tree: &'a Tree,
        recon: &'a LabeledRecon,
    },
    ThreeTree {
        coal_tree: &'a Tree,
        recon: &'a Recon,
    },
}

/// Events of one (species, locus) between consecutive duplications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct OrderSegment {
    pub splits: BTreeSet<String>,
    /// Duplication child closing the segment (`None` for the last one)
    pub duplication: Option<String>,
}

/// Canonical form of a labeled reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalLabeled {
    pub topology: String,
    /// Canonical gene vertex name to (species name, canonical locus)
    pub labels: BTreeMap<String, (String, Locus)>,
    pub order: BTreeMap<(String, Locus), Vec<OrderSegment>>,
}

/// Canonical form of a three-tree reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecon {
    pub coal_topology: String,
    pub locus_topology: String,
    /// Canonical coalescent vertex name to canonical locus vertex name
    pub coal_recon: BTreeMap<String, String>,
    /// Canonical locus vertex name to (species name, event)
    pub locus_labels: BTreeMap<String, (String, LocusEvent)>,
    pub daughters: BTreeSet<String>,
}

// =#========================================================================#=
// CANONICAL NAMES
// =#========================================================================#=
/// Names every vertex by the sorted leaf names below it.
///
/// Leaves keep their names, internal vertices are named `(a,b,...)`; the
/// k-th vertex below the top of a unary chain gets the suffix `#k`. The
/// names only depend on the leaf-labeled topology.
///
/// # Example
/// ```
/// use dlcrecon::newick::parse_str;
/// use dlcrecon::recon::canonical_names;
///
/// let t1 = parse_str("((b,a)x,c)y;")?;
/// let t2 = parse_str("(c,(a,b));")?;
/// let mut names1 = canonical_names(&t1);
/// let mut names2 = canonical_names(&t2);
/// assert_eq!(names1[t1.root_index()], "(a,b,c)");
/// assert_eq!(names1[t1.find("x").unwrap()], "(a,b)");
///
/// names1.sort();
/// names2.sort();
/// assert_eq!(names1, names2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn canonical_names(tree: &Tree) -> Vec<String> {
    let n = tree.num_vertices();
    let mut base = vec![String::new(); n];
    for vertex in tree.post_order_iter() {
        base[vertex.index()] = if vertex.is_leaf() {
            vertex.name().to_string()
        } else {
            format!("({})", tree.leaf_names_below(vertex.index()).join(","))
        };
    }

    let mut chain = vec![0usize; n];
    let mut names = vec![String::new(); n];
    for vertex in tree.pre_order_iter() {
        let v = vertex.index();
        if let Some(parent) = vertex.parent() {
            if base[parent] == base[v] {
                chain[v] = chain[parent] + 1;
            }
        }
        names[v] = match chain[v] {
            0 => base[v].clone(),
            k => format!("{}#{k}", base[v]),
        };
    }
    names
}

/// Renders the leaf-labeled topology with children in sorted order.
pub fn canonical_newick(tree: &Tree) -> String {
    if !tree.is_root_set() {
        return ";".to_string();
    }
    let mut rendered: Vec<String> = vec![String::new(); tree.num_vertices()];
    for vertex in tree.post_order_iter() {
        rendered[vertex.index()] = if vertex.is_leaf() {
            escape_label(vertex.name())
        } else {
            let mut children: Vec<&str> = vertex.children().iter().map(|&c| rendered[c].as_str()).collect();
            children.sort_unstable();
            format!("({})", children.join(","))
        };
    }
    format!("{};", rendered[tree.root_index()])
}

/// Hashes the leaf-labeled topology of a tree (XxHash64, seed 0).
///
/// Trees with equal topology and leaf names hash equally, regardless of
/// child order and internal names.
pub fn structural_hash(tree: &Tree) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(canonical_newick(tree).as_bytes());
    hasher.finish()
}

/// Sorted pre-order by canonical name.
fn sorted_pre_order(tree: &Tree, names: &[String]) -> Vec<VertexIndex> {
    let mut order = Vec::with_capacity(tree.num_vertices());
    if !tree.is_root_set() {
        return order;
    }
    let mut stack = vec![tree.root_index()];
    while let Some(v) = stack.pop() {
        order.push(v);
        let mut children = tree.children(v).to_vec();
        children.sort_by(|&a, &b| names[b].cmp(&names[a]));
        stack.extend(children);
    }
    order
}

// =#========================================================================#=
// LABELED
// =#========================================================================#=
/// Computes the canonical form of a labeled reconciliation.
///
/// Unary vertices at the top of the tree, and unary vertices that repeat the
/// species and locus of their nearest kept ancestor, carry no information
/// and are dropped first.
pub fn canonical_labeled(gene_tree: &Tree, labeled: &LabeledRecon, species_tree: &Tree) -> CanonicalLabeled {
    let same_label = |a: VertexIndex, b: VertexIndex| {
        labeled.species_map[a] == labeled.species_map[b] && labeled.locus_map[a] == labeled.locus_map[b]
    };

    // Nearest kept ancestor per vertex, pre-order
    let mut removed = vec![false; gene_tree.num_vertices()];
    let mut kept_above: Vec<Option<VertexIndex>> = vec![None; gene_tree.num_vertices()];
    for vertex in gene_tree.pre_order_iter() {
        let v = vertex.index();
        let above = vertex
            .parent()
            .and_then(|p| if removed[p] { kept_above[p] } else { Some(p) });
        kept_above[v] = above;
        removed[v] = vertex.is_unary() && above.is_none_or(|a| same_label(a, v));
    }

    let (tree, mapping) = gene_tree.contract_unary(|v| removed[v.index()]);
    let mut original = vec![0; tree.num_vertices()];
    for (old, new) in mapping.iter().enumerate() {
        if let Some(new) = new {
            original[*new] = old;
        }
    }

    let names = canonical_names(&tree);
    let mut relabel: HashMap<Locus, Locus> = HashMap::new();
    for v in sorted_pre_order(&tree, &names) {
        let next = relabel.len();
        relabel.entry(labeled.locus_map[original[v]]).or_insert(next);
    }

    let labels = (0..tree.num_vertices())
        .map(|v| {
            let g = original[v];
            let species = species_tree.name(labeled.species_map[g]).to_string();
            (names[v].clone(), (species, relabel[&labeled.locus_map[g]]))
        })
        .collect();

    let mut order: BTreeMap<(String, Locus), Vec<OrderSegment>> = BTreeMap::new();
    for (&(species, key_locus), list) in &labeled.order {
        let Some(&locus) = relabel.get(&key_locus) else {
            continue;
        };
        let mut segments = Vec::new();
        let mut splits = BTreeSet::new();
        for &g in list {
            let Some(new) = mapping[g] else {
                continue;
            };
            if labeled.locus_map[g] == key_locus {
                splits.insert(names[new].clone());
            } else {
                segments.push(OrderSegment {
                    splits: std::mem::take(&mut splits),
                    duplication: Some(names[new].clone()),
                });
            }
        }
        if !splits.is_empty() || segments.is_empty() {
            segments.push(OrderSegment {
                splits,
                duplication: None,
            });
        }
        order.insert((species_tree.name(species).to_string(), locus), segments);
    }

    CanonicalLabeled {
        topology: canonical_newick(&tree),
        labels,
        order,
    }
}

// =#========================================================================#=
// THREE-TREE
// =#========================================================================#=
/// Computes the canonical form of a three-tree reconciliation.
pub fn canonical_recon(coal_tree: &Tree, recon: &Recon, species_tree: &Tree) -> CanonicalRecon {
    let coal_names = canonical_names(coal_tree);
    let locus_names = canonical_names(&recon.locus_tree);

    let coal_recon = (0..coal_tree.num_vertices())
        .map(|c| (coal_names[c].clone(), locus_names[recon.coal_recon[c]].clone()))
        .collect();
    let locus_labels = (0..recon.locus_tree.num_vertices())
        .map(|x| {
            let species = species_tree.name(recon.locus_recon[x]).to_string();
            (locus_names[x].clone(), (species, recon.locus_events[x]))
        })
        .collect();
    let daughters = recon.daughters.iter().map(|&d| locus_names[d].clone()).collect();

    CanonicalRecon {
        coal_topology: canonical_newick(coal_tree),
        locus_topology: canonical_newick(&recon.locus_tree),
        coal_recon,
        locus_labels,
        daughters,
    }
}

// =#========================================================================#=
// EQUALITY
// =#========================================================================#=
/// Decides whether two reconciliations are equal up to vertex naming.
///
/// Trees are first compared by [structural_hash], then the canonical forms
/// are compared. A labeled reconciliation compared to a three-tree one is
/// expanded with [labeledrecon_to_recon] first; if that fails, they differ.
///
/// # Example
/// ```
/// use dlcrecon::model::Gene2Species;
/// use dlcrecon::newick::parse_str;
/// use dlcrecon::recon::{reconcile_exact, reconciliations_equal, ExactConfig, Reconciliation};
///
/// let species_tree = parse_str("((A,B),C);")?;
/// let gene_tree = parse_str("((a,b),c);")?;
/// let g2s = Gene2Species::from_pairs([("a", "A"), ("b", "B"), ("c", "C")]);
/// let result = reconcile_exact(&gene_tree, &species_tree, &g2s, &ExactConfig::default())?;
///
/// let r = Reconciliation::Labeled { gene_tree: &result.gene_tree, recon: &result.labeled_recon };
/// assert!(reconciliations_equal(r, r, &species_tree));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn reconciliations_equal(a: Reconciliation, b: Reconciliation, species_tree: &Tree) -> bool {
    use Reconciliation::{Labeled, ThreeTree};

    match (a, b) {
        (
            Labeled {
                gene_tree: t1,
                recon: r1,
            },
            Labeled {
                gene_tree: t2,
                recon: r2,
            },
        ) => canonical_labeled(t1, r1, species_tree) == canonical_labeled(t2, r2, species_tree),
        (
            ThreeTree {
                coal_tree: t1,
                recon: r1,
            },
            ThreeTree {
                coal_tree: t2,
                recon: r2,
            },
        ) => {
            structural_hash(t1) == structural_hash(t2)
                && structural_hash(&r1.locus_tree) == structural_hash(&r2.locus_tree)
                && canonical_recon(t1, r1, species_tree) == canonical_recon(t2, r2, species_tree)
        }
        (Labeled { gene_tree, recon }, ThreeTree { coal_tree, recon: other })
        | (ThreeTree { coal_tree, recon: other }, Labeled { gene_tree, recon }) => {
            match labeledrecon_to_recon(gene_tree, recon, species_tree) {
                Ok((expanded_tree, expanded)) => reconciliations_equal(
                    ThreeTree {
                        coal_tree: &expanded_tree,
                        recon: &expanded,
                    },
                    ThreeTree {
                        coal_tree,
                        recon: other,
                    },
                    species_tree,
                ),
                Err(err) => {
                    debug!("labeled reconciliation cannot be expanded for comparison: {err}");
                    false
                }
            }
        }
    }
}
