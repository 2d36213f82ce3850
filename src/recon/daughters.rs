//! Daughter proposal for duplication vertices of a locus tree.

use crate::model::{LocusEvent, Tree, VertexIndex};
use log::trace;
use std::collections::BTreeSet;

/// Counts, for every locus-tree vertex, the coalescent lineages on the locus
/// edge above it.
///
/// The lineage above coalescent vertex `c` runs in the locus tree from
/// `coal_recon[c]` up to (excluding) `coal_recon[parent(c)]`; the lineage of
/// the coalescent root runs up to the locus root.
pub fn lineage_counts(coal_tree: &Tree, coal_recon: &[VertexIndex], locus_tree: &Tree) -> Vec<usize> {
    let mut counts = vec![0; locus_tree.num_vertices()];
    for vertex in coal_tree.pre_order_iter() {
        let stop = vertex.parent().map(|p| coal_recon[p]);
        let mut current = Some(coal_recon[vertex.index()]);
        while let Some(x) = current {
            if Some(x) == stop {
                break;
            }
            counts[x] += 1;
            current = locus_tree.parent(x);
        }
    }
    counts
}

/// Chooses the daughter of every duplication vertex of a locus tree.
///
/// A daughter founds a new locus and must carry exactly one coalescent
/// lineage. Among the children of a duplication, the lowest-index child with
/// exactly one lineage is chosen; if none qualifies, the child with the
/// fewest (but some) lineages; if all children are empty, the first one.
///
/// # Example
/// ```
/// use dlcrecon::model::LocusEvent;
/// use dlcrecon::newick::parse_str;
/// use dlcrecon::recon::propose_daughters;
///
/// let locus_tree = parse_str("((a1,a2)d,b);")?;
/// let coal_tree = locus_tree.clone();
/// let coal_recon: Vec<usize> = (0..coal_tree.num_vertices()).collect();
/// let mut events = vec![LocusEvent::Leaf; locus_tree.num_vertices()];
/// events[locus_tree.find("d").unwrap()] = LocusEvent::Duplication;
/// events[locus_tree.root_index()] = LocusEvent::Speciation;
///
/// let daughters = propose_daughters(&coal_tree, &coal_recon, &locus_tree, &events);
/// assert_eq!(daughters.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn propose_daughters(
    coal_tree: &Tree,
    coal_recon: &[VertexIndex],
    locus_tree: &Tree,
    locus_events: &[LocusEvent],
) -> BTreeSet<VertexIndex> {
    let counts = lineage_counts(coal_tree, coal_recon, locus_tree);
    let mut daughters = BTreeSet::new();
    for vertex in locus_tree.pre_order_iter() {
        if locus_events[vertex.index()] != LocusEvent::Duplication || vertex.is_leaf() {
            continue;
        }
        let children = vertex.children();
        let daughter = children
            .iter()
            .copied()
            .filter(|&c| counts[c] == 1)
            .min()
            .or_else(|| {
                children
                    .iter()
                    .copied()
                    .filter(|&c| counts[c] > 0)
                    .min_by_key(|&c| (counts[c], c))
            })
            .or_else(|| children.iter().copied().min());
        if let Some(daughter) = daughter {
            trace!(
                "daughter of {} is {} ({} lineages)",
                vertex.name(),
                locus_tree.name(daughter),
                counts[daughter]
            );
            daughters.insert(daughter);
        }
    }
    daughters
}
