//! Event accounting for a locus assignment.
//!
//! Given the loci of the lineages entering a species branch and the locus of
//! every gene vertex in it, [evaluate_branch] counts duplications, losses and
//! extra lineages, and schedules the splits and duplications of each locus
//! into a temporal order. The exact engine evaluates branches one at a time;
//! [evaluate] runs it over a whole gene tree.

use crate::model::{Locus, OrderKey, VertexIndex};
use crate::recon::context::{GeneKind, ReconContext};
use crate::recon::cost::EventCounts;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Counting policy shared by the engines and converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Policy {
    /// Lineages dying at implied speciation vertices count as extra lineages
    pub implied: bool,
    /// Extra lineages at the top of a species branch are allowed
    pub delay: bool,
    /// Gene leaves of one species must carry distinct loci
    pub distinct_leaves: bool,
    /// Schedule duplications (extra lineages at duplications and order)
    pub schedule: bool,
}

/// Events of one species branch.
#[derive(Debug, Clone, Default)]
pub(crate) struct BranchOutcome {
    pub counts: EventCounts,
    /// Order lists per parent locus (only non-empty ones)
    pub order: Vec<(Locus, Vec<VertexIndex>)>,
}

/// Events of a whole gene tree.
#[derive(Debug, Clone, Default)]
pub(crate) struct Evaluation {
    pub counts: EventCounts,
    pub order: BTreeMap<OrderKey, Vec<VertexIndex>>,
}

/// Evaluates one species branch.
///
/// `entering_loci[i]` is the locus of the i-th entering lineage, `locus`
/// must hold the locus of every gene vertex of the branch.
///
/// # Returns
/// `None` if the assignment is infeasible under the policy.
pub(crate) fn evaluate_branch(
    ctx: &ReconContext,
    species: VertexIndex,
    entering_loci: &[Locus],
    locus: &[Locus],
    policy: Policy,
) -> Option<BranchOutcome> {
    let branch = ctx.branch(species);
    let gene_root = ctx.gene_tree.root_index();
    let mut counts = EventCounts::default();

    // Duplications: vertices whose locus differs from the lineage above
    let mut born: BTreeMap<Locus, VertexIndex> = BTreeMap::new();
    for &g in &branch.nodes {
        if g != gene_root && ctx.parent_locus(g, locus, entering_loci) != locus[g] {
            counts.dups += 1;
            born.insert(locus[g], g);
        }
    }

    // Gene leaves of one species are distinct copies
    if policy.distinct_leaves && ctx.species_tree.vertex(species).is_leaf() {
        let mut seen = HashSet::new();
        if !branch.bottom.iter().all(|&b| seen.insert(locus[b])) {
            return None;
        }
    }

    // Extra lineages at the top, per locus: (live, dead)
    let mut top: BTreeMap<Locus, (usize, usize)> = BTreeMap::new();
    for (lineage, &l) in branch.entering.iter().zip(entering_loci) {
        let entry = top.entry(l).or_default();
        if lineage.child.is_some() {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
    for &(live, dead) in top.values() {
        let lineages = live + if policy.implied { dead } else { 0 };
        counts.coal_spec += lineages.saturating_sub(1);
    }
    if !policy.delay && counts.coal_spec > 0 {
        return None;
    }

    // Losses: loci present in the branch that do not reach its bottom
    let bottom: HashSet<Locus> = branch.bottom.iter().map(|&b| locus[b]).collect();
    let present: BTreeSet<Locus> = top.keys().chain(born.keys()).copied().collect();
    counts.losses = present.iter().filter(|l| !bottom.contains(l)).count();

    let mut order = Vec::new();
    if policy.schedule {
        let leads = leads_to_dup(ctx, species, locus);
        for &l in &present {
            let heads: BTreeSet<VertexIndex> = match born.get(&l) {
                Some(&g) => BTreeSet::from([g]),
                None => branch
                    .entering
                    .iter()
                    .zip(entering_loci)
                    .filter(|&(_, &el)| el == l)
                    .filter_map(|(lineage, _)| lineage.child)
                    .collect(),
            };
            let (coal_dup, events) = schedule_locus(ctx, l, heads, locus, &leads);
            counts.coal_dup += coal_dup;
            if !events.is_empty() {
                order.push((l, events));
            }
        }
    }

    Some(BranchOutcome { counts, order })
}

/// Split vertices of a branch whose subtree (within the branch and locus)
/// contains a duplication.
fn leads_to_dup(ctx: &ReconContext, species: VertexIndex, locus: &[Locus]) -> HashSet<VertexIndex> {
    let mut leads = HashSet::new();
    for &g in ctx.branch(species).nodes.iter().rev() {
        if ctx.kinds[g] != GeneKind::Split {
            continue;
        }
        let leading = ctx.gene_tree.children(g).iter().any(|&c| {
            locus[c] != locus[g] || (ctx.kinds[c] == GeneKind::Split && leads.contains(&c))
        });
        if leading {
            leads.insert(g);
        }
    }
    leads
}

/// Orders the splits and duplications of locus `l` in one branch.
///
/// `heads` are the vertices whose incoming lineage currently belongs to `l`.
/// Duplications are taken as soon as their lineage exists; otherwise the
/// split adding the fewest lineages on the way to a pending duplication goes
/// first (lowest index on ties), remaining splits last. A duplication with
/// `k` lineages of `l` left afterwards adds `k - 1` extra lineages.
///
/// # Returns
/// The extra lineages at duplications and the event order.
fn schedule_locus(
    ctx: &ReconContext,
    l: Locus,
    mut heads: BTreeSet<VertexIndex>,
    locus: &[Locus],
    leads: &HashSet<VertexIndex>,
) -> (usize, Vec<VertexIndex>) {
    let mut extra = 0;
    let mut events = Vec::new();
    loop {
        if let Some(&dup) = heads.iter().find(|&&g| locus[g] != l) {
            heads.remove(&dup);
            events.push(dup);
            extra += heads.len().saturating_sub(1);
            continue;
        }

        let splits = heads.iter().copied().filter(|&g| ctx.kinds[g] == GeneKind::Split);
        let next = splits
            .map(|g| {
                let added = ctx.gene_tree.children(g).len().saturating_sub(1);
                (!leads.contains(&g), added, g)
            })
            .min();
        let Some((_, _, split)) = next else {
            break;
        };
        heads.remove(&split);
        heads.extend(ctx.gene_tree.children(split).iter().copied());
        events.push(split);
    }
    (extra, events)
}

/// Evaluates a complete locus map over all species branches.
///
/// # Returns
/// `None` if the assignment is infeasible under the policy.
pub(crate) fn evaluate(ctx: &ReconContext, locus_map: &[Locus], policy: Policy) -> Option<Evaluation> {
    let mut evaluation = Evaluation::default();
    for &species in &ctx.species_order {
        let entering_loci: Vec<Locus> = ctx
            .branch(species)
            .entering
            .iter()
            .map(|lineage| match lineage.parent {
                Some(p) => locus_map[p],
                None => locus_map[ctx.gene_tree.root_index()],
            })
            .collect();
        let outcome = evaluate_branch(ctx, species, &entering_loci, locus_map, policy)?;
        evaluation.counts += outcome.counts;
        for (l, events) in outcome.order {
            evaluation.order.insert((species, l), events);
        }
    }
    Some(evaluation)
}
