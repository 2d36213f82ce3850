//! Exact most-parsimonious reconciliation by dynamic programming.
//!
//! The gene tree is first reconciled by LCA and augmented with implied
//! speciation vertices, which fixes the species map. The remaining choice is
//! the set of duplicated gene edges. The program walks the species tree top
//! down; its state at a species branch is the partition of the entering
//! lineages into loci (in restricted-growth form). For every state, all
//! subsets of the branch's gene edges are tried as duplications and the
//! child branches are solved recursively with memoization.

use crate::error::{ReconError, Result};
use crate::model::{Gene2Species, LabeledRecon, Locus, Tree, VertexIndex};
use crate::recon::config::ExactConfig;
use crate::recon::context::{ReconContext, reconcile_lca};
use crate::recon::cost::EventCounts;
use crate::recon::evaluate::{Policy, evaluate, evaluate_branch};
use log::{debug, info};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Largest number of gene edges per species branch enumerated exhaustively
/// when no `max_dups` bound is set.
pub const MAX_ENUMERATED_EDGES: usize = 20;

/// Result of the exact engine.
#[derive(Debug, Clone, Serialize)]
pub struct ExactResult {
    /// Gene tree including implied speciation vertices
    #[serde(skip)]
    pub gene_tree: Tree,
    pub labeled_recon: LabeledRecon,
    pub counts: EventCounts,
    pub cost: f64,
}

/// Best labeling below a species branch for one entering partition.
#[derive(Debug, Clone)]
struct Solution {
    /// Events in this branch and all branches below
    counts: EventCounts,
    /// Duplicated gene edges (by child vertex) in this branch
    dups: Vec<VertexIndex>,
}

type StateKey = (VertexIndex, Vec<Locus>);

struct ExactSolver<'c, 'a> {
    ctx: &'c ReconContext<'a>,
    config: &'c ExactConfig,
    policy: Policy,
    memo: HashMap<StateKey, Option<Solution>>,
    /// Locus of every gene vertex for the assignment under evaluation
    scratch: Vec<Locus>,
}

/// Computes a most-parsimonious labeled reconciliation.
///
/// # Errors
/// - [ReconError::InputInconsistency] if a gene leaf cannot be mapped
/// - [ReconError::Infeasible] if no labeling satisfies the configuration
/// - [ReconError::SearchSpaceTooLarge] if a species branch holds too many
///   gene edges for exhaustive enumeration without `max_dups`
///
/// # Example
/// ```
/// use dlcrecon::model::Gene2Species;
/// use dlcrecon::newick::parse_str;
/// use dlcrecon::recon::{reconcile_exact, ExactConfig};
///
/// let species_tree = parse_str("((A,B),C);")?;
/// let gene_tree = parse_str("(a1,a2);")?;
/// let g2s = Gene2Species::from_pairs([("a1", "A"), ("a2", "A")]);
///
/// let result = reconcile_exact(&gene_tree, &species_tree, &g2s, &ExactConfig::default())?;
/// assert_eq!(result.counts.dups, 1);
/// assert_eq!(result.cost, 1.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn reconcile_exact(
    gene_tree: &Tree,
    species_tree: &Tree,
    gene2species: &Gene2Species,
    config: &ExactConfig,
) -> Result<ExactResult> {
    config.costs.validate()?;
    let (augmented, species_map) = reconcile_lca(gene_tree, species_tree, gene2species)?;
    let ctx = ReconContext::new(&augmented, species_tree, species_map)?;
    info!(
        "exact reconciliation of {} gene vertices ({} after implied speciations) in {} species branches",
        gene_tree.num_vertices(),
        augmented.num_vertices(),
        ctx.species_order.len()
    );

    let mut solver = ExactSolver {
        ctx: &ctx,
        config,
        policy: config.policy(),
        memo: HashMap::new(),
        scratch: vec![0; augmented.num_vertices()],
    };
    let top = ctx.species_order[0];
    let counts = solver.solve(top, vec![0])?.ok_or_else(|| {
        ReconError::Infeasible(format!(
            "no labeling satisfies delay={} with max_dups={:?} and max_loci={:?}",
            config.delay, config.max_dups, config.max_loci
        ))
    })?;
    let locus_map = solver.reconstruct()?;

    let evaluation = evaluate(&ctx, &locus_map, solver.policy)
        .ok_or_else(|| ReconError::Infeasible("optimal labeling failed re-evaluation".to_string()))?;
    debug_assert_eq!(evaluation.counts, counts);
    let cost = counts.cost(&config.costs);
    info!(
        "exact reconciliation: {} dups, {} losses, {} extra lineages, cost {}",
        counts.dups,
        counts.losses,
        counts.coals(),
        cost
    );

    let labeled_recon = LabeledRecon::new(ctx.species_map.clone(), locus_map, evaluation.order);
    Ok(ExactResult {
        gene_tree: augmented,
        labeled_recon,
        counts,
        cost,
    })
}

impl ExactSolver<'_, '_> {
    /// Returns the optimal events below `species` for the given entering partition.
    fn solve(&mut self, species: VertexIndex, partition: Vec<Locus>) -> Result<Option<EventCounts>> {
        let key = (species, partition);
        if let Some(solution) = self.memo.get(&key) {
            return Ok(solution.as_ref().map(|s| s.counts));
        }
        let (species, partition) = key;

        let ctx = self.ctx;
        let branch = ctx.branch(species);
        let gene_root = ctx.gene_tree.root_index();
        let edges: Vec<VertexIndex> = branch.nodes.iter().copied().filter(|&g| g != gene_root).collect();
        if self.config.max_dups.is_none() && edges.len() > MAX_ENUMERATED_EDGES {
            return Err(ReconError::SearchSpaceTooLarge {
                species: ctx.species_tree.name(species).to_string(),
                edges: edges.len(),
            });
        }

        let num_classes = partition.iter().copied().collect::<HashSet<_>>().len();
        let max_size = self.config.max_dups.unwrap_or(edges.len()).min(edges.len());
        let children = ctx.species_tree.children(species).to_vec();
        let mut best: Option<Solution> = None;

        'sizes: for size in 0..=max_size {
            if self.config.max_loci.is_some_and(|max| num_classes + size > max) {
                break 'sizes;
            }
            for subset in Combinations::new(edges.len(), size) {
                let dups: Vec<VertexIndex> = subset.iter().map(|&i| edges[i]).collect();
                self.assign(species, &partition, &dups);
                let Some(outcome) = evaluate_branch(ctx, species, &partition, &self.scratch, self.policy) else {
                    continue;
                };

                let child_keys: Vec<(VertexIndex, Vec<Locus>)> = children
                    .iter()
                    .map(|&child| {
                        let entering: Vec<Locus> = ctx
                            .branch(child)
                            .entering
                            .iter()
                            .map(|lineage| lineage.parent.map_or(0, |p| self.scratch[p]))
                            .collect();
                        (child, restricted_growth(&entering))
                    })
                    .collect();

                let mut total = outcome.counts;
                let mut feasible = true;
                for (child, child_partition) in child_keys {
                    match self.solve(child, child_partition)? {
                        Some(counts) => total += counts,
                        None => {
                            feasible = false;
                            break;
                        }
                    }
                }
                if !feasible {
                    continue;
                }

                if best
                    .as_ref()
                    .is_none_or(|b| total.is_better_than(&b.counts, &self.config.costs))
                {
                    best = Some(Solution { counts: total, dups });
                }
            }
        }

        if let Some(solution) = &best {
            debug!(
                "species {} with partition {:?}: {} dups below, cost {}",
                ctx.species_tree.name(species),
                partition,
                solution.counts.dups,
                solution.counts.cost(&self.config.costs)
            );
        }
        let counts = best.as_ref().map(|s| s.counts);
        self.memo.insert((species, partition), best);
        Ok(counts)
    }

    /// Fills the scratch loci of a branch: entering classes keep their ids,
    /// every duplicated edge founds a fresh locus.
    fn assign(&mut self, species: VertexIndex, partition: &[Locus], dups: &[VertexIndex]) {
        let ctx = self.ctx;
        let mut next = partition.iter().max().map_or(0, |&m| m + 1);
        for &g in &ctx.branch(species).nodes {
            self.scratch[g] = if dups.contains(&g) {
                next += 1;
                next - 1
            } else {
                ctx.parent_locus(g, &self.scratch, partition)
            };
        }
    }

    /// Replays the memoized choices top-down into a global locus map.
    fn reconstruct(&self) -> Result<Vec<Locus>> {
        let ctx = self.ctx;
        let mut locus_map = vec![0; ctx.gene_tree.num_vertices()];
        let mut next = 1;
        for &species in &ctx.species_order {
            let branch = ctx.branch(species);
            let entering: Vec<Locus> = branch
                .entering
                .iter()
                .map(|lineage| lineage.parent.map_or(0, |p| locus_map[p]))
                .collect();
            let key = (species, restricted_growth(&entering));
            let solution = self
                .memo
                .get(&key)
                .and_then(|s| s.as_ref())
                .ok_or_else(|| ReconError::Infeasible(format!(
                    "no solution recorded for species {}",
                    ctx.species_tree.name(species)
                )))?;
            for &g in &branch.nodes {
                locus_map[g] = if solution.dups.contains(&g) {
                    next += 1;
                    next - 1
                } else {
                    ctx.parent_locus(g, &locus_map, &entering)
                };
            }
        }
        Ok(locus_map)
    }
}

/// Relabels values by first appearance: `[5, 3, 5, 7]` becomes `[0, 1, 0, 2]`.
fn restricted_growth(values: &[Locus]) -> Vec<Locus> {
    let mut seen: Vec<Locus> = Vec::new();
    values
        .iter()
        .map(|v| match seen.iter().position(|s| s == v) {
            Some(i) => i,
            None => {
                seen.push(*v);
                seen.len() - 1
            }
        })
        .collect()
}

// =#========================================================================#=
// COMBINATIONS
// =#========================================================================#=
/// Iterator over the `k`-subsets of `0..n` in lexicographic order.
struct Combinations {
    n: usize,
    indices: Vec<usize>,
    first: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            first: true,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.indices.len();
        if self.first {
            self.first = false;
            return (k <= self.n).then(|| self.indices.clone());
        }

        // Rightmost index that can still move right
        let i = (0..k).rev().find(|&i| self.indices[i] < self.n - k + i)?;
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.indices.clone())
    }
}
