//! Heuristic reconciliation search over locus trees.
//!
//! A candidate is the set of duplicated edges of the coalescent tree (with
//! its implied speciation vertices); it determines the loci and hence a locus
//! tree. Starting from a seed, each iteration draws `nprescreen` local
//! proposals and scores them with a cheap lower bound. Only the proposal
//! with the lowest bound is fully evaluated; it is kept only if it improves
//! on the best so far.

use crate::consensus::majority_consensus;
use crate::error::{ReconError, Result};
use crate::model::{Gene2Species, LabeledRecon, Locus, Recon, Tree, VertexIndex};
use crate::recon::config::SearchConfig;
use crate::recon::context::{ReconContext, reconcile_lca};
use crate::recon::convert::{labeledrecon_to_recon, recon_from_locus_tree, recon_to_labeled_counted};
use crate::recon::cost::{EPSILON, EventCounts};
use crate::recon::evaluate::{Policy, evaluate};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeSet;

/// Duplicated edges, each given by its child vertex.
type Candidate = BTreeSet<VertexIndex>;

/// Result bundle of the heuristic engine.
///
/// `recon` refers to `coal_tree`, `labeled_recon` to `gene_tree`. For a
/// single coalescent tree both trees are the input tree with its implied
/// speciation vertices; on the consensus path `coal_tree` is the consensus
/// coalescent tree.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(skip)]
    pub coal_tree: Tree,
    #[serde(skip)]
    pub recon: Recon,
    #[serde(skip)]
    pub gene_tree: Tree,
    pub labeled_recon: LabeledRecon,
    pub counts: EventCounts,
    pub cost: f64,
    /// Best cost after each iteration
    pub history: Vec<f64>,
    pub iterations: usize,
}

/// Searches for a low-cost reconciliation of one family.
///
/// Several coalescent trees are only accepted with `config.consensus`; each
/// is searched on its own, and the consensus reconciliation is derived from
/// the majority-rule consensus of the coalescent trees and of the found
/// locus trees.
///
/// If no feasible labeling is found (possible with `delay = false`), the
/// best-effort labeling is returned with its events counted as if delays
/// were allowed.
///
/// # Errors
/// - [ReconError::UnsupportedConfiguration] for an empty tree list or
///   several trees without consensus reduction
/// - [ReconError::InputInconsistency] for unmapped leaves or a seed locus
///   tree over other leaves
///
/// # Example
/// ```
/// use dlcrecon::model::Gene2Species;
/// use dlcrecon::newick::parse_str;
/// use dlcrecon::recon::{reconcile_search, SearchConfig};
///
/// let species_tree = parse_str("((A,B),C);")?;
/// let coal_tree = parse_str("((a1,b1),(a2,c1));")?;
/// let g2s = Gene2Species::from_pairs([("a1", "A"), ("a2", "A"), ("b1", "B"), ("c1", "C")]);
///
/// let config = SearchConfig::default().with_nsearch(50).with_seed(7);
/// let result = reconcile_search(&[coal_tree], &species_tree, &g2s, &config, None)?;
/// assert!(result.history.windows(2).all(|w| w[1] <= w[0]));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn reconcile_search(
    coal_trees: &[Tree],
    species_tree: &Tree,
    gene2species: &Gene2Species,
    config: &SearchConfig,
    init_locus_tree: Option<&Tree>,
) -> Result<SearchResult> {
    config.costs.validate()?;
    match coal_trees {
        [] => Err(ReconError::UnsupportedConfiguration(
            "no coalescent tree given".to_string(),
        )),
        [coal_tree] => search_single(coal_tree, species_tree, gene2species, config, init_locus_tree),
        _ if !config.consensus => Err(ReconError::UnsupportedConfiguration(format!(
            "{} coalescent trees given for one family; enable consensus to reduce them",
            coal_trees.len()
        ))),
        _ => search_consensus(coal_trees, species_tree, gene2species, config, init_locus_tree),
    }
}

fn search_single(
    coal_tree: &Tree,
    species_tree: &Tree,
    gene2species: &Gene2Species,
    config: &SearchConfig,
    init_locus_tree: Option<&Tree>,
) -> Result<SearchResult> {
    let (augmented, species_map) = reconcile_lca(coal_tree, species_tree, gene2species)?;
    let ctx = ReconContext::new(&augmented, species_tree, species_map)?;
    let search = Search::new(&ctx, config);

    let coal_seed = seed_candidate(&augmented, coal_tree, species_tree, gene2species)?;
    let seed = match init_locus_tree {
        None => coal_seed,
        Some(locus_tree) => {
            let candidate = seed_candidate(&augmented, locus_tree, species_tree, gene2species)?;
            if search.score(&candidate).is_some() {
                candidate
            } else {
                warn!("seed locus tree is infeasible, starting from the coalescent tree instead");
                coal_seed
            }
        }
    };

    info!(
        "searching reconciliations of {} coalescent vertices for up to {} iterations",
        augmented.num_vertices(),
        config.nsearch
    );
    let mut rng = StdRng::seed_from_u64(config.seed);
    let best = search.run(seed, &mut rng);

    let locus_map = search.locus_map(&best.candidate);
    let evaluation = match evaluate(&ctx, &locus_map, search.policy) {
        Some(evaluation) => evaluation,
        None => {
            warn!("no feasible reconciliation found, returning the best-effort labeling");
            let relaxed = Policy {
                delay: true,
                distinct_leaves: false,
                ..search.policy
            };
            evaluate(&ctx, &locus_map, relaxed)
                .ok_or_else(|| ReconError::Infeasible("best-effort labeling could not be evaluated".to_string()))?
        }
    };
    let counts = evaluation.counts;
    let cost = counts.cost(&config.costs);
    let labeled = LabeledRecon::new(ctx.species_map.clone(), locus_map, evaluation.order);
    let (coal_tree, recon) = labeledrecon_to_recon(&augmented, &labeled, species_tree)?;
    info!(
        "search finished after {} iterations: {} dups, {} losses, {} extra lineages, cost {}",
        best.iterations,
        counts.dups,
        counts.losses,
        counts.coals(),
        cost
    );

    Ok(SearchResult {
        coal_tree,
        recon,
        gene_tree: augmented.clone(),
        labeled_recon: labeled,
        counts,
        cost,
        history: best.history,
        iterations: best.iterations,
    })
}

fn search_consensus(
    coal_trees: &[Tree],
    species_tree: &Tree,
    gene2species: &Gene2Species,
    config: &SearchConfig,
    init_locus_tree: Option<&Tree>,
) -> Result<SearchResult> {
    info!("reducing {} coalescent trees to a consensus reconciliation", coal_trees.len());
    let results = coal_trees
        .iter()
        .map(|tree| search_single(tree, species_tree, gene2species, config, init_locus_tree))
        .collect::<Result<Vec<_>>>()?;

    let coal_tree = majority_consensus(coal_trees)?;
    let locus_trees: Vec<Tree> = results.iter().map(|r| r.recon.locus_tree.clone()).collect();
    let locus_tree = majority_consensus(&locus_trees)?;
    let recon = recon_from_locus_tree(&coal_tree, &locus_tree, species_tree, gene2species)?;

    let policy = Policy {
        implied: config.implied,
        delay: true,
        distinct_leaves: false,
        schedule: true,
    };
    let (gene_tree, labeled, counts) =
        recon_to_labeled_counted(&coal_tree, &recon, species_tree, gene2species, true, policy)?;
    let cost = counts.cost(&config.costs);
    debug!("consensus reconciliation has cost {cost}");

    Ok(SearchResult {
        coal_tree,
        recon,
        gene_tree,
        labeled_recon: labeled,
        counts,
        cost,
        history: vec![cost],
        iterations: results.iter().map(|r| r.iterations).sum(),
    })
}

/// Derives the duplicated edges of the coalescent tree from a locus tree.
fn seed_candidate(
    augmented: &Tree,
    locus_tree: &Tree,
    species_tree: &Tree,
    gene2species: &Gene2Species,
) -> Result<Candidate> {
    let recon = recon_from_locus_tree(augmented, locus_tree, species_tree, gene2species)?;
    let groups = recon.locus_groups();
    Ok(augmented
        .pre_order_iter()
        .filter_map(|v| {
            let parent = v.parent()?;
            let (gp, gc) = (groups[recon.coal_recon[parent]], groups[recon.coal_recon[v.index()]]);
            (gp != gc).then_some(v.index())
        })
        .collect())
}

// =#========================================================================#=
// SEARCH STATE
// =#========================================================================#=
struct Search<'c, 'a> {
    ctx: &'c ReconContext<'a>,
    config: &'c SearchConfig,
    policy: Policy,
    /// Edges that can carry a duplication (all but the root)
    edges: Vec<VertexIndex>,
}

/// Best candidate of a run with its trajectory.
struct BestFound {
    candidate: Candidate,
    history: Vec<f64>,
    iterations: usize,
}

/// Local modification of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    /// Two loci become one: drop a duplication
    Merge,
    /// A locus is split in two: add a duplication
    Split,
    /// A duplication moves to a sibling edge or one edge up
    Daughter,
}

const MOVES: [Move; 3] = [Move::Merge, Move::Split, Move::Daughter];

impl<'c, 'a> Search<'c, 'a> {
    fn new(ctx: &'c ReconContext<'a>, config: &'c SearchConfig) -> Self {
        let root = ctx.gene_tree.root_index();
        Self {
            ctx,
            config,
            policy: config.policy(),
            edges: ctx.gene_tree.pre_order().into_iter().filter(|&g| g != root).collect(),
        }
    }

    /// Assigns loci top-down: every duplicated edge founds a fresh locus.
    fn locus_map(&self, candidate: &Candidate) -> Vec<Locus> {
        let gene_tree = self.ctx.gene_tree;
        let mut locus_map = vec![0; gene_tree.num_vertices()];
        let mut next = 1;
        for vertex in gene_tree.pre_order_iter() {
            if let Some(parent) = vertex.parent() {
                locus_map[vertex.index()] = if candidate.contains(&vertex.index()) {
                    next += 1;
                    next - 1
                } else {
                    locus_map[parent]
                };
            }
        }
        locus_map
    }

    /// Full events of a candidate, `None` if infeasible.
    fn score(&self, candidate: &Candidate) -> Option<EventCounts> {
        evaluate(self.ctx, &self.locus_map(candidate), self.policy).map(|e| e.counts)
    }

    /// Lower bound of the cost: events without extra lineages at duplications.
    fn prescreen(&self, candidate: &Candidate) -> f64 {
        let policy = Policy {
            schedule: false,
            ..self.policy
        };
        evaluate(self.ctx, &self.locus_map(candidate), policy)
            .map_or(f64::INFINITY, |e| e.counts.cost(&self.config.costs))
    }

    fn run(&self, seed: Candidate, rng: &mut StdRng) -> BestFound {
        let costs = &self.config.costs;
        let mut best = seed;
        let mut best_counts = self.score(&best);
        let mut best_cost = best_counts.map_or(f64::INFINITY, |c| c.cost(costs));
        let mut history = Vec::with_capacity(self.config.nsearch);
        let mut stale = 0;
        let mut iterations = 0;

        for iteration in 0..self.config.nsearch {
            iterations = iteration + 1;

            let mut proposal: Option<(f64, Candidate)> = None;
            for _ in 0..self.config.nprescreen.max(1) {
                let Some(candidate) = self.propose(&best, rng) else {
                    break;
                };
                let bound = self.prescreen(&candidate);
                if proposal.as_ref().is_none_or(|(b, _)| bound < *b) {
                    proposal = Some((bound, candidate));
                }
            }

            let mut improved = false;
            if let Some((bound, candidate)) = proposal {
                if bound <= best_cost + EPSILON {
                    if let Some(counts) = self.score(&candidate) {
                        if best_counts.is_none_or(|b| counts.is_better_than(&b, costs)) {
                            best_cost = counts.cost(costs);
                            best_counts = Some(counts);
                            best = candidate;
                            improved = true;
                            debug!(
                                "iteration {iteration}: accepted {} duplications at cost {best_cost}",
                                best.len()
                            );
                        }
                    }
                }
            }

            history.push(best_cost);
            stale = if improved { 0 } else { stale + 1 };
            if self.config.nconverge.is_some_and(|n| stale >= n) {
                debug!("converged after {iterations} iterations");
                break;
            }
        }

        BestFound {
            candidate: best,
            history,
            iterations,
        }
    }

    /// Draws a random move applicable to `current`; `None` if no move applies.
    fn propose(&self, current: &Candidate, rng: &mut StdRng) -> Option<Candidate> {
        let start = rng.gen_range(0..MOVES.len());
        (0..MOVES.len()).find_map(|k| self.apply(MOVES[(start + k) % MOVES.len()], current, rng))
    }

    fn apply(&self, mv: Move, current: &Candidate, rng: &mut StdRng) -> Option<Candidate> {
        let gene_tree = self.ctx.gene_tree;
        let mut next = current.clone();
        match mv {
            Move::Merge => {
                let dup = pick(current.iter().copied(), rng)?;
                next.remove(&dup);
            }
            Move::Split => {
                let edge = pick(self.edges.iter().copied().filter(|e| !current.contains(e)), rng)?;
                next.insert(edge);
            }
            Move::Daughter => {
                let dup = pick(current.iter().copied(), rng)?;
                let parent = gene_tree.parent(dup)?;
                let sibling = pick(
                    gene_tree
                        .children(parent)
                        .iter()
                        .copied()
                        .filter(|&s| s != dup && !current.contains(&s)),
                    rng,
                );
                let target = match sibling {
                    Some(sibling) => sibling,
                    None if gene_tree.parent(parent).is_some() && !current.contains(&parent) => parent,
                    None => return None,
                };
                next.remove(&dup);
                next.insert(target);
            }
        }
        Some(next)
    }
}

/// Picks a uniformly random item.
fn pick<I: Iterator<Item = VertexIndex>>(items: I, rng: &mut StdRng) -> Option<VertexIndex> {
    let items: Vec<VertexIndex> = items.collect();
    if items.is_empty() {
        None
    } else {
        Some(items[rng.gen_range(0..items.len())])
    }
}
