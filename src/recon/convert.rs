//! Conversion between labeled reconciliations and the three-tree form.
//!
//! - [labeledrecon_to_recon] materializes the locus tree of a labeled
//!   reconciliation, one chain of locus vertices per species branch and
//!   locus, following the temporal order.
//! - [recon_to_labeledrecon] reads the species map, loci and order back off
//!   a locus tree, or recomputes the species map by LCA (`locus_mpr`).
//! - [recon_from_locus_tree] reconciles a coalescent tree into a given locus
//!   tree (LCA maps, events, and proposed daughters).

use crate::error::{ReconError, Result};
use crate::model::{Gene2Species, LabeledRecon, Locus, LocusEvent, OrderKey, Recon, Tree, VertexIndex};
use crate::recon::context::{
    GeneKind, ReconContext, add_implied_speciations, is_speciation, lca_species_map, reconcile_lca,
};
use crate::recon::cost::EventCounts;
use crate::recon::daughters::propose_daughters;
use crate::recon::evaluate::{Policy, evaluate};
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

// =#========================================================================#=
// LABELED TO THREE-TREE
// =#========================================================================#=
/// Expands a labeled reconciliation into the three-tree form.
///
/// The gene tree must contain its implied speciation vertices (as returned
/// by the engines). The returned coalescent tree is a copy of the gene tree,
/// so `coal_recon` is indexed like the gene tree.
///
/// Events of a species branch and locus are replayed in the listed order;
/// pending splits missing from the order are appended by index.
///
/// # Errors
/// [ReconError::InputInconsistency] if the labeled recon violates its
/// invariants, or the order lists an event before its lineage exists.
pub fn labeledrecon_to_recon(gene_tree: &Tree, labeled: &LabeledRecon, species_tree: &Tree) -> Result<(Tree, Recon)> {
    labeled.validate(gene_tree, species_tree)?;
    let ctx = ReconContext::new(gene_tree, species_tree, labeled.species_map.clone())?;
    let mut builder = ChainBuilder::new(&ctx, labeled);

    for &species in &ctx.species_order {
        builder.build_branch(species)?;
    }

    let ChainBuilder {
        locus_tree,
        locus_recon,
        locus_events,
        coal_recon,
        daughters,
        ..
    } = builder;
    let coal_recon = coal_recon
        .into_iter()
        .enumerate()
        .map(|(g, x)| {
            x.ok_or_else(|| {
                ReconError::input(format!("gene vertex {} is not reached by any locus", gene_tree.name(g)))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "materialized locus tree with {} vertices and {} duplications",
        locus_tree.num_vertices(),
        daughters.len()
    );
    let recon = Recon {
        locus_tree,
        locus_recon,
        locus_events,
        coal_recon,
        daughters,
    };
    Ok((gene_tree.clone(), recon))
}

/// Builds the locus tree chain by chain.
struct ChainBuilder<'c, 'a> {
    ctx: &'c ReconContext<'a>,
    labeled: &'c LabeledRecon,
    locus_tree: Tree,
    locus_recon: Vec<VertexIndex>,
    locus_events: Vec<LocusEvent>,
    coal_recon: Vec<Option<VertexIndex>>,
    daughters: BTreeSet<VertexIndex>,
    /// Bottom locus vertex of every (species, locus) chain reaching the bottom
    bottoms: HashMap<OrderKey, VertexIndex>,
}

/// A locus lineage to be followed through one species branch.
struct Chain {
    locus: Locus,
    /// Locus vertex above the chain (`None` for the locus root)
    attach: Option<VertexIndex>,
    /// Gene vertices whose incoming lineage belongs to the locus
    heads: BTreeSet<VertexIndex>,
    /// Founded by a duplication in this branch
    fresh: bool,
}

impl<'c, 'a> ChainBuilder<'c, 'a> {
    fn new(ctx: &'c ReconContext<'a>, labeled: &'c LabeledRecon) -> Self {
        Self {
            ctx,
            labeled,
            locus_tree: Tree::new(),
            locus_recon: Vec::new(),
            locus_events: Vec::new(),
            coal_recon: vec![None; ctx.gene_tree.num_vertices()],
            daughters: BTreeSet::new(),
            bottoms: HashMap::new(),
        }
    }

    fn build_branch(&mut self, species: VertexIndex) -> Result<()> {
        let (ctx, labeled) = (self.ctx, self.labeled);
        let locus_map = &labeled.locus_map;
        let gene_root = ctx.gene_tree.root_index();

        // Entering loci in ascending order
        let mut entering: BTreeMap<Locus, Chain> = BTreeMap::new();
        for lineage in &ctx.branch(species).entering {
            let locus = locus_map[lineage.parent.unwrap_or(gene_root)];
            let attach = match lineage.parent {
                None => None,
                Some(p) => {
                    let key = (ctx.species_map[p], locus);
                    Some(*self.bottoms.get(&key).ok_or_else(|| {
                        ReconError::input(format!(
                            "locus {locus} does not reach the bottom of species {}",
                            ctx.species_tree.name(key.0)
                        ))
                    })?)
                }
            };
            let chain = entering.entry(locus).or_insert(Chain {
                locus,
                attach,
                heads: BTreeSet::new(),
                fresh: false,
            });
            chain.heads.extend(lineage.child);
        }

        let mut queue: VecDeque<Chain> = entering.into_values().filter(|c| !c.heads.is_empty()).collect();
        while let Some(chain) = queue.pop_front() {
            self.build_chain(species, chain, &mut queue)?;
        }
        Ok(())
    }

    fn build_chain(&mut self, species: VertexIndex, chain: Chain, queue: &mut VecDeque<Chain>) -> Result<()> {
        let (ctx, labeled) = (self.ctx, self.labeled);
        let locus_map = &labeled.locus_map;
        let Chain {
            locus,
            attach,
            mut heads,
            fresh,
        } = chain;
        let is_event = |g: VertexIndex| locus_map[g] != locus || ctx.kinds[g] == GeneKind::Split;

        let mut current = attach;
        let mut first = None;
        let mut pending = Vec::new();
        let mut listed: VecDeque<VertexIndex> = labeled.order_of(species, locus).iter().copied().collect();

        loop {
            let next = match listed.pop_front() {
                Some(g) => g,
                None => match heads.iter().copied().find(|&g| is_event(g)) {
                    Some(g) => g,
                    None => break,
                },
            };
            if !heads.contains(&next) || !is_event(next) {
                return Err(ReconError::input(format!(
                    "order of species {} and locus {locus} lists {} out of place",
                    ctx.species_tree.name(species),
                    ctx.gene_tree.name(next)
                )));
            }
            heads.remove(&next);

            if locus_map[next] != locus {
                let dup = self.add_vertex(current, None, species, LocusEvent::Duplication);
                first.get_or_insert(dup);
                for g in pending.drain(..) {
                    self.coal_recon[g] = Some(dup);
                }
                queue.push_back(Chain {
                    locus: locus_map[next],
                    attach: Some(dup),
                    heads: BTreeSet::from([next]),
                    fresh: true,
                });
                current = Some(dup);
            } else {
                heads.extend(ctx.gene_tree.children(next).iter().copied());
                pending.push(next);
            }
        }

        if !heads.is_empty() {
            let bottom = if ctx.species_tree.vertex(species).is_leaf() {
                let mut leaves = heads.iter().copied();
                let (Some(leaf), None) = (leaves.next(), leaves.next()) else {
                    return Err(ReconError::input(format!(
                        "several gene leaves of species {} share locus {locus}",
                        ctx.species_tree.name(species)
                    )));
                };
                let name = ctx.gene_tree.name(leaf).to_string();
                self.add_vertex(current, Some(&name), species, LocusEvent::Leaf)
            } else {
                self.add_vertex(current, None, species, LocusEvent::Speciation)
            };
            first.get_or_insert(bottom);
            for &g in heads.iter().chain(&pending) {
                self.coal_recon[g] = Some(bottom);
            }
            self.bottoms.insert((species, locus), bottom);
        }

        if fresh {
            let daughter = first.ok_or_else(|| {
                ReconError::input(format!("locus {locus} is founded without any lineage"))
            })?;
            self.daughters.insert(daughter);
        }
        Ok(())
    }

    /// Adds a locus vertex below `parent` (or as root). A requested name that
    /// is taken by a generated name moves the generated one out of the way.
    fn add_vertex(
        &mut self,
        parent: Option<VertexIndex>,
        name: Option<&str>,
        species: VertexIndex,
        event: LocusEvent,
    ) -> VertexIndex {
        if let Some(name) = name {
            if let Some(taken) = self.locus_tree.find(name) {
                let fresh = self.locus_tree.unique_name("n");
                self.locus_tree.rename(taken, fresh);
            }
        }
        let index = match parent {
            None => self.locus_tree.add_root_vertex(name),
            Some(parent) => self.locus_tree.add_child(parent, name, None),
        };
        self.locus_recon.push(species);
        self.locus_events.push(event);
        index
    }
}

// =#========================================================================#=
// THREE-TREE TO LABELED
// =#========================================================================#=
/// Collapses a three-tree reconciliation into labeled form.
///
/// With `locus_mpr = false`, the species map is read off the locus tree
/// (`locus_recon[coal_recon[g]]`); loci are the locus groups of
/// [Recon::locus_groups] and the order follows the positions on the locus
/// tree. With `locus_mpr = true`, unary coalescent vertices are dropped, the
/// species map is recomputed by LCA via `gene2species` and the order is
/// scheduled greedily.
///
/// Implied speciation vertices are inserted where missing; the returned gene
/// tree is the augmented coalescent tree.
///
/// # Errors
/// - [ReconError::InputInconsistency] if the recon is malformed or a
///   coalescent leaf disagrees with `gene2species`
/// - [ReconError::Infeasible] if `delay` is false and live lineages of one
///   locus enter a species branch without coalescing first
pub fn recon_to_labeledrecon(
    coal_tree: &Tree,
    recon: &Recon,
    species_tree: &Tree,
    gene2species: &Gene2Species,
    locus_mpr: bool,
    delay: bool,
) -> Result<(Tree, LabeledRecon)> {
    // Dead lineages may share a locus with live ones, whatever policy
    // produced the recon; only live extra lineages violate `delay = false`
    let policy = Policy {
        implied: false,
        delay,
        distinct_leaves: false,
        schedule: true,
    };
    let (gene_tree, labeled, _) = recon_to_labeled_counted(coal_tree, recon, species_tree, gene2species, locus_mpr, policy)?;
    Ok((gene_tree, labeled))
}

/// [recon_to_labeledrecon] that also returns the events under `policy`.
pub(crate) fn recon_to_labeled_counted(
    coal_tree: &Tree,
    recon: &Recon,
    species_tree: &Tree,
    gene2species: &Gene2Species,
    locus_mpr: bool,
    policy: Policy,
) -> Result<(Tree, LabeledRecon, EventCounts)> {
    recon.validate(coal_tree, species_tree)?;
    let groups = recon.locus_groups();

    let (gene_tree, species_map, locus_map) = if locus_mpr {
        mpr_labeling(coal_tree, recon, species_tree, gene2species, &groups)?
    } else {
        check_leaf_species(coal_tree, recon, species_tree, gene2species)?;
        let species_map: Vec<VertexIndex> = recon.coal_recon.iter().map(|&x| recon.locus_recon[x]).collect();
        let (gene_tree, species_map) = add_implied_speciations(coal_tree, species_tree, species_map);
        let locus_map = (0..gene_tree.num_vertices())
            .map(|g| groups[implied_locus_vertex(&gene_tree, coal_tree, recon, species_tree, &species_map, g)])
            .collect();
        (gene_tree, species_map, locus_map)
    };

    let ctx = ReconContext::new(&gene_tree, species_tree, species_map)?;
    let evaluation = evaluate(&ctx, &locus_map, policy).ok_or_else(|| {
        ReconError::Infeasible("lineages enter a species branch uncoalesced while delay is off".to_string())
    })?;
    let order = if locus_mpr {
        evaluation.order
    } else {
        positional_order(&ctx, coal_tree, recon, &locus_map, &groups)?
    };

    let labeled = LabeledRecon::new(ctx.species_map.clone(), locus_map, order);
    Ok((gene_tree, labeled, evaluation.counts))
}

/// Checks that every coalescent leaf lies in the species `gene2species` names.
fn check_leaf_species(coal_tree: &Tree, recon: &Recon, species_tree: &Tree, gene2species: &Gene2Species) -> Result<()> {
    for leaf in coal_tree.leaves() {
        let name = coal_tree.name(leaf);
        let species = species_tree.name(recon.locus_recon[recon.coal_recon[leaf]]);
        match gene2species.species_of(name) {
            Some(expected) if expected == species => {}
            Some(expected) => {
                return Err(ReconError::input(format!(
                    "coalescent leaf {name} is reconciled to {species} but belongs to {expected}"
                )));
            }
            None => {
                return Err(ReconError::input(format!(
                    "gene leaf {name} is not covered by the species map"
                )));
            }
        }
    }
    Ok(())
}

/// Labels a coalescent tree by LCA, keeping the loci of the recon.
fn mpr_labeling(
    coal_tree: &Tree,
    recon: &Recon,
    species_tree: &Tree,
    gene2species: &Gene2Species,
    groups: &[Locus],
) -> Result<(Tree, Vec<VertexIndex>, Vec<Locus>)> {
    let (contracted, mapping) = coal_tree.contract_unary(|_| true);
    let mut original = vec![0; contracted.num_vertices()];
    for (old, new) in mapping.iter().enumerate() {
        if let Some(new) = new {
            original[*new] = old;
        }
    }

    let (gene_tree, species_map) = reconcile_lca(&contracted, species_tree, gene2species)?;
    let mut locus_map = vec![0; gene_tree.num_vertices()];
    for g in 0..gene_tree.num_vertices() {
        let locus = if g < contracted.num_vertices() {
            groups[recon.coal_recon[original[g]]]
        } else {
            // Implied vertices are appended after their child
            gene_tree.children(g).first().map_or(0, |&c| locus_map[c])
        };
        locus_map[g] = locus;
    }
    Ok((gene_tree, species_map, locus_map))
}

/// Returns the locus vertex whose incoming edge carries gene vertex `g`.
///
/// Original vertices use `coal_recon`; an inserted implied vertex in species
/// `t` sits on the locus edge that spans the bottom of `t` above its
/// nearest original descendant.
fn implied_locus_vertex(
    gene_tree: &Tree,
    coal_tree: &Tree,
    recon: &Recon,
    species_tree: &Tree,
    species_map: &[VertexIndex],
    g: VertexIndex,
) -> VertexIndex {
    let n = coal_tree.num_vertices();
    if g < n {
        return recon.coal_recon[g];
    }
    let mut below = g;
    while below >= n {
        match gene_tree.children(below).first() {
            Some(&c) => below = c,
            None => return recon.locus_tree.root_index(),
        }
    }
    let t = species_map[g];
    let mut x = recon.coal_recon[below];
    while let Some(px) = recon.locus_tree.parent(x) {
        let sp = recon.locus_recon[px];
        let climb = if sp == t {
            recon.locus_events[px] == LocusEvent::Speciation
        } else {
            species_tree.is_ancestor(t, sp)
        };
        if !climb {
            break;
        }
        x = px;
        if sp == t {
            break;
        }
    }
    x
}

/// Orders the events of each (species, locus) by their position on the
/// locus tree: splits on the locus edge above a vertex come before the
/// duplication at that vertex.
fn positional_order(
    ctx: &ReconContext,
    coal_tree: &Tree,
    recon: &Recon,
    locus_map: &[Locus],
    groups: &[Locus],
) -> Result<BTreeMap<OrderKey, Vec<VertexIndex>>> {
    let gene_tree = ctx.gene_tree;
    let locus_depths = recon.locus_tree.depths();
    let gene_depths = gene_tree.depths();

    let mut tops: HashMap<Locus, VertexIndex> = HashMap::new();
    for vertex in recon.locus_tree.pre_order_iter() {
        let x = vertex.index();
        if vertex.parent().is_none_or(|p| groups[p] != groups[x]) {
            tops.entry(groups[x]).or_insert(x);
        }
    }

    type TimedEvent = ((usize, u8, usize), VertexIndex);
    let mut timed: BTreeMap<OrderKey, Vec<TimedEvent>> = BTreeMap::new();
    for vertex in gene_tree.pre_order_iter() {
        let g = vertex.index();
        if ctx.kinds[g] == GeneKind::Split && g < coal_tree.num_vertices() {
            let key = (ctx.species_map[g], locus_map[g]);
            let depth = locus_depths[recon.coal_recon[g]];
            timed.entry(key).or_default().push(((depth, 0, gene_depths[g]), g));
        }
        if let Some(p) = vertex.parent() {
            if locus_map[p] != locus_map[g] {
                let dup = tops
                    .get(&locus_map[g])
                    .and_then(|&top| recon.locus_tree.parent(top))
                    .ok_or_else(|| {
                        ReconError::input(format!("locus of {} has no duplication above it", vertex.name()))
                    })?;
                let key = (ctx.species_map[g], locus_map[p]);
                timed.entry(key).or_default().push(((locus_depths[dup], 1, gene_depths[g]), g));
            }
        }
    }

    Ok(timed
        .into_iter()
        .map(|(key, mut events)| {
            events.sort();
            (key, events.into_iter().map(|(_, g)| g).collect())
        })
        .collect())
}

// =#========================================================================#=
// RECON FROM A LOCUS TREE
// =#========================================================================#=
/// Reconciles a coalescent tree into a locus tree over the same leaf names.
///
/// The locus tree is mapped to the species tree by LCA (speciation where its
/// children separate into distinct child species, duplication otherwise),
/// the coalescent tree is mapped to the locus tree by LCA of leaf names, and
/// daughters are chosen by [propose_daughters].
///
/// # Errors
/// [ReconError::InputInconsistency] if a coalescent leaf has no locus leaf of
/// the same name or a locus leaf has no species.
pub fn recon_from_locus_tree(
    coal_tree: &Tree,
    locus_tree: &Tree,
    species_tree: &Tree,
    gene2species: &Gene2Species,
) -> Result<Recon> {
    let locus_recon = lca_species_map(locus_tree, species_tree, gene2species)?;
    let locus_events: Vec<LocusEvent> = (0..locus_tree.num_vertices())
        .map(|x| {
            if locus_tree.vertex(x).is_leaf() {
                LocusEvent::Leaf
            } else if is_speciation(locus_tree, species_tree, &locus_recon, x) {
                LocusEvent::Speciation
            } else {
                LocusEvent::Duplication
            }
        })
        .collect();

    let depths = locus_tree.depths();
    let mut coal_recon = vec![0; coal_tree.num_vertices()];
    for vertex in coal_tree.post_order_iter() {
        let c = vertex.index();
        coal_recon[c] = if vertex.is_leaf() {
            locus_tree
                .find(vertex.name())
                .filter(|&x| locus_tree.vertex(x).is_leaf())
                .ok_or_else(|| ReconError::input(format!("locus tree has no leaf {}", vertex.name())))?
        } else {
            let mut children = vertex.children().iter().map(|&child| coal_recon[child]);
            let first = children.next().unwrap_or(0);
            children.fold(first, |acc, x| locus_tree.lca(&depths, acc, x))
        };
    }

    let daughters = propose_daughters(coal_tree, &coal_recon, locus_tree, &locus_events);
    Ok(Recon {
        locus_tree: locus_tree.clone(),
        locus_recon,
        locus_events,
        coal_recon,
        daughters,
    })
}
