//! Species maps, implied speciation vertices, and the per-branch view of a
//! gene tree inside a species tree.

use crate::error::{ReconError, Result};
use crate::model::{Gene2Species, Tree, VertexIndex};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Prefix of the names of inserted implied speciation vertices.
const IMPLIED_PREFIX: &str = "i";

/// Role of a gene vertex inside its species branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GeneKind {
    /// Extant gene copy
    Leaf,
    /// All children map strictly below, into distinct child species
    Speciation,
    /// All children stay in the same species branch (a coalescence)
    Split,
}

/// A gene lineage entering a species branch from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lineage {
    /// Speciation vertex in the parent species (`None` for the gene root)
    pub parent: Option<VertexIndex>,
    /// Gene vertex the lineage leads to (`None` if it dies in this branch)
    pub child: Option<VertexIndex>,
}

/// Gene vertices of one species branch.
#[derive(Debug, Clone, Default)]
pub(crate) struct Branch {
    /// Lineages entering at the top, in gene pre-order of their parents
    pub entering: Vec<Lineage>,
    /// Gene vertices mapped to this branch, in pre-order
    pub nodes: Vec<VertexIndex>,
    /// Leaves and speciation vertices (the lineages leaving at the bottom)
    pub bottom: Vec<VertexIndex>,
    /// Gene vertex at the top of the branch to its entering lineage
    pub entering_of: HashMap<VertexIndex, usize>,
}

// =#========================================================================#=
// RECON CONTEXT
// =#========================================================================#=
/// A gene tree with a complete species map, factored into species branches.
///
/// The species map must contain all implied speciation vertices: every gene
/// edge crossing a species boundary goes from a speciation vertex in
/// species `t` to a vertex in a child species of `t`.
pub(crate) struct ReconContext<'a> {
    pub gene_tree: &'a Tree,
    pub species_tree: &'a Tree,
    pub species_map: Vec<VertexIndex>,
    pub kinds: Vec<GeneKind>,
    /// Branches keyed by species vertex, for the subtree below the gene root
    pub branches: BTreeMap<VertexIndex, Branch>,
    /// Species vertices below (and at) the species of the gene root, pre-order
    pub species_order: Vec<VertexIndex>,
}

impl<'a> ReconContext<'a> {
    /// Builds the context, checking that the species map is ancestry-monotone
    /// and contains all implied speciation vertices.
    pub fn new(gene_tree: &'a Tree, species_tree: &'a Tree, species_map: Vec<VertexIndex>) -> Result<Self> {
        if species_map.len() != gene_tree.num_vertices() {
            return Err(ReconError::input("species map does not cover the gene tree"));
        }

        let mut kinds = Vec::with_capacity(gene_tree.num_vertices());
        for vertex in gene_tree.vertices() {
            let g = vertex.index();
            let species = species_map[g];
            if vertex.is_leaf() {
                if !species_tree.vertex(species).is_leaf() {
                    return Err(ReconError::input(format!(
                        "gene leaf {} maps to internal species {}",
                        vertex.name(),
                        species_tree.name(species)
                    )));
                }
                kinds.push(GeneKind::Leaf);
                continue;
            }
            for &child in vertex.children() {
                if !species_tree.is_ancestor(species, species_map[child]) {
                    return Err(ReconError::input(format!(
                        "species map not ancestry-monotone: {} ({}) has child {} ({})",
                        vertex.name(),
                        species_tree.name(species),
                        gene_tree.name(child),
                        species_tree.name(species_map[child])
                    )));
                }
            }
            if is_speciation(gene_tree, species_tree, &species_map, g) {
                kinds.push(GeneKind::Speciation);
            } else if vertex.children().iter().all(|&c| species_map[c] == species) {
                kinds.push(GeneKind::Split);
            } else {
                return Err(ReconError::input(format!(
                    "gene vertex {} lacks implied speciation vertices below it",
                    vertex.name()
                )));
            }
        }

        // Crossing edges must go to a child species
        for vertex in gene_tree.vertices() {
            if let Some(parent) = vertex.parent() {
                let (sp, sc) = (species_map[parent], species_map[vertex.index()]);
                if sp != sc && species_tree.parent(sc) != Some(sp) {
                    return Err(ReconError::input(format!(
                        "gene edge above {} skips species between {} and {}",
                        vertex.name(),
                        species_tree.name(sp),
                        species_tree.name(sc)
                    )));
                }
            }
        }

        let mut context = Self {
            gene_tree,
            species_tree,
            species_map,
            kinds,
            branches: BTreeMap::new(),
            species_order: Vec::new(),
        };
        context.build_branches();
        Ok(context)
    }

    fn build_branches(&mut self) {
        let gene_root = self.gene_tree.root_index();
        let species_top = self.species_map[gene_root];

        let mut stack = vec![species_top];
        while let Some(s) = stack.pop() {
            self.species_order.push(s);
            self.branches.insert(s, Branch::default());
            stack.extend(self.species_tree.children(s).iter().rev().copied());
        }

        if let Some(top) = self.branches.get_mut(&species_top) {
            top.entering_of.insert(gene_root, 0);
            top.entering.push(Lineage {
                parent: None,
                child: Some(gene_root),
            });
        }

        for vertex in self.gene_tree.pre_order_iter() {
            let g = vertex.index();
            let species = self.species_map[g];
            if let Some(branch) = self.branches.get_mut(&species) {
                branch.nodes.push(g);
                if self.kinds[g] != GeneKind::Split {
                    branch.bottom.push(g);
                }
            }
            if self.kinds[g] != GeneKind::Speciation {
                continue;
            }
            for &child_species in self.species_tree.children(species) {
                let child = vertex
                    .children()
                    .iter()
                    .copied()
                    .find(|&c| self.species_map[c] == child_species);
                if let Some(branch) = self.branches.get_mut(&child_species) {
                    if let Some(c) = child {
                        branch.entering_of.insert(c, branch.entering.len());
                    }
                    branch.entering.push(Lineage {
                        parent: Some(g),
                        child,
                    });
                }
            }
        }
    }

    /// Returns the branch of a species vertex.
    pub fn branch(&self, species: VertexIndex) -> &Branch {
        &self.branches[&species]
    }

    /// Returns the locus of the lineage above gene vertex `g`: the locus of
    /// its parent, or of its entering lineage at the top of a branch.
    pub fn parent_locus(&self, g: VertexIndex, locus: &[usize], entering_loci: &[usize]) -> usize {
        let branch = self.branch(self.species_map[g]);
        match branch.entering_of.get(&g) {
            Some(&lineage) => entering_loci[lineage],
            None => self.gene_tree.parent(g).map_or(locus[g], |p| locus[p]),
        }
    }
}

// =#========================================================================#=
// SPECIES MAPS
// =#========================================================================#=
/// Returns `true` if all children of `g` map strictly below `g` into pairwise
/// distinct child subtrees of its species.
pub(crate) fn is_speciation(
    gene_tree: &Tree,
    species_tree: &Tree,
    species_map: &[VertexIndex],
    g: VertexIndex,
) -> bool {
    let vertex = gene_tree.vertex(g);
    if vertex.is_leaf() {
        return false;
    }
    let species = species_map[g];
    let mut seen = HashSet::new();
    vertex.children().iter().all(|&c| {
        species_tree
            .child_towards(species, species_map[c])
            .is_some_and(|towards| seen.insert(towards))
    })
}

/// Maps every gene leaf to its species leaf and every internal gene vertex
/// to the LCA of its children's species.
///
/// # Errors
/// [ReconError::InputInconsistency] if a gene leaf has no species, or its
/// species is not a leaf of the species tree.
pub fn lca_species_map(gene_tree: &Tree, species_tree: &Tree, gene2species: &Gene2Species) -> Result<Vec<VertexIndex>> {
    let depths = species_tree.depths();
    let mut species_map = vec![0; gene_tree.num_vertices()];
    for vertex in gene_tree.post_order_iter() {
        let g = vertex.index();
        if vertex.is_leaf() {
            let species_name = gene2species.species_of(vertex.name()).ok_or_else(|| {
                ReconError::input(format!("gene leaf {} is not covered by the species map", vertex.name()))
            })?;
            let species = species_tree
                .find(species_name)
                .filter(|&s| species_tree.vertex(s).is_leaf())
                .ok_or_else(|| {
                    ReconError::input(format!(
                        "gene leaf {} maps to {species_name}, which is not a species tree leaf",
                        vertex.name()
                    ))
                })?;
            species_map[g] = species;
        } else {
            let mut children = vertex.children().iter();
            let first = children.next().map_or(0, |&c| species_map[c]);
            species_map[g] = children.fold(first, |acc, &c| species_tree.lca(&depths, acc, species_map[c]));
        }
    }
    Ok(species_map)
}

/// Reconciles a gene tree by LCA and inserts implied speciation vertices.
///
/// For every gene edge `(p, c)`, a unary vertex is inserted for every species
/// strictly between the species of `c` and `p`, plus one in the species of
/// `p` if `p` is not a speciation and `c` maps lower. Original vertices keep
/// their indices; inserted vertices are appended.
///
/// # Returns
/// The augmented gene tree and its species map.
pub fn reconcile_lca(gene_tree: &Tree, species_tree: &Tree, gene2species: &Gene2Species) -> Result<(Tree, Vec<VertexIndex>)> {
    let species_map = lca_species_map(gene_tree, species_tree, gene2species)?;
    Ok(add_implied_speciations(gene_tree, species_tree, species_map))
}

/// Inserts implied speciation vertices into a gene tree with an
/// ancestry-monotone species map (see [reconcile_lca]).
pub(crate) fn add_implied_speciations(
    gene_tree: &Tree,
    species_tree: &Tree,
    mut species_map: Vec<VertexIndex>,
) -> (Tree, Vec<VertexIndex>) {
    let speciations: Vec<bool> = (0..gene_tree.num_vertices())
        .map(|g| is_speciation(gene_tree, species_tree, &species_map, g))
        .collect();
    let edges: Vec<(VertexIndex, VertexIndex)> = gene_tree
        .pre_order_iter()
        .filter_map(|v| v.parent().map(|p| (p, v.index())))
        .collect();

    let mut tree = gene_tree.clone();
    for (parent, child) in edges {
        let (sp, sc) = (species_map[parent], species_map[child]);
        if sp == sc {
            continue;
        }
        let mut path = Vec::new();
        let mut current = species_tree.parent(sc);
        while let Some(t) = current {
            if t == sp {
                break;
            }
            path.push(t);
            current = species_tree.parent(t);
        }
        if !speciations[parent] {
            path.push(sp);
        }

        let mut below = child;
        for species in path {
            let name = tree.unique_name(IMPLIED_PREFIX);
            below = tree.insert_above(below, Some(&name));
            species_map.push(species);
        }
    }

    (tree, species_map)
}
