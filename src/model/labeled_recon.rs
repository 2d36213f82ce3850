//! Labeled reconciliation: the compact single-tree reconciliation form.
//!
//! A [LabeledRecon] annotates one gene tree with
//! - a species map (gene vertex to species vertex),
//! - a locus map (gene vertex to locus identifier),
//! - a partial temporal order per species branch and parent locus.

use crate::error::{ReconError, Result};
use crate::model::tree::{Tree, VertexIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a locus (a distinct gene-duplication lineage).
pub type Locus = usize;

/// Key of a temporal order list: the species branch and the parent locus.
pub type OrderKey = (VertexIndex, Locus);

// =#========================================================================#=
// LABELED RECON
// =#========================================================================#=
/// Labeled coalescent tree reconciliation.
///
/// Both maps are indexed by gene-tree [VertexIndex]. The order maps a species
/// branch `s` and a locus `l` to the gene vertices whose events happen in `s`
/// on lineages of locus `l`, oldest first:
/// - *splits*: internal gene vertices of locus `l` in `s` that are not
///   speciations (their children stay in `s`),
/// - *duplication children*: gene vertices in `s` whose incoming edge
///   founds a new locus out of `l`.
///
/// A vertex can appear in two lists: as duplication child under its parent
/// locus and as split under its own locus.
///
/// # Invariants
/// - species map is ancestry-monotone
/// - the locus map changes only along duplication edges
/// - order lists only contain vertices of their species branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledRecon {
    /// Gene vertex to species vertex
    pub species_map: Vec<VertexIndex>,
    /// Gene vertex to locus
    pub locus_map: Vec<Locus>,
    /// Temporal order per (species, parent locus); empty lists are omitted
    pub order: BTreeMap<OrderKey, Vec<VertexIndex>>,
}

impl LabeledRecon {
    /// Creates a labeled recon from its parts.
    pub fn new(
        species_map: Vec<VertexIndex>,
        locus_map: Vec<Locus>,
        order: BTreeMap<OrderKey, Vec<VertexIndex>>,
    ) -> Self {
        Self {
            species_map,
            locus_map,
            order,
        }
    }

    /// Returns the species of a gene vertex.
    pub fn species_of(&self, gene: VertexIndex) -> VertexIndex {
        self.species_map[gene]
    }

    /// Returns the locus of a gene vertex.
    pub fn locus_of(&self, gene: VertexIndex) -> Locus {
        self.locus_map[gene]
    }

    /// Returns the order list of a species branch and locus (empty if none).
    pub fn order_of(&self, species: VertexIndex, locus: Locus) -> &[VertexIndex] {
        self.order
            .get(&(species, locus))
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the number of distinct loci.
    pub fn num_loci(&self) -> usize {
        let mut loci: Vec<_> = self.locus_map.clone();
        loci.sort_unstable();
        loci.dedup();
        loci.len()
    }

    /// Returns the gene vertices whose incoming edge is a duplication, in pre-order.
    pub fn duplications(&self, gene_tree: &Tree) -> Vec<VertexIndex> {
        gene_tree
            .pre_order_iter()
            .filter_map(|v| {
                let parent = v.parent()?;
                (self.locus_map[v.index()] != self.locus_map[parent]).then_some(v.index())
            })
            .collect()
    }

    /// Checks the structural invariants against the gene and species tree.
    ///
    /// # Errors
    /// [ReconError::InputInconsistency] naming the first violated invariant.
    pub fn validate(&self, gene_tree: &Tree, species_tree: &Tree) -> Result<()> {
        let n = gene_tree.num_vertices();
        if self.species_map.len() != n || self.locus_map.len() != n {
            return Err(ReconError::input(format!(
                "labeled recon covers {} / {} vertices, gene tree has {}",
                self.species_map.len(),
                self.locus_map.len(),
                n
            )));
        }
        for &species in &self.species_map {
            if species >= species_tree.num_vertices() {
                return Err(ReconError::input(format!("unknown species vertex {species}")));
            }
        }

        // Ancestry-monotone species map
        for vertex in gene_tree.pre_order_iter() {
            if let Some(parent) = vertex.parent() {
                let (sp, sc) = (self.species_map[parent], self.species_map[vertex.index()]);
                if !species_tree.is_ancestor(sp, sc) {
                    return Err(ReconError::input(format!(
                        "species map not ancestry-monotone at gene vertex {}: {} is not below {}",
                        vertex.name(),
                        species_tree.name(sc),
                        species_tree.name(sp)
                    )));
                }
            }
        }

        // Loci are connected: every locus has exactly one top vertex
        let mut tops: BTreeMap<Locus, VertexIndex> = BTreeMap::new();
        for vertex in gene_tree.pre_order_iter() {
            let locus = self.locus_map[vertex.index()];
            let is_top = vertex
                .parent()
                .is_none_or(|parent| self.locus_map[parent] != locus);
            if is_top && tops.insert(locus, vertex.index()).is_some() {
                return Err(ReconError::input(format!(
                    "locus {locus} is founded more than once (again at {})",
                    vertex.name()
                )));
            }
        }

        for (&(species, _), list) in &self.order {
            for &gene in list {
                if gene >= n || self.species_map[gene] != species {
                    return Err(ReconError::input(format!(
                        "order of species {} lists gene vertex {gene} from another species",
                        species_tree.name(species)
                    )));
                }
            }
        }

        Ok(())
    }
}
