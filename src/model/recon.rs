//! Three-tree reconciliation: species tree, locus tree and coalescent tree.

use crate::error::{ReconError, Result};
use crate::model::tree::{Tree, VertexIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Event at a locus-tree vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LocusEvent {
    /// Locus lineage splits into the child species
    Speciation,
    /// A new locus is founded
    Duplication,
    /// Extant gene copy
    Leaf,
}

impl fmt::Display for LocusEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            LocusEvent::Speciation => "spec",
            LocusEvent::Duplication => "dup",
            LocusEvent::Leaf => "gene",
        };
        f.write_str(s)
    }
}

impl FromStr for LocusEvent {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spec" => Ok(LocusEvent::Speciation),
            "dup" => Ok(LocusEvent::Duplication),
            "gene" => Ok(LocusEvent::Leaf),
            other => Err(ReconError::format(format!("unknown locus event {other:?}"))),
        }
    }
}

// =#========================================================================#=
// RECON
// =#========================================================================#=
/// Reconciliation in three-tree form.
///
/// - `locus_recon` and `locus_events` are indexed by locus-tree vertex,
/// - `coal_recon` is indexed by coalescent-tree vertex,
/// - `daughters` holds, for every duplication vertex, the one child that
///   founds the new locus. Its lineages must have coalesced to a single one
///   at the duplication; the other children continue the parent locus.
///   A daughter is thus the founder, not the continuing lineage: the
///   continuing children are exactly the non-daughter children.
#[derive(Debug, Clone)]
pub struct Recon {
    pub locus_tree: Tree,
    pub locus_recon: Vec<VertexIndex>,
    pub locus_events: Vec<LocusEvent>,
    pub coal_recon: Vec<VertexIndex>,
    pub daughters: BTreeSet<VertexIndex>,
}

impl Recon {
    /// Groups the locus-tree vertices into loci.
    ///
    /// The root starts locus 0; every daughter starts a fresh locus, numbered
    /// in pre-order; all other vertices continue the locus of their parent.
    pub fn locus_groups(&self) -> Vec<usize> {
        let mut groups = vec![0; self.locus_tree.num_vertices()];
        let mut next = 1;
        for vertex in self.locus_tree.pre_order_iter() {
            if let Some(parent) = vertex.parent() {
                groups[vertex.index()] = if self.daughters.contains(&vertex.index()) {
                    next += 1;
                    next - 1
                } else {
                    groups[parent]
                };
            }
        }
        groups
    }

    /// Checks sizes and the daughter invariant against the coalescent tree.
    pub fn validate(&self, coal_tree: &Tree, species_tree: &Tree) -> Result<()> {
        let n = self.locus_tree.num_vertices();
        if self.locus_recon.len() != n || self.locus_events.len() != n {
            return Err(ReconError::input("locus recon does not cover the locus tree"));
        }
        if self.coal_recon.len() != coal_tree.num_vertices() {
            return Err(ReconError::input("coal recon does not cover the coalescent tree"));
        }
        if self.coal_recon.iter().any(|&x| x >= n)
            || self.locus_recon.iter().any(|&s| s >= species_tree.num_vertices())
        {
            return Err(ReconError::input("recon refers to unknown vertices"));
        }
        for vertex in self.locus_tree.pre_order_iter() {
            let num_daughters = vertex
                .children()
                .iter()
                .filter(|c| self.daughters.contains(c))
                .count();
            let expected = usize::from(self.locus_events[vertex.index()] == LocusEvent::Duplication);
            if num_daughters != expected {
                return Err(ReconError::input(format!(
                    "locus vertex {} ({}) has {} daughters",
                    vertex.name(),
                    self.locus_events[vertex.index()],
                    num_daughters
                )));
            }
        }
        Ok(())
    }
}
