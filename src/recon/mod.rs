//! Reconciliation engines and conversions.
//!
//! - [reconcile_exact]: most-parsimonious labeled reconciliation by dynamic
//!   programming over the species tree
//! - [reconcile_search]: heuristic search over locus trees
//! - [propose_daughters]: daughter choice for duplication vertices
//! - [labeledrecon_to_recon] / [recon_to_labeledrecon]: conversion between
//!   the labeled and the three-tree form
//! - [reconciliations_equal]: equality up to vertex naming
//!
//! Both engines first reconcile the gene tree by LCA ([reconcile_lca]) and
//! work on the gene tree augmented with implied speciation vertices.

/// Canonical forms and equality
pub mod canonical;
/// Engine configuration
pub mod config;
mod context;
/// Conversion between labeled and three-tree reconciliations
pub mod convert;
/// Costs and event counts
pub mod cost;
/// Daughter proposal
pub mod daughters;
mod evaluate;
/// Exact dynamic program
pub mod exact;
/// Heuristic search
pub mod search;

pub use canonical::{
    CanonicalLabeled, CanonicalRecon, OrderSegment, Reconciliation, canonical_labeled, canonical_names,
    canonical_newick, canonical_recon, reconciliations_equal, structural_hash,
};
pub use config::{DEFAULT_NPRESCREEN, DEFAULT_NSEARCH, ExactConfig, SearchConfig};
pub use context::{lca_species_map, reconcile_lca};
pub use convert::{labeledrecon_to_recon, recon_from_locus_tree, recon_to_labeledrecon};
pub use cost::{CostModel, EPSILON, EventCounts};
pub use daughters::{lineage_counts, propose_daughters};
pub use exact::{ExactResult, MAX_ENUMERATED_EDGES, reconcile_exact};
pub use search::{SearchResult, reconcile_search};
