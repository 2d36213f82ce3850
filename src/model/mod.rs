//! Tree and reconciliation models.
//!
//! - [Tree] / [Vertex]: arena-based rooted trees for species, genes and loci
//! - [Gene2Species]: gene leaf name to species leaf name
//! - [LabeledRecon]: labeled coalescent tree reconciliation
//! - [Recon]: three-tree reconciliation (locus tree plus two maps)

/// Gene-to-species name mapping
pub mod gene_to_species;
/// Labeled (single-tree) reconciliation
pub mod labeled_recon;
/// Three-tree reconciliation
pub mod recon;
/// Rooted tree structure and operations
pub mod tree;
/// Tree vertex and branch length
pub mod vertex;

pub use gene_to_species::Gene2Species;
pub use labeled_recon::{LabeledRecon, Locus, OrderKey};
pub use recon::{LocusEvent, Recon};
pub use tree::{Tree, VertexIndex};
pub use vertex::{BranchLength, Vertex};
