//! Dlcrecon is a library to reconcile gene trees with species trees under
//! duplication, loss and deep coalescence (incomplete lineage sorting).
//!
//! A reconciliation explains a gene (coalescent) tree inside a species tree
//! by gene duplications, gene losses and extra lineages that fail to
//! coalesce within their species branch. Each event type has a cost, and
//! the engines look for a reconciliation of minimum total cost.
//! Core functionality provided:
//! - Exact engine: dynamic programming over the species tree, returning a
//!   most-parsimonious labeled reconciliation ([reconcile_exact]).
//! - Heuristic engine: seeded search over locus trees with prescreening,
//!   including consensus reduction of several coalescent trees
//!   ([reconcile_search]).
//! - Two reconciliation forms:
//!   - [LabeledRecon](model::LabeledRecon): species map, locus map and a
//!     temporal order on a single gene tree.
//!   - [Recon](model::Recon): locus tree plus reconciliations of the
//!     coalescent tree into the locus tree and of the locus tree into the
//!     species tree, with daughters marking new loci.
//!   - Conversion both ways ([labeledrecon_to_recon],
//!     [recon_to_labeledrecon]) and equality up to vertex naming
//!     ([reconciliations_equal]).
//! - Trees: arena-based rooted trees with unary and multifurcating
//!   vertices, parsed from and written to Newick ([crate::newick]).
//! - Persisted reconciliations as prefix-based file sets ([crate::io]).
//!
//! Logging goes through the [log] facade; install any logger to see it.
//!
//! # Usage patterns
//! 1. The quick functions below run with explicit configs; see
//!    [ExactConfig](recon::ExactConfig) and [SearchConfig](recon::SearchConfig)
//!    for all options and their defaults.
//! 2. The building blocks ([recon::reconcile_lca],
//!    [recon::propose_daughters], [consensus::majority_consensus], ...) are
//!    public for drivers that assemble their own pipeline.
//!
//! ## Example
//! ```
//! use dlcrecon::model::Gene2Species;
//! use dlcrecon::recon::ExactConfig;
//! use dlcrecon::{parse_newick_str, reconcile_exact};
//!
//! let species_tree = parse_newick_str("((A,B),C);")?;
//! let gene_tree = parse_newick_str("((a,c),b);")?;
//! let g2s = Gene2Species::from_smap("a\tA\nb\tB\nc\tC\n")?;
//!
//! // one extra lineage explains the discordance
//! let config = ExactConfig::default().with_implied(false);
//! let result = reconcile_exact(&gene_tree, &species_tree, &g2s, &config)?;
//! assert_eq!(result.counts.dups, 0);
//! assert_eq!(result.counts.coals(), 1);
//!
//! // without delayed coalescence, duplications and losses are needed
//! let strict = config.with_delay(false);
//! let result = reconcile_exact(&gene_tree, &species_tree, &g2s, &strict)?;
//! assert_eq!(result.counts.coals(), 0);
//! assert_eq!(result.cost, 4.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod consensus;
pub mod error;
pub mod io;
pub mod model;
pub mod newick;
pub mod parser;
pub mod recon;

pub use crate::recon::{
    labeledrecon_to_recon, recon_to_labeledrecon, reconcile_exact, reconcile_search, reconciliations_equal,
};

use crate::model::Tree;
use crate::parser::parsing_error::ParsingError;
use std::path::Path;

// ============================================================================
// Quick Newick API
// ============================================================================
/// Parse a Newick string using default settings, returning a [Tree].
///
/// See [`newick::parse_str`] for full documentation of this convenience function.
pub fn parse_newick_str<S: AsRef<str>>(newick: S) -> Result<Tree, ParsingError> {
    newick::parse_str(newick)
}

/// Parse a file containing a semicolon-separated list of Newick strings
/// using default settings, returning a vector of [Tree].
///
/// See [`newick::parse_file`] for full documentation of this convenience function.
pub fn parse_newick_file<P: AsRef<Path>>(path: P) -> Result<Vec<Tree>, ParsingError> {
    newick::parse_file(path)
}
