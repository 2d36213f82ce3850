//! Error types for reconciliation.
//!
//! [ReconError] covers every fatal outcome of the engines, the converters and
//! the persisted recon formats. Parsing of tree strings keeps its own
//! [ParsingError], which converts into [ReconError].

use crate::parser::ParsingError;
use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconError>;

/// Errors raised while reconciling, converting, or reading reconciliations.
///
/// All variants abort the reconciliation of a whole gene family; no partial
/// reconciliation is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum ReconError {
    /// Inputs do not fit together, e.g. a gene leaf without species or a
    /// species map that is not ancestry-monotone.
    #[error("Input inconsistency: {0}")]
    InputInconsistency(String),

    /// No labeling satisfies the cost model under the given policy.
    #[error("No feasible reconciliation: {0}")]
    Infeasible(String),

    /// The requested combination of inputs and options is not supported.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// A species branch holds more gene edges than the exact engine enumerates.
    #[error("Search space too large: species {species} holds {edges} gene edges (set max_dups)")]
    SearchSpaceTooLarge { species: String, edges: usize },

    /// Malformed persisted reconciliation.
    #[error("Invalid recon format: {0}")]
    Format(String),

    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReconError {
    pub(crate) fn input(msg: impl Into<String>) -> Self {
        ReconError::InputInconsistency(msg.into())
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        ReconError::Format(msg.into())
    }
}
