//! Engine configuration.

use crate::recon::cost::CostModel;
use crate::recon::evaluate::Policy;
use serde::{Deserialize, Serialize};

/// Default iteration budget of the heuristic search
pub const DEFAULT_NSEARCH: usize = 1000;
/// Default number of prescreened proposals per search iteration
pub const DEFAULT_NPRESCREEN: usize = 20;

// =#========================================================================#=
// EXACT CONFIG
// =#========================================================================#=
/// Configuration of the exact engine ([reconcile_exact](crate::reconcile_exact)).
///
/// # Example
/// ```
/// use dlcrecon::recon::{CostModel, ExactConfig};
///
/// let config = ExactConfig::default()
///     .with_costs(CostModel::new(2.0, 1.0, 1.0))
///     .with_delay(false)
///     .with_max_dups(Some(4));
/// assert!(!config.delay);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactConfig {
    pub costs: CostModel,
    /// Count lineages that die at implied speciation vertices as extra lineages
    pub implied: bool,
    /// Allow extra lineages at the top of species branches
    pub delay: bool,
    /// Maximum number of loci present in one species branch
    pub max_loci: Option<usize>,
    /// Maximum number of duplications in one species branch
    pub max_dups: Option<usize>,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            costs: CostModel::default(),
            implied: true,
            delay: true,
            max_loci: None,
            max_dups: None,
        }
    }
}

impl ExactConfig {
    pub fn with_costs(mut self, costs: CostModel) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_implied(mut self, implied: bool) -> Self {
        self.implied = implied;
        self
    }

    pub fn with_delay(mut self, delay: bool) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_loci(mut self, max_loci: Option<usize>) -> Self {
        self.max_loci = max_loci;
        self
    }

    pub fn with_max_dups(mut self, max_dups: Option<usize>) -> Self {
        self.max_dups = max_dups;
        self
    }

    pub(crate) fn policy(&self) -> Policy {
        Policy {
            implied: self.implied,
            delay: self.delay,
            distinct_leaves: true,
            schedule: true,
        }
    }
}

// =#========================================================================#=
// SEARCH CONFIG
// =#========================================================================#=
/// Configuration of the heuristic engine ([reconcile_search](crate::reconcile_search)).
///
/// The seed fully determines the proposal sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub costs: CostModel,
    /// Count lineages that die at implied speciation vertices as extra lineages
    pub implied: bool,
    /// Allow extra lineages at the top of species branches
    pub delay: bool,
    /// Iteration budget
    pub nsearch: usize,
    /// Proposals prescreened per iteration
    pub nprescreen: usize,
    /// Stop after this many consecutive iterations without improvement
    pub nconverge: Option<usize>,
    /// Seed of the proposal generator
    pub seed: u64,
    /// Reduce several coalescent trees to a consensus instead of rejecting them
    pub consensus: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            costs: CostModel::default(),
            implied: true,
            delay: true,
            nsearch: DEFAULT_NSEARCH,
            nprescreen: DEFAULT_NPRESCREEN,
            nconverge: None,
            seed: 0,
            consensus: false,
        }
    }
}

impl SearchConfig {
    pub fn with_costs(mut self, costs: CostModel) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_implied(mut self, implied: bool) -> Self {
        self.implied = implied;
        self
    }

    pub fn with_delay(mut self, delay: bool) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_nsearch(mut self, nsearch: usize) -> Self {
        self.nsearch = nsearch;
        self
    }

    pub fn with_nprescreen(mut self, nprescreen: usize) -> Self {
        self.nprescreen = nprescreen;
        self
    }

    pub fn with_nconverge(mut self, nconverge: Option<usize>) -> Self {
        self.nconverge = nconverge;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_consensus(mut self, consensus: bool) -> Self {
        self.consensus = consensus;
        self
    }

    pub(crate) fn policy(&self) -> Policy {
        Policy {
            implied: self.implied,
            delay: self.delay,
            distinct_leaves: true,
            schedule: true,
        }
    }
}
