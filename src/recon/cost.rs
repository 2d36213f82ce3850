//! Event costs and event counts.

use crate::error::{ReconError, Result};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Float comparison tolerance for total costs
pub const EPSILON: f64 = 1e-7;

// =#========================================================================#=
// COST MODEL
// =#========================================================================#=
/// Cost of each event type.
///
/// `coal_dup_cost` prices extra lineages at duplications; if `None` it
/// equals `coal_cost`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub dup_cost: f64,
    pub loss_cost: f64,
    pub coal_cost: f64,
    pub coal_dup_cost: Option<f64>,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

impl CostModel {
    /// Creates a cost model; extra lineages at duplications cost `coal_cost`.
    pub fn new(dup_cost: f64, loss_cost: f64, coal_cost: f64) -> Self {
        Self {
            dup_cost,
            loss_cost,
            coal_cost,
            coal_dup_cost: None,
        }
    }

    /// Sets a separate cost for extra lineages at duplications.
    pub fn with_coal_dup_cost(mut self, coal_dup_cost: f64) -> Self {
        self.coal_dup_cost = Some(coal_dup_cost);
        self
    }

    /// Returns the cost of an extra lineage at a duplication.
    pub fn coal_dup_cost(&self) -> f64 {
        self.coal_dup_cost.unwrap_or(self.coal_cost)
    }

    /// Checks that all costs are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let costs = [self.dup_cost, self.loss_cost, self.coal_cost, self.coal_dup_cost()];
        if costs.iter().all(|c| c.is_finite() && *c >= 0.0) {
            Ok(())
        } else {
            Err(ReconError::UnsupportedConfiguration(format!(
                "costs must be finite and non-negative: {self:?}"
            )))
        }
    }
}

// =#========================================================================#=
// EVENT COUNTS
// =#========================================================================#=
/// Number of events implied by a reconciliation.
///
/// Deep coalescence is split into extra lineages at the top of species
/// branches (`coal_spec`) and extra lineages at duplications (`coal_dup`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventCounts {
    pub dups: usize,
    pub losses: usize,
    pub coal_spec: usize,
    pub coal_dup: usize,
}

impl EventCounts {
    /// Returns the total number of extra lineages (deep coalescences).
    pub fn coals(&self) -> usize {
        self.coal_spec + self.coal_dup
    }

    /// Returns the weighted cost under a cost model.
    pub fn cost(&self, costs: &CostModel) -> f64 {
        self.dups as f64 * costs.dup_cost
            + self.losses as f64 * costs.loss_cost
            + self.coal_spec as f64 * costs.coal_cost
            + self.coal_dup as f64 * costs.coal_dup_cost()
    }

    /// Returns `true` if `self` is strictly preferable to `other`:
    /// lower cost, then fewer duplications, then fewer losses.
    pub fn is_better_than(&self, other: &EventCounts, costs: &CostModel) -> bool {
        let (a, b) = (self.cost(costs), other.cost(costs));
        if a < b - EPSILON {
            return true;
        }
        if a > b + EPSILON {
            return false;
        }
        (self.dups, self.losses) < (other.dups, other.losses)
    }
}

impl Add for EventCounts {
    type Output = EventCounts;

    fn add(self, rhs: EventCounts) -> EventCounts {
        EventCounts {
            dups: self.dups + rhs.dups,
            losses: self.losses + rhs.losses,
            coal_spec: self.coal_spec + rhs.coal_spec,
            coal_dup: self.coal_dup + rhs.coal_dup,
        }
    }
}

impl AddAssign for EventCounts {
    fn add_assign(&mut self, rhs: EventCounts) {
        *self = *self + rhs;
    }
}
