//! Counters collected while a run executes.
//!
//! [`RunStats`] is attached to both successful outcomes and failures, so a
//! host can report how much work a run did either way.

use serde::{Deserialize, Serialize};

/// Aggregated counters for one optimization run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Nodes entered, including start and end.
    pub nodes_visited: usize,
    /// Action nodes whose proposal was applied.
    pub actions_applied: usize,
    /// Individual ingredient deltas applied.
    pub deltas_applied: usize,
    /// Action nodes whose strategy returned no applicable change.
    pub unresolved_actions: usize,
    /// Proposals rolled back after a delta was rejected.
    pub rollbacks: usize,
    /// Collected failure messages.
    pub failures: Vec<String>,
}

impl RunStats {
    pub fn record_visit(&mut self) {
        self.nodes_visited += 1;
    }

    /// Record an applied proposal made of `deltas` deltas.
    pub fn record_applied(&mut self, deltas: usize) {
        self.actions_applied += 1;
        self.deltas_applied += deltas;
    }

    pub fn record_unresolved(&mut self) {
        self.unresolved_actions += 1;
    }

    pub fn record_rollback(&mut self) {
        self.rollbacks += 1;
    }

    /// Record a failure message.
    pub fn record_failure(&mut self, error: String) {
        self.failures.push(error);
    }

    /// Check if there were any failures.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
