//! Decisions and aggregates recorded while running a trial.

use serde::{Deserialize, Serialize};

use crate::{objective::GlobalObjective, placement_strategy::Algorithm};

/// Metrics of one committed DAG placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DagDecision {
    pub latency: f64,
    pub f: f64,
    pub rc: f64,
    pub selectivity: f64,
}

/// Everything one algorithm produced during a trial.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlgorithmRun {
    pub algorithm: Algorithm,
    /// Decision for every DAG in arrival order, `None` if it could not be placed.
    pub decisions: Vec<Option<DagDecision>>,
    /// Global objective after every DAG, `None` while nothing is placed.
    pub globals: Vec<Option<GlobalObjective>>,
    /// Number of refinement passes whose result was kept.
    pub accepted_refinements: usize,
    /// Number of refinement passes aborted by a negative capacity.
    pub invariant_violations: usize,
}

impl AlgorithmRun {
    pub fn new(algorithm: Algorithm) -> Self {
        AlgorithmRun {
            algorithm,
            decisions: Vec::new(),
            globals: Vec::new(),
            accepted_refinements: 0,
            invariant_violations: 0,
        }
    }

    /// Register the outcome of one DAG arrival.
    pub fn register(&mut self, decision: Option<DagDecision>, global: Option<GlobalObjective>) {
        self.decisions.push(decision);
        self.globals.push(global);
    }

    /// Number of DAGs which got a placement when they arrived.
    pub fn placed_count(&self) -> usize {
        self.decisions.iter().filter(|decision| decision.is_some()).count()
    }

    /// Global objective at the end of the trial.
    pub fn final_global(&self) -> Option<GlobalObjective> {
        self.globals.last().copied().flatten()
    }
}

/// Result of one trial of an experiment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial: usize,
    pub seed: u64,
    pub runs: Vec<AlgorithmRun>,
}

impl TrialResult {
    /// Number of DAGs in the trial.
    pub fn dag_count(&self) -> usize {
        self.runs.first().map_or(0, |run| run.decisions.len())
    }
}
