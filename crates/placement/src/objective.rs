//! Objective functions of a single DAG and of a whole deployment.

use serde::{Deserialize, Serialize};

use crate::{
    dag::Graph,
    ledger::Deployment,
    system::{round_to, DeviceId, SystemConfig},
};

/// Metrics of one placed DAG, rounded to 3 decimal places.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// Critical path latency.
    pub latency: f64,
    /// Composite objective.
    pub f: f64,
    /// Resource cost.
    pub rc: f64,
}

/// Metrics of all placed DAGs of a deployment, rounded to 3 decimal places.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalObjective {
    pub f: f64,
    pub rc: f64,
    /// Sum of latencies of placed DAGs.
    pub latency: f64,
    /// Mean selectivity of placed DAGs.
    pub selectivity: f64,
}

/// Candidate filter selectivities, from 0.1 to 1.0.
pub fn selectivity_candidates() -> impl Iterator<Item = f64> {
    (1..=10).map(|i| i as f64 / 10.0)
}

/// Selectivity minimizing F for a fixed placement. Ties resolve to the smaller selectivity.
pub fn find_sample_ratio(graph: &Graph, config: &SystemConfig, placement: &[DeviceId]) -> f64 {
    let mut best: Option<(f64, f64)> = None;
    for selectivity in selectivity_candidates() {
        let objective = graph.calculate_objective_local(config, placement, selectivity);
        if best.map_or(true, |(f, _)| objective.f < f) {
            best = Some((objective.f, selectivity));
        }
    }
    best.map(|(_, selectivity)| selectivity).unwrap_or(1.0)
}

/// Global objective of a deployment, `None` if no DAG is placed.
///
/// Reads the aggregates of the last [Deployment::recompute].
pub fn calculate_objective_global(deployment: &Deployment, config: &SystemConfig) -> Option<GlobalObjective> {
    let totals = deployment.totals();
    if totals.placed_dags == 0 {
        return None;
    }
    let rc = config.resource_cost(deployment.ledger().enabled_devices())?;
    let selectivity = totals.sum_selectivity / totals.placed_dags as f64;
    let f = config.composite(rc, totals.sum_latency, selectivity);
    Some(GlobalObjective {
        f: round_to(f, 3),
        rc: round_to(rc, 3),
        latency: round_to(totals.sum_latency, 3),
        selectivity: round_to(selectivity, 3),
    })
}
