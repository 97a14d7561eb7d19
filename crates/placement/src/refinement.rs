//! Cross-DAG refinement passes.
//!
//! Each pass works on a [Speculation] of the deployment: it unplaces some DAGs, solves them
//! again under a device restriction and keeps the result only if the global F improves.

use std::collections::BTreeSet;

use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    ledger::{Deployment, Outcome},
    placement_strategy::{PlacementBackend, ResourcePolicy},
    system::{DeviceId, SystemConfig},
};

/// Number of DAGs re-placed by [optimize_by_objective].
pub const TOP_DAGS: usize = 4;

/// Metric used to rank placed DAGs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankMetric {
    F,
    RC,
    #[serde(rename = "latency")]
    Latency,
}

/// Re-places the [TOP_DAGS] DAGs with the highest `metric`, avoiding idle devices whose CPU
/// capacity is below `gamma` times the average capacity of the devices those DAGs used.
pub fn optimize_by_objective(
    deployment: &Deployment,
    backend: &dyn PlacementBackend,
    policy: ResourcePolicy,
    metric: RankMetric,
    gamma: f64,
    config: &SystemConfig,
) -> Result<Outcome> {
    if deployment.placed_dags() == 0 {
        return Ok(Outcome::Rejected);
    }

    let dags = deployment
        .graphs()
        .iter()
        .enumerate()
        .filter_map(|(index, graph)| {
            let objective = graph.placement()?.objective;
            let value = match metric {
                RankMetric::F => objective.f,
                RankMetric::RC => objective.rc,
                RankMetric::Latency => objective.latency,
            };
            Some((index, value))
        })
        .sorted_by(|a, b| b.1.total_cmp(&a.1))
        .take(TOP_DAGS)
        .map(|(index, _)| index)
        .collect::<Vec<_>>();

    let used = dags
        .iter()
        .filter_map(|&index| deployment.graph(index).placement())
        .flat_map(|placement| placement.devices.iter().copied())
        .collect::<BTreeSet<_>>();
    let avg_cpu = used.iter().map(|&device| config.cpu(device)).sum::<f64>() / used.len() as f64;

    let mut speculation = deployment.speculate(config);
    let working = speculation.working_mut();
    for &index in dags.iter() {
        working.graph_mut(index).remove_placement();
    }
    working.recompute(config);

    let avoid = (0..config.device_count())
        .filter(|&device| !working.ledger().is_enabled(device) && config.cpu(device) < avg_cpu * gamma)
        .collect::<BTreeSet<_>>();
    debug!(
        "objective pass: re-placing dags {:?}, average cpu {:.3}, avoiding {:?}",
        dags, avg_cpu, avoid
    );
    replace_all(working, &dags, &avoid, backend, policy, config)?;

    let outcome = speculation.resolve(config)?;
    if outcome.is_accepted() {
        info!("objective pass ({:?}) improved global F", metric);
    }
    Ok(outcome)
}

/// Evacuates enabled devices whose CPU utilization is below `delta`: every DAG touching one of
/// them is re-placed without using those devices.
pub fn optimize_by_utilization(
    deployment: &Deployment,
    backend: &dyn PlacementBackend,
    policy: ResourcePolicy,
    delta: f64,
    config: &SystemConfig,
) -> Result<Outcome> {
    let ledger = deployment.ledger();
    let avoid = ledger
        .enabled_devices()
        .filter(|&device| {
            let capacity = config.cpu(device);
            (capacity - ledger.device(device).free_cpu) / capacity < delta
        })
        .collect::<BTreeSet<_>>();
    if avoid.is_empty() {
        return Ok(Outcome::Rejected);
    }

    let mut speculation = deployment.speculate(config);
    let working = speculation.working_mut();
    let mut dags = Vec::new();
    for &device in avoid.iter() {
        for index in 0..working.graphs().len() {
            let uses_device = working
                .graph(index)
                .placement()
                .is_some_and(|placement| placement.devices.contains(&device));
            if uses_device {
                working.graph_mut(index).remove_placement();
                dags.push(index);
            }
        }
    }
    working.recompute(config);
    debug!("utilization pass: evacuating {:?}, re-placing dags {:?}", avoid, dags);
    replace_all(working, &dags, &avoid, backend, policy, config)?;

    let outcome = speculation.resolve(config)?;
    if outcome.is_accepted() {
        info!("utilization pass improved global F");
    }
    Ok(outcome)
}

fn replace_all(
    working: &mut Deployment,
    dags: &[usize],
    avoid: &BTreeSet<DeviceId>,
    backend: &dyn PlacementBackend,
    policy: ResourcePolicy,
    config: &SystemConfig,
) -> Result<()> {
    for &index in dags.iter() {
        if working.place_graph(index, backend, policy, avoid, config)?.is_none() {
            working.place_graph(index, backend, policy, &BTreeSet::new(), config)?;
        }
    }
    Ok(())
}
