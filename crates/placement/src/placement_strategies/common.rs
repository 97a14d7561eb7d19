use std::collections::BTreeSet;

use crate::{
    dag::Graph,
    ledger::DeviceLedger,
    placement_strategy::PlacementSolution,
    system::{DeviceId, SystemConfig},
};

/// Mask of devices a backend may use: available and not excluded.
pub fn usable_devices(available: &[bool], excluded: &BTreeSet<DeviceId>) -> Vec<bool> {
    available
        .iter()
        .enumerate()
        .map(|(device, &available)| available && !excluded.contains(&device))
        .collect()
}

/// Wraps a complete placement into a solution evaluated at selectivity 1.
pub fn make_solution(
    graph: &Graph,
    ledger: &DeviceLedger,
    devices: Vec<DeviceId>,
    config: &SystemConfig,
) -> PlacementSolution {
    PlacementSolution {
        objective: graph.calculate_objective_local(config, &devices, 1.0),
        ledger: ledger.with_placement(graph, &devices),
        devices,
    }
}
