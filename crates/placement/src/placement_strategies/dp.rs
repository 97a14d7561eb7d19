//! Dynamic programming placement.
//!
//! Cost of a node is propagated from node `id - 1` only, which is exact for chains and an
//! approximation for DAGs with branching: other parent edges are only reflected in the
//! objective computed after the placement is found.

use std::collections::BTreeSet;

use log::debug;

use crate::{
    dag::Graph,
    error::Result,
    ledger::DeviceLedger,
    placement_strategy::{PlacementBackend, PlacementSolution, ResourcePolicy},
    system::{DeviceId, SystemConfig},
};

use super::common::{make_solution, usable_devices};

/// Minimum critical path placement over a `(node, device)` cost table.
#[derive(Clone, Debug, Default)]
pub struct DpBackend {}

impl DpBackend {
    pub fn new() -> Self {
        DpBackend {}
    }

    /// Runs the DP restricted to devices with `available[device]` set and not in `excluded`.
    pub fn solve(
        &self,
        graph: &Graph,
        ledger: &DeviceLedger,
        available: &[bool],
        excluded: &BTreeSet<DeviceId>,
        config: &SystemConfig,
    ) -> Option<PlacementSolution> {
        let usable = usable_devices(available, excluded);
        let devices = config.device_count();
        let nodes = graph.len();
        let source = graph.task(graph.source());

        let mut costs: Vec<Vec<Option<f64>>> = vec![vec![None; devices]; nodes];
        let mut origins: Vec<Vec<Option<DeviceId>>> = vec![vec![None; devices]; nodes];

        for device in 0..devices {
            if usable[device] && ledger.fits(device, source) {
                costs[0][device] = Some(
                    config.execution_time(source.cpu, device)
                        + config.client_transfer_time(source.input_rate, graph.client(), device),
                );
            }
        }

        for node in 1..nodes {
            let prev = graph.task(node - 1);
            let task = graph.task(node);
            for device in 0..devices {
                let best = (0..devices)
                    .filter_map(|from| {
                        costs[node - 1][from].map(|cost| (cost + config.transfer_time(prev.output_rate, from, device), from))
                    })
                    .fold(None, |best: Option<(f64, DeviceId)>, candidate| match best {
                        Some(best) if best.0 <= candidate.0 => Some(best),
                        _ => Some(candidate),
                    });
                let Some((cost, from)) = best else {
                    continue;
                };
                if usable[device] && chain_fits(graph, ledger, &origins, node, device, from) {
                    costs[node][device] = Some(cost + config.execution_time(task.cpu, device));
                    origins[node][device] = Some(from);
                }
            }
        }

        let sink = graph.sink();
        let sink_task = graph.task(sink);
        let (_, last) = costs[sink]
            .iter()
            .enumerate()
            .filter_map(|(device, cost)| {
                cost.map(|cost| {
                    (
                        cost + config.client_transfer_time(sink_task.output_rate, graph.client(), device),
                        device,
                    )
                })
            })
            .fold(None, |best: Option<(f64, DeviceId)>, candidate| match best {
                Some(best) if best.0 <= candidate.0 => Some(best),
                _ => Some(candidate),
            })?;

        let mut placement = vec![last; nodes];
        for node in (0..sink).rev() {
            placement[node] = origins[node + 1][placement[node + 1]]?;
        }

        Some(make_solution(graph, ledger, placement, config))
    }

    // Tries each used device for removal, keeps the removal with the lowest F and repeats
    // until no device can be dropped.
    fn shrink_footprint(
        &self,
        graph: &Graph,
        ledger: &DeviceLedger,
        excluded: &BTreeSet<DeviceId>,
        config: &SystemConfig,
        mut best: PlacementSolution,
    ) -> PlacementSolution {
        let mut used = best.devices.iter().copied().collect::<BTreeSet<_>>();
        let mut available = (0..config.device_count())
            .map(|device| used.contains(&device))
            .collect::<Vec<_>>();

        for _ in 1..used.len() {
            let mut round_best: Option<(f64, DeviceId)> = None;
            for &device in used.iter() {
                available[device] = false;
                if let Some(candidate) = self.solve(graph, ledger, &available, excluded, config) {
                    if round_best.map_or(true, |(f, _)| candidate.objective.f < f) {
                        round_best = Some((candidate.objective.f, device));
                    }
                    if candidate.objective.f < best.objective.f {
                        best = candidate;
                    }
                }
                available[device] = true;
            }
            let Some((_, device)) = round_best else {
                break;
            };
            debug!("graph {}: dropping device {} from footprint", graph.id(), device);
            used.remove(&device);
            available[device] = false;
        }
        best
    }
}

/// Whether `device` can host `node` together with every predecessor the origin chain already
/// put on it, given that `node - 1` runs on `from`.
fn chain_fits(
    graph: &Graph,
    ledger: &DeviceLedger,
    origins: &[Vec<Option<DeviceId>>],
    node: usize,
    device: DeviceId,
    from: DeviceId,
) -> bool {
    let state = ledger.device(device);
    let task = graph.task(node);
    let mut cpu = state.free_cpu - task.cpu;
    let mut ram = state.free_ram - task.ram;
    let mut current = Some(from);
    for prev in (0..node).rev() {
        let Some(host) = current else {
            break;
        };
        if host == device {
            cpu -= graph.task(prev).cpu;
            ram -= graph.task(prev).ram;
        }
        current = origins[prev][host];
    }
    cpu >= 0.0 && ram >= 0.0
}

impl PlacementBackend for DpBackend {
    fn name(&self) -> &str {
        "DP"
    }

    fn place(
        &self,
        graph: &Graph,
        ledger: &DeviceLedger,
        policy: ResourcePolicy,
        excluded: &BTreeSet<DeviceId>,
        config: &SystemConfig,
    ) -> Result<Option<PlacementSolution>> {
        let everything = vec![true; config.device_count()];
        let mut solution = if policy == ResourcePolicy::Enabled && ledger.enabled_count() > 0 {
            let enabled = ledger.devices().iter().map(|state| state.enabled).collect::<Vec<_>>();
            self.solve(graph, ledger, &enabled, excluded, config)
        } else {
            self.solve(graph, ledger, &everything, excluded, config)
        };

        if solution.is_none() && policy == ResourcePolicy::Enabled {
            debug!("graph {}: enabled devices are not enough, using all devices", graph.id());
            solution = self.solve(graph, ledger, &everything, excluded, config);
        }

        Ok(solution.map(|solution| {
            if policy == ResourcePolicy::MinDevices {
                self.shrink_footprint(graph, ledger, excluded, config, solution)
            } else {
                solution
            }
        }))
    }
}
