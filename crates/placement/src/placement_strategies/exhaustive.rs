//! Exact placement by depth-first branch-and-bound.
//!
//! Honors the same contract as [DpBackend](super::dp::DpBackend) but evaluates the true
//! critical path of every candidate, so it is exact on any topology. Devices are tried
//! fastest first and a branch is cut once its accumulated path latencies plus the cheapest
//! possible remainder cannot beat the incumbent. The search is still exponential in the
//! number of nodes and is bounded by a state budget.

use std::collections::BTreeSet;

use itertools::Itertools;
use log::debug;

use crate::{
    dag::Graph,
    error::{Error, Result},
    ledger::DeviceLedger,
    placement_strategy::{PlacementBackend, PlacementSolution, ResourcePolicy},
    system::{round_to, DeviceId, SystemConfig},
};

use super::common::{make_solution, usable_devices};

/// Exhaustive backend. Minimizes, depending on the policy:
/// * `lat`: latency;
/// * `enabled`: number of devices not yet enabled in the ledger, then latency;
/// * `min`: number of distinct devices, then latency.
#[derive(Clone, Debug)]
pub struct ExhaustiveBackend {
    max_states: u64,
}

impl ExhaustiveBackend {
    pub fn new(max_states: u64) -> Self {
        ExhaustiveBackend { max_states }
    }
}

impl Default for ExhaustiveBackend {
    fn default() -> Self {
        Self::new(5_000_000)
    }
}

struct Search<'a> {
    graph: &'a Graph,
    config: &'a SystemConfig,
    ledger: &'a DeviceLedger,
    policy: ResourcePolicy,
    // usable devices, fastest first
    order: Vec<DeviceId>,
    free: Vec<(f64, f64)>,
    uses: Vec<usize>,
    placement: Vec<DeviceId>,
    counted: usize,
    // on_path[p][node]
    on_path: Vec<Vec<bool>>,
    // execution plus client transfer time of a node on a device
    own: Vec<Vec<f64>>,
    // tail[p][k]: lower bound on the latency nodes `k..` add to path p
    tail: Vec<Vec<f64>>,
    // levels[k][p]: latency of path p accumulated by nodes `..k`
    levels: Vec<Vec<f64>>,
    states: u64,
    max_states: u64,
    best: Option<(usize, f64, Vec<DeviceId>)>,
}

impl<'a> Search<'a> {
    fn new(
        graph: &'a Graph,
        ledger: &'a DeviceLedger,
        policy: ResourcePolicy,
        excluded: &BTreeSet<DeviceId>,
        config: &'a SystemConfig,
        max_states: u64,
    ) -> Self {
        let usable = usable_devices(&vec![true; config.device_count()], excluded);
        let order = (0..config.device_count())
            .filter(|&device| usable[device])
            .sorted_by(|&a, &b| config.cpu(b).total_cmp(&config.cpu(a)).then(a.cmp(&b)))
            .collect::<Vec<_>>();

        let own = graph
            .tasks()
            .iter()
            .map(|task| {
                (0..config.device_count())
                    .map(|device| {
                        let mut time = config.execution_time(task.cpu, device);
                        if task.id == graph.source() {
                            time += config.client_transfer_time(task.input_rate, graph.client(), device);
                        }
                        if task.id == graph.sink() {
                            time += config.client_transfer_time(task.output_rate, graph.client(), device);
                        }
                        time
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let floor = own
            .iter()
            .map(|times| order.iter().map(|&device| times[device]).fold(f64::INFINITY, f64::min))
            .collect::<Vec<_>>();

        let n = graph.len();
        let on_path = graph
            .paths()
            .iter()
            .map(|path| {
                let mut on = vec![false; n];
                for &node in path.iter() {
                    on[node] = true;
                }
                on
            })
            .collect::<Vec<_>>();
        let tail = on_path
            .iter()
            .map(|on| {
                let mut tail = vec![0.0; n + 1];
                for node in (0..n).rev() {
                    tail[node] = tail[node + 1] + if on[node] { floor[node] } else { 0.0 };
                }
                tail
            })
            .collect::<Vec<_>>();

        Search {
            graph,
            config,
            ledger,
            policy,
            order,
            free: ledger
                .devices()
                .iter()
                .map(|state| (state.free_cpu, state.free_ram))
                .collect(),
            uses: vec![0; config.device_count()],
            placement: Vec::with_capacity(n),
            counted: 0,
            levels: vec![vec![0.0; on_path.len()]; n + 1],
            on_path,
            own,
            tail,
            states: 0,
            max_states,
            best: None,
        }
    }

    fn counts_towards_footprint(&self, device: DeviceId) -> bool {
        match self.policy {
            ResourcePolicy::Latency => false,
            ResourcePolicy::Enabled => !self.ledger.is_enabled(device),
            ResourcePolicy::MinDevices => true,
        }
    }

    /// Fills `levels[node + 1]` for `node` on `device` and returns a lower bound on the
    /// latency of any completion. Nodes `..node` must already be placed.
    fn extend_level(&mut self, node: usize, device: DeviceId) -> f64 {
        let graph = self.graph;
        let task = graph.task(node);
        let mut bound = f64::MIN;
        for p in 0..self.on_path.len() {
            let on = &self.on_path[p];
            let mut latency = self.levels[node][p];
            if on[node] {
                latency += self.own[node][device];
                for &parent in task.parents.iter().filter(|&&parent| parent < node && on[parent]) {
                    latency += self
                        .config
                        .transfer_time(graph.task(parent).output_rate, self.placement[parent], device);
                }
                for &child in graph.children(node).iter().filter(|&&child| child < node && on[child]) {
                    latency += self
                        .config
                        .transfer_time(task.output_rate, device, self.placement[child]);
                }
            }
            bound = bound.max(latency + self.tail[p][node + 1]);
            self.levels[node + 1][p] = latency;
        }
        bound
    }

    fn visit(&mut self, node: usize) -> Result<()> {
        self.states += 1;
        if self.states > self.max_states {
            return Err(Error::SearchBudgetExceeded(self.max_states));
        }

        if node == self.graph.len() {
            let latency = self
                .graph
                .calculate_objective_local(self.config, &self.placement, 1.0)
                .latency;
            let better = match &self.best {
                None => true,
                Some((counted, best_latency, _)) => (self.counted, latency) < (*counted, *best_latency),
            };
            if better {
                self.best = Some((self.counted, latency, self.placement.clone()));
            }
            return Ok(());
        }

        let task = self.graph.task(node);
        for i in 0..self.order.len() {
            let device = self.order[i];
            let (cpu, ram) = self.free[device];
            if cpu - task.cpu < 0.0 || ram - task.ram < 0.0 {
                continue;
            }
            let adds = self.uses[device] == 0 && self.counts_towards_footprint(device);
            let counted = self.counted + usize::from(adds);
            if matches!(&self.best, Some((best_counted, _, _)) if counted > *best_counted) {
                continue;
            }
            let bound = self.extend_level(node, device);
            // leaves only replace the incumbent on a strictly smaller rounded latency; the
            // slack covers the different summation order of the leaf evaluation
            if matches!(&self.best, Some((best_counted, best_latency, _))
                if counted == *best_counted && round_to(bound - 1e-9, 3) >= *best_latency)
            {
                continue;
            }

            self.free[device] = (cpu - task.cpu, ram - task.ram);
            self.uses[device] += 1;
            self.placement.push(device);
            let previous = std::mem::replace(&mut self.counted, counted);

            let result = self.visit(node + 1);

            self.counted = previous;
            self.placement.pop();
            self.uses[device] -= 1;
            self.free[device] = (cpu, ram);
            result?;
        }
        Ok(())
    }
}

impl PlacementBackend for ExhaustiveBackend {
    fn name(&self) -> &str {
        "EX"
    }

    fn place(
        &self,
        graph: &Graph,
        ledger: &DeviceLedger,
        policy: ResourcePolicy,
        excluded: &BTreeSet<DeviceId>,
        config: &SystemConfig,
    ) -> Result<Option<PlacementSolution>> {
        let mut search = Search::new(graph, ledger, policy, excluded, config, self.max_states);
        search.visit(0)?;
        debug!("graph {}: exhaustive search visited {} states", graph.id(), search.states);

        Ok(search
            .best
            .map(|(_, _, devices)| make_solution(graph, ledger, devices, config)))
    }
}
