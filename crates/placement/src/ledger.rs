//! Per-device bookkeeping shared by all DAGs of a deployment.

use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    dag::{Graph, Task},
    error::{Error, Result},
    objective::{calculate_objective_global, find_sample_ratio, GlobalObjective},
    placement_strategy::{PlacementBackend, ResourcePolicy},
    run_stats::DagDecision,
    system::{round_to, DeviceId, SystemConfig},
};

/// State of a single device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Whether any placed task runs on the device.
    pub enabled: bool,
    pub free_cpu: f64,
    pub free_ram: f64,
    /// Number of placed tasks on the device.
    pub tasks: usize,
}

/// Free capacity and enabled state of every device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceLedger {
    devices: Vec<DeviceState>,
}

impl DeviceLedger {
    /// Ledger with every device disabled and fully free.
    pub fn new(config: &SystemConfig) -> Self {
        DeviceLedger {
            devices: config
                .devices
                .iter()
                .map(|device| DeviceState {
                    enabled: false,
                    free_cpu: device.cpu,
                    free_ram: device.ram,
                    tasks: 0,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device(&self, device: DeviceId) -> &DeviceState {
        &self.devices[device]
    }

    pub fn devices(&self) -> &[DeviceState] {
        &self.devices
    }

    pub fn is_enabled(&self, device: DeviceId) -> bool {
        self.devices[device].enabled
    }

    pub fn enabled_devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.devices
            .iter()
            .enumerate()
            .filter(|(_, state)| state.enabled)
            .map(|(id, _)| id)
    }

    pub fn enabled_count(&self) -> usize {
        self.devices.iter().filter(|state| state.enabled).count()
    }

    /// Whether `task` alone fits into the free capacity of `device`.
    pub fn fits(&self, device: DeviceId, task: &Task) -> bool {
        let state = &self.devices[device];
        task.cpu <= state.free_cpu && task.ram <= state.free_ram
    }

    /// Charges `task` to `device`.
    pub fn assign(&mut self, device: DeviceId, task: &Task) {
        let state = &mut self.devices[device];
        state.enabled = true;
        state.free_cpu = round_to(state.free_cpu - task.cpu, 2);
        state.free_ram = round_to(state.free_ram - task.ram, 2);
        state.tasks += 1;
    }

    /// Copy of the ledger with every node of `graph` charged to its device in `placement`.
    pub fn with_placement(&self, graph: &Graph, placement: &[DeviceId]) -> Self {
        let mut ledger = self.clone();
        for (task, &device) in graph.tasks().iter().zip(placement) {
            ledger.assign(device, task);
        }
        ledger
    }

    /// Fails if some device has negative free capacity.
    pub fn check_capacity(&self) -> Result<()> {
        match self
            .devices
            .iter()
            .enumerate()
            .find(|(_, state)| state.free_cpu < 0.0 || state.free_ram < 0.0)
        {
            Some((device, state)) => Err(Error::CapacityInvariant {
                device,
                free_cpu: state.free_cpu,
                free_ram: state.free_ram,
            }),
            None => Ok(()),
        }
    }
}

/// Running aggregates over placed DAGs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub sum_latency: f64,
    pub sum_selectivity: f64,
    pub placed_dags: usize,
}

/// All graphs of one experiment instance together with the device ledger.
///
/// Cloning a deployment produces an independent snapshot.
#[derive(Clone, Debug)]
pub struct Deployment {
    graphs: Vec<Graph>,
    ledger: DeviceLedger,
    totals: Totals,
}

impl Deployment {
    pub fn new(graphs: Vec<Graph>, config: &SystemConfig) -> Self {
        let mut deployment = Deployment {
            graphs,
            ledger: DeviceLedger::new(config),
            totals: Totals::default(),
        };
        deployment.recompute(config);
        deployment
    }

    pub fn graphs(&self) -> &[Graph] {
        &self.graphs
    }

    pub fn graph(&self, index: usize) -> &Graph {
        &self.graphs[index]
    }

    /// Mutable access to a graph. Call [Deployment::recompute] after changing its placement.
    pub fn graph_mut(&mut self, index: usize) -> &mut Graph {
        &mut self.graphs[index]
    }

    pub fn ledger(&self) -> &DeviceLedger {
        &self.ledger
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn placed_dags(&self) -> usize {
        self.totals.placed_dags
    }

    /// Rebuilds the ledger and the aggregates by replaying every placed graph.
    pub fn recompute(&mut self, config: &SystemConfig) {
        self.ledger = DeviceLedger::new(config);
        self.totals = Totals::default();
        for graph in self.graphs.iter() {
            let Some(placement) = graph.placement() else {
                continue;
            };
            for (task, &device) in graph.tasks().iter().zip(placement.devices.iter()) {
                self.ledger.assign(device, task);
            }
            self.totals.sum_latency += placement.objective.latency;
            self.totals.sum_selectivity += placement.selectivity;
            self.totals.placed_dags += 1;
        }
    }

    pub fn calculate_objective_global(&self, config: &SystemConfig) -> Option<GlobalObjective> {
        calculate_objective_global(self, config)
    }

    /// Solves placement of graph `index` with `backend` and commits it on success.
    ///
    /// A graph that is already placed is unplaced first. On success the filter selectivity is
    /// chosen with [find_sample_ratio] and the ledger is rebuilt. Returns `None` if no feasible
    /// placement exists; the graph then stays unplaced.
    pub fn place_graph(
        &mut self,
        index: usize,
        backend: &dyn PlacementBackend,
        policy: ResourcePolicy,
        excluded: &BTreeSet<DeviceId>,
        config: &SystemConfig,
    ) -> Result<Option<DagDecision>> {
        if self.graphs[index].is_placed() {
            self.graphs[index].remove_placement();
            self.recompute(config);
        }

        let graph = &self.graphs[index];
        let Some(solution) = backend.place(graph, &self.ledger, policy, excluded, config)? else {
            debug!(
                "{}_{}: no feasible placement for graph {}",
                backend.name(),
                policy,
                graph.id()
            );
            return Ok(None);
        };
        graph.check_placement(&solution.devices, config)?;

        let selectivity = find_sample_ratio(graph, config, &solution.devices);
        let objective = graph.calculate_objective_local(config, &solution.devices, selectivity);
        debug!(
            "{}_{}: graph {} placed on {:?}, selectivity {}, latency {}, F {}",
            backend.name(),
            policy,
            graph.id(),
            solution.devices,
            selectivity,
            objective.latency,
            objective.f
        );

        self.ledger = solution.ledger;
        self.graphs[index].enforce_placement(solution.devices, objective, selectivity);
        self.recompute(config);
        self.ledger.check_capacity()?;

        Ok(Some(DagDecision {
            latency: objective.latency,
            f: objective.f,
            rc: objective.rc,
            selectivity,
        }))
    }

    /// Starts a speculative change on a copy of this deployment.
    pub fn speculate(&self, config: &SystemConfig) -> Speculation<'_> {
        Speculation {
            base: self,
            baseline: self.calculate_objective_global(config),
            working: self.clone(),
        }
    }
}

/// Result of resolving a [Speculation].
#[derive(Debug)]
pub enum Outcome {
    /// The working copy improved the deployment and should replace it.
    Accepted(Deployment),
    /// The working copy was discarded.
    Rejected,
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }
}

/// A working copy of a deployment which is either accepted as a whole or dropped.
pub struct Speculation<'a> {
    base: &'a Deployment,
    baseline: Option<GlobalObjective>,
    working: Deployment,
}

impl<'a> Speculation<'a> {
    pub fn base(&self) -> &Deployment {
        self.base
    }

    /// Global objective of the base deployment.
    pub fn baseline(&self) -> Option<GlobalObjective> {
        self.baseline
    }

    pub fn working(&self) -> &Deployment {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut Deployment {
        &mut self.working
    }

    /// Accepts the working copy only if its global F is strictly lower and no DAG lost its placement.
    ///
    /// Fails if the rebuilt ledger has a device with negative free capacity.
    pub fn resolve(mut self, config: &SystemConfig) -> Result<Outcome> {
        self.working.recompute(config);
        self.working.ledger.check_capacity()?;

        let (Some(before), Some(after)) = (self.baseline, self.working.calculate_objective_global(config)) else {
            return Ok(Outcome::Rejected);
        };
        if after.f < before.f && self.working.placed_dags() >= self.base.placed_dags() {
            debug!("speculation accepted: F {} -> {}", before.f, after.f);
            Ok(Outcome::Accepted(self.working))
        } else {
            debug!("speculation rejected: F {} -> {}", before.f, after.f);
            Ok(Outcome::Rejected)
        }
    }
}
