//! Model of a task DAG issued by a mobile client.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    objective::Objective,
    system::{round_to, ClientId, DeviceId, SystemConfig},
};

/// Kind of a streaming operator. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Filter,
    Scan,
    Map,
    GroupBy,
    OrderBy,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Filter,
        TaskKind::Scan,
        TaskKind::Map,
        TaskKind::GroupBy,
        TaskKind::OrderBy,
    ];
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One node of a DAG.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Position of the task in its DAG, also its id.
    pub id: usize,
    pub kind: TaskKind,
    pub cpu: f64,
    pub ram: f64,
    /// Fraction of input records emitted, in `(0, 1]`.
    pub selectivity: f64,
    pub input_rate: f64,
    /// `input_rate * selectivity`, rounded to 2 decimal places.
    pub output_rate: f64,
    pub parents: Vec<usize>,
}

impl Task {
    /// Creates new task, deriving its output rate.
    pub fn new(
        id: usize,
        kind: TaskKind,
        cpu: f64,
        ram: f64,
        selectivity: f64,
        input_rate: f64,
        parents: Vec<usize>,
    ) -> Self {
        Task {
            id,
            kind,
            cpu,
            ram,
            selectivity,
            input_rate,
            output_rate: round_to(input_rate * selectivity, 2),
            parents,
        }
    }
}

/// Placement committed to a graph together with its metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommittedPlacement {
    pub devices: Vec<DeviceId>,
    pub objective: Objective,
    pub selectivity: f64,
}

/// Kahn's algorithm over the child lists. Returns a node that never becomes ready.
fn first_blocked_by_cycle(children: &[Vec<usize>]) -> Option<usize> {
    let mut indegree = vec![0usize; children.len()];
    for &child in children.iter().flatten() {
        indegree[child] += 1;
    }
    let mut ready = (0..children.len()).filter(|&node| indegree[node] == 0).collect::<Vec<_>>();
    let mut done = vec![false; children.len()];
    while let Some(node) = ready.pop() {
        done[node] = true;
        for &child in children[node].iter() {
            indegree[child] -= 1;
            if indegree[child] == 0 {
                ready.push(child);
            }
        }
    }
    done.iter().position(|&done| !done)
}

/// One DAG instance. Node `0` is the source and node `len - 1` is the sink.
#[derive(Clone, Debug)]
pub struct Graph {
    client: ClientId,
    id: usize,
    children: Vec<Vec<usize>>,
    tasks: Vec<Task>,
    paths: Vec<Vec<usize>>,
    order: Vec<usize>,
    placement: Option<CommittedPlacement>,
}

impl Graph {
    /// Builds a graph from its tasks and child lists, enumerating all source to sink paths
    /// and deriving a topological order from them.
    pub fn new(client: ClientId, id: usize, tasks: Vec<Task>, children: Vec<Vec<usize>>) -> Result<Self> {
        let n = tasks.len();
        if n == 0 {
            return Err(Error::InvalidGraph(format!("graph {} has no tasks", id)));
        }
        if children.len() != n {
            return Err(Error::InvalidGraph(format!(
                "graph {} has {} tasks but {} adjacency lists",
                id,
                n,
                children.len()
            )));
        }
        for (node, task) in tasks.iter().enumerate() {
            if task.id != node {
                return Err(Error::InvalidGraph(format!("task at position {} has id {}", node, task.id)));
            }
            if !(task.selectivity > 0.0 && task.selectivity <= 1.0) {
                return Err(Error::InvalidGraph(format!(
                    "task {} has selectivity {}",
                    node, task.selectivity
                )));
            }
            for &child in children[node].iter() {
                if child >= n || child == node {
                    return Err(Error::InvalidGraph(format!("bad edge {} -> {}", node, child)));
                }
                if !tasks[child].parents.contains(&node) {
                    return Err(Error::InvalidGraph(format!(
                        "edge {} -> {} is missing from parents of {}",
                        node, child, child
                    )));
                }
            }
            for &parent in task.parents.iter() {
                if parent >= n || !children[parent].contains(&node) {
                    return Err(Error::InvalidGraph(format!(
                        "parent {} of task {} has no matching edge",
                        parent, node
                    )));
                }
            }
        }

        if let Some(node) = first_blocked_by_cycle(&children) {
            return Err(Error::InvalidGraph(format!(
                "graph {} has a cycle, task {} is on it or behind it",
                id, node
            )));
        }

        let mut graph = Graph {
            client,
            id,
            children,
            tasks,
            paths: Vec::new(),
            order: Vec::new(),
            placement: None,
        };
        graph.paths = graph.enumerate_paths();
        let mut covered = vec![false; n];
        for path in graph.paths.iter() {
            for &node in path.iter() {
                covered[node] = true;
            }
        }
        if let Some(node) = covered.iter().position(|&c| !c) {
            return Err(Error::InvalidGraph(format!(
                "task {} of graph {} is not on any source to sink path",
                node, id
            )));
        }
        graph.order = graph.topological_order();
        Ok(graph)
    }

    fn enumerate_paths(&self) -> Vec<Vec<usize>> {
        let mut paths = Vec::new();
        let mut visited = vec![false; self.len()];
        let mut path = Vec::new();
        self.collect_paths(self.source(), &mut visited, &mut path, &mut paths);
        paths
    }

    fn collect_paths(&self, u: usize, visited: &mut [bool], path: &mut Vec<usize>, paths: &mut Vec<Vec<usize>>) {
        visited[u] = true;
        path.push(u);
        if u == self.sink() {
            paths.push(path.clone());
        } else {
            for &v in self.children[u].iter() {
                if !visited[v] {
                    self.collect_paths(v, visited, path, paths);
                }
            }
        }
        path.pop();
        visited[u] = false;
    }

    // Starts at the source and covers every node. Parents precede children on chains; with
    // fan-out a node can land before one of its parents.
    fn topological_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.len());
        let mut visited = vec![false; self.len()];
        visited[self.source()] = true;
        for path in self.paths.iter() {
            for &node in path.iter().rev() {
                if !visited[node] {
                    visited[node] = true;
                    order.push(node);
                }
            }
        }
        order.push(self.source());
        order.reverse();
        order
    }

    /// Client which issued the DAG.
    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn source(&self) -> usize {
        0
    }

    pub fn sink(&self) -> usize {
        self.tasks.len() - 1
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, node: usize) -> &Task {
        &self.tasks[node]
    }

    pub fn children(&self, node: usize) -> &[usize] {
        &self.children[node]
    }

    /// All simple paths from source to sink.
    pub fn paths(&self) -> &[Vec<usize>] {
        &self.paths
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn placement(&self) -> Option<&CommittedPlacement> {
        self.placement.as_ref()
    }

    pub fn is_placed(&self) -> bool {
        self.placement.is_some()
    }

    /// Checks that `placement` maps every node to a device of `config`.
    pub fn check_placement(&self, placement: &[DeviceId], config: &SystemConfig) -> Result<()> {
        if placement.len() != self.len() {
            return Err(Error::InvalidPlacement(format!(
                "graph {} has {} nodes, placement has {}",
                self.id,
                self.len(),
                placement.len()
            )));
        }
        if let Some(&device) = placement.iter().find(|&&d| d >= config.device_count()) {
            return Err(Error::InvalidPlacement(format!("unknown device {}", device)));
        }
        Ok(())
    }

    /// Latency, F and RC of the DAG under `placement` with filter `selectivity`.
    ///
    /// `placement` must pass [Graph::check_placement], otherwise this panics on indexing.
    pub fn calculate_objective_local(&self, config: &SystemConfig, placement: &[DeviceId], selectivity: f64) -> Objective {
        debug_assert!(self.check_placement(placement, config).is_ok());
        let latency = self
            .paths
            .iter()
            .map(|path| self.path_latency(config, path, placement, selectivity))
            .fold(f64::MIN, f64::max);

        let mut enabled = placement.to_vec();
        enabled.sort_unstable();
        enabled.dedup();
        // `placement` is non-empty, so at least one device is enabled.
        let rc = config.resource_cost(enabled).unwrap_or_default();
        let f = config.composite(rc, latency, selectivity);

        Objective {
            latency: round_to(latency, 3),
            f: round_to(f, 3),
            rc: round_to(rc, 3),
        }
    }

    fn path_latency(&self, config: &SystemConfig, path: &[usize], placement: &[DeviceId], selectivity: f64) -> f64 {
        let mut latency = 0.0;
        for &node in path.iter() {
            let task = &self.tasks[node];
            let device = placement[node];
            latency += config.execution_time(task.cpu, device);
            for &parent in task.parents.iter().filter(|parent| path.contains(parent)) {
                latency += config.transfer_time(
                    self.tasks[parent].output_rate * selectivity,
                    placement[parent],
                    device,
                );
            }
            if node == self.source() {
                latency += config.client_transfer_time(task.input_rate * selectivity, self.client, device);
            }
            if node == self.sink() {
                latency += config.client_transfer_time(task.output_rate * selectivity, self.client, device);
            }
        }
        latency
    }

    /// Commits a placement and its metrics.
    pub fn enforce_placement(&mut self, devices: Vec<DeviceId>, objective: Objective, selectivity: f64) {
        self.placement = Some(CommittedPlacement {
            devices,
            objective,
            selectivity,
        });
    }

    /// Clears the committed placement. No-op on an unplaced graph.
    pub fn remove_placement(&mut self) {
        self.placement = None;
    }
}
