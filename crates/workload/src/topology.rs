//! DAG shapes used in experiments.

use std::collections::BTreeMap;

use edge_placement::{
    dag::{Graph, Task, TaskKind},
    system::{round_to, ClientId},
    Result,
};
use rand::{seq::SliceRandom, Rng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

/// Resource needs and selectivity shared by all tasks of one kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TaskProfile {
    pub cpu: f64,
    pub ram: f64,
    pub selectivity: f64,
}

/// Profiles of every [TaskKind] for one trial.
#[derive(Clone, Debug)]
pub struct TaskProfiles {
    profiles: BTreeMap<TaskKind, TaskProfile>,
}

impl TaskProfiles {
    /// Draws cpu from `[0.2, 1.1]`, ram from `{1, 2, 3}` and selectivity from `[0.4, 1.0]`.
    pub fn random(rng: &mut Pcg64) -> Self {
        TaskProfiles {
            profiles: TaskKind::ALL
                .into_iter()
                .map(|kind| {
                    (
                        kind,
                        TaskProfile {
                            cpu: round_to(rng.gen_range(0.2..=1.1), 2),
                            ram: rng.gen_range(1..=3) as f64,
                            selectivity: round_to(rng.gen_range(0.4..=1.0), 2),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn uniform(profile: TaskProfile) -> Self {
        TaskProfiles {
            profiles: TaskKind::ALL.into_iter().map(|kind| (kind, profile)).collect(),
        }
    }

    pub fn get(&self, kind: TaskKind) -> TaskProfile {
        self.profiles[&kind]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// Chain of `n + 2` nodes.
    Sequential,
    /// Source, `n` parallel nodes, sink.
    Diamond,
    /// Source, `2n` nodes, `n` nodes connected to each of the previous layer, sink.
    Replicated,
}

impl Topology {
    /// Parent lists of a DAG with `n` operators.
    pub fn parents(&self, n: usize) -> Vec<Vec<usize>> {
        match self {
            Topology::Sequential => (0..n + 2)
                .map(|node| if node == 0 { Vec::new() } else { vec![node - 1] })
                .collect(),
            Topology::Diamond => {
                let sink = n + 1;
                let mut parents = vec![Vec::new(); n + 2];
                for node in 1..=n {
                    parents[node].push(0);
                    parents[sink].push(node);
                }
                parents
            }
            Topology::Replicated => {
                let first = 1..=2 * n;
                let second = 2 * n + 1..=3 * n;
                let sink = 3 * n + 1;
                let mut parents = vec![Vec::new(); 3 * n + 2];
                for node in first.clone() {
                    parents[node].push(0);
                }
                for node in second.clone() {
                    parents[node].extend(first.clone());
                    parents[sink].push(node);
                }
                parents
            }
        }
    }

    /// Generates a DAG of this shape with random task kinds.
    pub fn generate(
        &self,
        client: ClientId,
        id: usize,
        operators: usize,
        input_rate: f64,
        profiles: &TaskProfiles,
        rng: &mut Pcg64,
    ) -> Result<Graph> {
        build_graph(client, id, self.parents(operators), input_rate, profiles, rng)
    }
}

/// Builds a graph from parent lists. The source receives `input_rate`, every other node the
/// sum of its parents' output rates.
pub fn build_graph(
    client: ClientId,
    id: usize,
    parents: Vec<Vec<usize>>,
    input_rate: f64,
    profiles: &TaskProfiles,
    rng: &mut Pcg64,
) -> Result<Graph> {
    let mut children = vec![Vec::new(); parents.len()];
    let mut tasks: Vec<Task> = Vec::with_capacity(parents.len());
    for (node, node_parents) in parents.into_iter().enumerate() {
        for &parent in node_parents.iter() {
            children[parent].push(node);
        }
        let kind = *TaskKind::ALL.choose(rng).unwrap_or(&TaskKind::Map);
        let profile = profiles.get(kind);
        let rate = if node == 0 {
            input_rate
        } else {
            round_to(node_parents.iter().map(|&parent| tasks[parent].output_rate).sum::<f64>(), 2)
        };
        tasks.push(Task::new(
            node,
            kind,
            profile.cpu,
            profile.ram,
            profile.selectivity,
            rate,
            node_parents,
        ));
    }
    Graph::new(client, id, tasks, children)
}
