//! Tools for loading system configs and DAGs from YAML files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    dag::{Graph, Task, TaskKind},
    error::{Error, Result},
    system::{ClientId, SystemConfig},
};

/// Struct representing a [Task]. Children are derived from parents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct YamlTask {
    pub kind: TaskKind,
    pub cpu: f64,
    pub ram: f64,
    pub selectivity: f64,
    /// Required for the source. For other tasks defaults to the sum of parent output rates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<usize>,
}

/// YAML representation of a [Graph].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct YamlGraph {
    pub client: ClientId,
    pub id: usize,
    pub tasks: Vec<YamlTask>,
}

/// File with a list of DAGs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct YamlGraphs {
    pub graphs: Vec<YamlGraph>,
}

impl YamlGraph {
    /// Converts into a [Graph], resolving input rates in id order.
    pub fn into_graph(self) -> Result<Graph> {
        let n = self.tasks.len();
        let mut children = vec![Vec::new(); n];
        let mut tasks: Vec<Task> = Vec::with_capacity(n);
        for (node, task) in self.tasks.into_iter().enumerate() {
            for &parent in task.parents.iter() {
                if parent >= node {
                    return Err(Error::InvalidGraph(format!(
                        "task {} of graph {} has parent {}, parents must precede their children",
                        node, self.id, parent
                    )));
                }
                children[parent].push(node);
            }
            let input_rate = match task.input_rate {
                Some(rate) => rate,
                None if node == 0 => {
                    return Err(Error::InvalidGraph(format!("source of graph {} has no input rate", self.id)))
                }
                None => task.parents.iter().map(|&parent| tasks[parent].output_rate).sum::<f64>(),
            };
            tasks.push(Task::new(
                node,
                task.kind,
                task.cpu,
                task.ram,
                task.selectivity,
                input_rate,
                task.parents,
            ));
        }
        Graph::new(self.client, self.id, tasks, children)
    }
}

fn read_yaml<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(file: P) -> Result<T> {
    Ok(serde_yaml::from_str(&std::fs::read_to_string(file)?)?)
}

impl Graph {
    /// Read [Graph] from YAML file.
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self> {
        read_yaml::<YamlGraph, _>(file)?.into_graph()
    }
}

/// Read a list of graphs from YAML file.
pub fn graphs_from_yaml<P: AsRef<Path>>(file: P) -> Result<Vec<Graph>> {
    read_yaml::<YamlGraphs, _>(file)?
        .graphs
        .into_iter()
        .map(YamlGraph::into_graph)
        .collect()
}

impl SystemConfig {
    /// Read [SystemConfig] from YAML file and validate it.
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self> {
        let config: SystemConfig = read_yaml(file)?;
        config.validate()?;
        Ok(config)
    }
}
