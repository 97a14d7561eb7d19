//! Parameters of workload generation.

use std::path::Path;

use edge_placement::{system::Tunables, Result};
use serde::{Deserialize, Serialize};

use crate::topology::Topology;

/// Inclusive range of values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T> Bounds<T> {
    pub const fn new(min: T, max: T) -> Self {
        Bounds { min, max }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub devices: usize,
    pub clients: usize,
    pub dags_per_client: usize,
    /// Device CPU capacity, drawn uniformly and rounded to an integer.
    pub device_cpu: Bounds<f64>,
    /// Device RAM capacity, integer.
    pub device_ram: Bounds<u32>,
    pub link_cost: Bounds<f64>,
    pub link_bandwidth: Bounds<f64>,
    /// Number of operators between source and sink (per layer for replicated DAGs).
    pub operators: Bounds<usize>,
    /// Rate of records sent by a client.
    pub input_rate: Bounds<u32>,
    pub topologies: Vec<Topology>,
    pub tunables: Tunables,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            devices: 50,
            clients: 2,
            dags_per_client: 10,
            device_cpu: Bounds::new(2.0, 10.0),
            device_ram: Bounds::new(4, 32),
            link_cost: Bounds::new(0.1, 10.0),
            link_bandwidth: Bounds::new(10.0, 100.0),
            operators: Bounds::new(1, 3),
            input_rate: Bounds::new(1, 10),
            topologies: vec![Topology::Sequential, Topology::Diamond, Topology::Replicated],
            tunables: Tunables::default(),
        }
    }
}

impl GeneratorConfig {
    /// Read [GeneratorConfig] from YAML file. Missing fields take default values.
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self> {
        Ok(serde_yaml::from_str(&std::fs::read_to_string(file)?)?)
    }
}
