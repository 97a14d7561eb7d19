//! Random inputs for placement experiments: edge systems and task DAGs.

pub mod config;
pub mod random_system;
pub mod topology;
pub mod workload;
