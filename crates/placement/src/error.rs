//! Crate-wide error type.

use thiserror::Error;

use crate::system::DeviceId;

/// Errors produced while building inputs, solving or reporting.
///
/// An infeasible placement is not an error: solvers return `Ok(None)` for it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("invalid system config: {0}")]
    InvalidConfig(String),

    #[error("invalid placement: {0}")]
    InvalidPlacement(String),

    #[error("device {device} has negative free capacity (cpu {free_cpu}, ram {free_ram})")]
    CapacityInvariant {
        device: DeviceId,
        free_cpu: f64,
        free_ram: f64,
    },

    #[error("exhaustive search exceeded budget of {0} states")]
    SearchBudgetExceeded(u64),

    #[error("unknown placement backend {0}")]
    UnknownBackend(String),

    #[error("unknown resource policy {0}")]
    UnknownPolicy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
