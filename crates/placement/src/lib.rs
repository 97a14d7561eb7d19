//! Resource-constrained placement of streaming task DAGs onto heterogeneous edge devices.
//!
//! The core is the [DP backend](placement_strategies::dp::DpBackend), which places one DAG
//! against the free capacity kept in a [ledger](ledger::DeviceLedger), and the
//! [refinement] passes, which re-place DAGs of a whole [deployment](ledger::Deployment)
//! speculatively and keep the result only if the global objective improves.

pub mod dag;
pub mod error;
pub mod experiment;
pub mod ledger;
pub mod objective;
pub mod parser;
pub mod placement_strategies;
pub mod placement_strategy;
pub mod refinement;
pub mod report;
pub mod run_stats;
pub mod system;

pub use error::{Error, Result};
