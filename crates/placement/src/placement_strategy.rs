//! Contract shared by all placement backends.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    dag::Graph,
    error::{Error, Result},
    ledger::DeviceLedger,
    objective::Objective,
    placement_strategies::{dp::DpBackend, exhaustive::ExhaustiveBackend},
    system::{DeviceId, SystemConfig},
};

/// How a backend trades latency against the number of devices it enables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourcePolicy {
    /// Minimum latency, no restriction on devices.
    #[serde(rename = "lat")]
    Latency,
    /// Prefer devices which are already enabled, extend the footprint only if needed.
    #[serde(rename = "enabled")]
    Enabled,
    /// Use as few devices as possible.
    #[serde(rename = "min")]
    MinDevices,
}

impl ResourcePolicy {
    pub const ALL: [ResourcePolicy; 3] = [ResourcePolicy::Latency, ResourcePolicy::Enabled, ResourcePolicy::MinDevices];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourcePolicy::Latency => "lat",
            ResourcePolicy::Enabled => "enabled",
            ResourcePolicy::MinDevices => "min",
        }
    }
}

impl fmt::Display for ResourcePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourcePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lat" => Ok(ResourcePolicy::Latency),
            "enabled" => Ok(ResourcePolicy::Enabled),
            "min" => Ok(ResourcePolicy::MinDevices),
            x => Err(Error::UnknownPolicy(x.to_string())),
        }
    }
}

/// Feasible placement of one DAG.
#[derive(Clone, Debug)]
pub struct PlacementSolution {
    /// Device of every node.
    pub devices: Vec<DeviceId>,
    /// Metrics at selectivity 1.
    pub objective: Objective,
    /// Input ledger with the DAG charged to its devices.
    pub ledger: DeviceLedger,
}

/// Trait for a placement backend.
pub trait PlacementBackend: Send + Sync {
    /// Short name used in reports, e.g. `DP`.
    fn name(&self) -> &str;

    /// Finds a placement of `graph` which fits into the free capacity of `ledger` and avoids
    /// `excluded` devices. Returns `Ok(None)` if no feasible placement exists.
    fn place(
        &self,
        graph: &Graph,
        ledger: &DeviceLedger,
        policy: ResourcePolicy,
        excluded: &BTreeSet<DeviceId>,
        config: &SystemConfig,
    ) -> Result<Option<PlacementSolution>>;
}

/// Resolves a backend by its report name.
pub fn backend_from_name(name: &str) -> Result<Box<dyn PlacementBackend>> {
    match name {
        "DP" => Ok(Box::new(DpBackend::new())),
        "EX" => Ok(Box::new(ExhaustiveBackend::default())),
        x => Err(Error::UnknownBackend(x.to_string())),
    }
}

/// An algorithm of an experiment: backend and policy, written `<BACKEND>_<policy>`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Algorithm {
    pub backend: String,
    pub policy: ResourcePolicy,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.backend, self.policy)
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (backend, policy) = s
            .split_once('_')
            .ok_or_else(|| Error::UnknownBackend(s.to_string()))?;
        Ok(Algorithm {
            backend: backend.to_string(),
            policy: policy.parse()?,
        })
    }
}

impl Serialize for Algorithm {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Algorithm {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
