//! Description of the edge system: devices, links and objective tunables.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Index of an edge device.
pub type DeviceId = usize;

/// Index of a mobile client issuing DAGs.
pub type ClientId = usize;

/// Capacities of a single edge device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub cpu: f64,
    pub ram: f64,
}

/// Communication parameters of a link. Transfer time of `rate` units is `rate * cost / bandwidth`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub cost: f64,
    pub bandwidth: f64,
}

impl LinkConfig {
    /// Link between a device and itself.
    pub fn local() -> Self {
        LinkConfig {
            cost: 0.0,
            bandwidth: 1.0,
        }
    }

    pub fn transfer_time(&self, rate: f64) -> f64 {
        rate * self.cost / self.bandwidth
    }
}

/// Fixed exponents and offsets of the RC and F formulas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tunables {
    /// Exponent applied to the number of enabled devices in RC.
    pub rc_theta: f64,
    /// Offset added to selectivity in the F denominator.
    pub filter_alpha: f64,
    /// Exponent of the F denominator.
    pub filter_beta: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Tunables {
            rc_theta: 1.5,
            filter_alpha: 0.5,
            filter_beta: 0.5,
        }
    }
}

/// Read-only configuration of one experiment trial.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemConfig {
    pub devices: Vec<DeviceConfig>,
    /// Symmetric `devices x devices` matrix.
    pub device_links: Vec<Vec<LinkConfig>>,
    /// `clients x devices` matrix.
    pub client_links: Vec<Vec<LinkConfig>>,
    #[serde(default)]
    pub tunables: Tunables,
}

impl SystemConfig {
    /// Creates a config and checks its consistency.
    pub fn new(
        devices: Vec<DeviceConfig>,
        device_links: Vec<Vec<LinkConfig>>,
        client_links: Vec<Vec<LinkConfig>>,
        tunables: Tunables,
    ) -> Result<Self> {
        let config = SystemConfig {
            devices,
            device_links,
            client_links,
            tunables,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks matrix shapes, symmetry and positivity of capacities and bandwidths.
    pub fn validate(&self) -> Result<()> {
        let n = self.devices.len();
        if n == 0 {
            return Err(Error::InvalidConfig("no devices".to_string()));
        }
        for (id, device) in self.devices.iter().enumerate() {
            if !(device.cpu > 0.0) || device.ram < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "device {} has cpu {} and ram {}",
                    id, device.cpu, device.ram
                )));
            }
        }
        if self.device_links.len() != n || self.device_links.iter().any(|row| row.len() != n) {
            return Err(Error::InvalidConfig(format!(
                "device link matrix must be {}x{}",
                n, n
            )));
        }
        for i in 0..n {
            for j in 0..n {
                let link = &self.device_links[i][j];
                if !(link.bandwidth > 0.0) || link.cost < 0.0 {
                    return Err(Error::InvalidConfig(format!("bad link between devices {} and {}", i, j)));
                }
                if link != &self.device_links[j][i] {
                    return Err(Error::InvalidConfig(format!(
                        "link between devices {} and {} is not symmetric",
                        i, j
                    )));
                }
            }
        }
        for (client, row) in self.client_links.iter().enumerate() {
            if row.len() != n {
                return Err(Error::InvalidConfig(format!(
                    "client {} has {} links, expected {}",
                    client,
                    row.len(),
                    n
                )));
            }
            if row.iter().any(|link| !(link.bandwidth > 0.0) || link.cost < 0.0) {
                return Err(Error::InvalidConfig(format!("bad link of client {}", client)));
            }
        }
        Ok(())
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn client_count(&self) -> usize {
        self.client_links.len()
    }

    pub fn cpu(&self, device: DeviceId) -> f64 {
        self.devices[device].cpu
    }

    pub fn ram(&self, device: DeviceId) -> f64 {
        self.devices[device].ram
    }

    /// Execution time of a task needing `cpu_req` on `device`.
    pub fn execution_time(&self, cpu_req: f64, device: DeviceId) -> f64 {
        cpu_req / self.devices[device].cpu
    }

    /// Time to move `rate` units from device `from` to device `to`.
    pub fn transfer_time(&self, rate: f64, from: DeviceId, to: DeviceId) -> f64 {
        self.device_links[to][from].transfer_time(rate)
    }

    /// Time to move `rate` units between `client` and `device`, in either direction.
    pub fn client_transfer_time(&self, rate: f64, client: ClientId, device: DeviceId) -> f64 {
        self.client_links[client][device].transfer_time(rate)
    }

    /// RC of a set of enabled devices: `count^theta * average cpu capacity`.
    pub fn resource_cost<I: IntoIterator<Item = DeviceId>>(&self, enabled: I) -> Option<f64> {
        let (count, cpu) = enabled
            .into_iter()
            .fold((0usize, 0.0), |(count, cpu), device| (count + 1, cpu + self.cpu(device)));
        if count == 0 {
            return None;
        }
        Some((count as f64).powf(self.tunables.rc_theta) * (cpu / count as f64))
    }

    /// Composite objective `F = RC * latency / (alpha + selectivity)^beta`.
    pub fn composite(&self, rc: f64, latency: f64, selectivity: f64) -> f64 {
        rc * latency / (self.tunables.filter_alpha + selectivity).powf(self.tunables.filter_beta)
    }
}

/// Rounds to `digits` decimal places.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}
