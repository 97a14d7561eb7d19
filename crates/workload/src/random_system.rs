//! Random edge systems.

use edge_placement::{
    system::{round_to, DeviceConfig, LinkConfig, SystemConfig},
    Result,
};
use rand::Rng;
use rand_pcg::Pcg64;

use crate::config::{Bounds, GeneratorConfig};

fn uniform(rng: &mut Pcg64, bounds: Bounds<f64>) -> f64 {
    rng.gen_range(bounds.min..=bounds.max)
}

fn random_link(rng: &mut Pcg64, config: &GeneratorConfig) -> LinkConfig {
    LinkConfig {
        cost: round_to(uniform(rng, config.link_cost), 2),
        bandwidth: round_to(uniform(rng, config.link_bandwidth), 2),
    }
}

/// Generates devices with random capacities, symmetric random links between distinct devices
/// and random links between every client and every device.
pub fn random_system(config: &GeneratorConfig, rng: &mut Pcg64) -> Result<SystemConfig> {
    let devices = (0..config.devices)
        .map(|_| DeviceConfig {
            cpu: uniform(rng, config.device_cpu).round(),
            ram: rng.gen_range(config.device_ram.min..=config.device_ram.max) as f64,
        })
        .collect::<Vec<_>>();

    let mut device_links = vec![vec![LinkConfig::local(); config.devices]; config.devices];
    for i in 0..config.devices {
        for j in i + 1..config.devices {
            let link = random_link(rng, config);
            device_links[i][j] = link;
            device_links[j][i] = link;
        }
    }

    let client_links = (0..config.clients)
        .map(|_| (0..config.devices).map(|_| random_link(rng, config)).collect())
        .collect();

    SystemConfig::new(devices, device_links, client_links, config.tunables.clone())
}
