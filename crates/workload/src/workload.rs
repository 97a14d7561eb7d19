use edge_placement::{
    experiment::{Workload, WorkloadSource},
    Result,
};
use log::debug;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::{
    config::GeneratorConfig,
    random_system::random_system,
    topology::{TaskProfiles, Topology},
};

/// Random system and DAGs, deterministic for a given seed.
pub struct RandomWorkload {
    config: GeneratorConfig,
}

impl RandomWorkload {
    pub fn new(config: GeneratorConfig) -> Self {
        RandomWorkload { config }
    }
}

impl WorkloadSource for RandomWorkload {
    fn generate(&self, seed: u64) -> Result<Workload> {
        let mut rng = Pcg64::seed_from_u64(seed);
        let system = random_system(&self.config, &mut rng)?;
        let profiles = TaskProfiles::random(&mut rng);

        let mut graphs = Vec::with_capacity(self.config.clients * self.config.dags_per_client);
        for client in 0..self.config.clients {
            for j in 0..self.config.dags_per_client {
                let id = j + client * self.config.dags_per_client;
                let input_rate = rng.gen_range(self.config.input_rate.min..=self.config.input_rate.max) as f64;
                let operators = rng.gen_range(self.config.operators.min..=self.config.operators.max);
                let topology = *self.config.topologies.choose(&mut rng).unwrap_or(&Topology::Sequential);
                debug!(
                    "dag {}: {:?} with {} operators, rate {}",
                    id, topology, operators, input_rate
                );
                graphs.push(topology.generate(client, id, operators, input_rate, &profiles, &mut rng)?);
            }
        }
        Workload::new(system, graphs)
    }
}
