use std::{collections::BTreeSet, io::Write, time::Instant};

use env_logger::Builder;

use edge_placement::{
    experiment::WorkloadSource,
    ledger::{Deployment, Outcome},
    placement_strategies::dp::DpBackend,
    placement_strategy::ResourcePolicy,
    refinement::{optimize_by_objective, optimize_by_utilization, RankMetric},
};
use edge_workload::{
    config::{Bounds, GeneratorConfig},
    topology::Topology,
    workload::RandomWorkload,
};

fn main() -> edge_placement::Result<()> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let generator = GeneratorConfig {
        devices: 300,
        clients: 10,
        dags_per_client: 20,
        operators: Bounds::new(3, 6),
        topologies: vec![Topology::Replicated, Topology::Sequential],
        ..GeneratorConfig::default()
    };
    let workload = RandomWorkload::new(generator).generate(123)?;
    let config = &workload.config;
    let backend = DpBackend::new();

    for policy in [ResourcePolicy::Latency, ResourcePolicy::Enabled, ResourcePolicy::MinDevices] {
        let start_time = Instant::now();
        let mut deployment = Deployment::new(workload.graphs.clone(), config);
        let mut placed = 0;
        for index in 0..workload.graphs.len() {
            if deployment
                .place_graph(index, &backend, policy, &BTreeSet::new(), config)?
                .is_some()
            {
                placed += 1;
            }
        }
        let placement_time = start_time.elapsed();

        let start_time = Instant::now();
        let before = deployment.calculate_objective_global(config);
        for _ in 0..3 {
            if let Outcome::Accepted(next) =
                optimize_by_objective(&deployment, &backend, policy, RankMetric::F, 1.0, config)?
            {
                deployment = next;
            }
            if let Outcome::Accepted(next) =
                optimize_by_utilization(&deployment, &backend, policy, 0.3, config)?
            {
                deployment = next;
            }
        }

        println!(
            "{}: placed {}/{} dags in {:.2?}, refined in {:.2?}",
            policy,
            placed,
            workload.graphs.len(),
            placement_time,
            start_time.elapsed()
        );
        println!("  before: {:?}", before);
        println!("  after:  {:?}", deployment.calculate_objective_global(config));
    }
    Ok(())
}
