use std::{collections::BTreeSet, io::Write};

use env_logger::Builder;
use log::info;

use edge_placement::{
    dag::{Graph, Task, TaskKind},
    ledger::Deployment,
    placement_strategies::{dp::DpBackend, exhaustive::ExhaustiveBackend},
    placement_strategy::{PlacementBackend, ResourcePolicy},
    refinement::{optimize_by_objective, RankMetric},
    system::{DeviceConfig, LinkConfig, SystemConfig, Tunables},
};

fn chain(client: usize, id: usize, rate: f64) -> edge_placement::Result<Graph> {
    let specs = [
        (TaskKind::Scan, 0.5, 1.0, 0.9),
        (TaskKind::Filter, 1.0, 1.0, 0.5),
        (TaskKind::Map, 0.4, 2.0, 1.0),
        (TaskKind::GroupBy, 0.8, 1.0, 0.7),
    ];
    let mut tasks: Vec<Task> = Vec::new();
    let mut input_rate = rate;
    for (node, &(kind, cpu, ram, selectivity)) in specs.iter().enumerate() {
        let parents = if node == 0 { Vec::new() } else { vec![node - 1] };
        let task = Task::new(node, kind, cpu, ram, selectivity, input_rate, parents);
        input_rate = task.output_rate;
        tasks.push(task);
    }
    let children = (0..specs.len())
        .map(|node| if node + 1 < specs.len() { vec![node + 1] } else { Vec::new() })
        .collect();
    Graph::new(client, id, tasks, children)
}

fn main() -> edge_placement::Result<()> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let capacities = [(8.0, 16.0), (4.0, 8.0), (2.0, 4.0), (6.0, 8.0)];
    let devices = capacities
        .iter()
        .map(|&(cpu, ram)| DeviceConfig { cpu, ram })
        .collect::<Vec<_>>();
    let n = devices.len();
    let device_links = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        LinkConfig::local()
                    } else {
                        LinkConfig {
                            cost: 1.0 + (i + j) as f64,
                            bandwidth: 50.0,
                        }
                    }
                })
                .collect()
        })
        .collect();
    let client_links = vec![(0..n)
        .map(|device| LinkConfig {
            cost: 2.0 + device as f64,
            bandwidth: 20.0,
        })
        .collect()];
    let config = SystemConfig::new(devices, device_links, client_links, Tunables::default())?;

    let graphs = (0..4).map(|id| chain(0, id, 5.0 + id as f64)).collect::<Result<Vec<_>, _>>()?;
    let backends: [Box<dyn PlacementBackend>; 2] = [Box::new(DpBackend::new()), Box::new(ExhaustiveBackend::default())];

    for backend in backends.iter() {
        for policy in ResourcePolicy::ALL {
            let mut deployment = Deployment::new(graphs.clone(), &config);
            for index in 0..graphs.len() {
                match deployment.place_graph(index, backend.as_ref(), policy, &BTreeSet::new(), &config)? {
                    Some(decision) => info!(
                        "{}_{}: dag {} on {:?}: {:?}",
                        backend.name(),
                        policy,
                        index,
                        deployment.graph(index).placement().map(|p| &p.devices),
                        decision
                    ),
                    None => info!("{}_{}: dag {} infeasible", backend.name(), policy, index),
                }
            }
            let refined = optimize_by_objective(&deployment, backend.as_ref(), policy, RankMetric::F, 1.0, &config)?;
            println!(
                "{}_{}: global {:?}, refinement accepted: {}",
                backend.name(),
                policy,
                deployment.calculate_objective_global(&config),
                refined.is_accepted()
            );
        }
    }

    println!("\nLedger after DP_lat:");
    let mut deployment = Deployment::new(graphs, &config);
    for index in 0..4 {
        deployment.place_graph(index, &DpBackend::new(), ResourcePolicy::Latency, &BTreeSet::new(), &config)?;
    }
    println!("{}", serde_yaml::to_string(deployment.ledger())?);
    Ok(())
}
