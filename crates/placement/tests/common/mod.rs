#![allow(dead_code)]

use edge_placement::{
    dag::{Graph, Task, TaskKind},
    system::{DeviceConfig, LinkConfig, SystemConfig, Tunables},
};

/// System with one client where every link between distinct devices and every client link
/// has the same cost and bandwidth.
pub fn system(capacities: &[(f64, f64)], cost: f64, bandwidth: f64) -> SystemConfig {
    let n = capacities.len();
    let link = LinkConfig { cost, bandwidth };
    SystemConfig::new(
        capacities.iter().map(|&(cpu, ram)| DeviceConfig { cpu, ram }).collect(),
        (0..n)
            .map(|i| (0..n).map(|j| if i == j { LinkConfig::local() } else { link }).collect())
            .collect(),
        vec![vec![link; n]],
        Tunables::default(),
    )
    .unwrap()
}

/// Chain of tasks given as `(cpu, ram, selectivity)`, fed with `rate` by client 0.
pub fn chain(id: usize, rate: f64, specs: &[(f64, f64, f64)]) -> Graph {
    let mut tasks = Vec::new();
    let mut input_rate = rate;
    for (node, &(cpu, ram, selectivity)) in specs.iter().enumerate() {
        let parents = if node == 0 { vec![] } else { vec![node - 1] };
        let task = Task::new(node, TaskKind::Map, cpu, ram, selectivity, input_rate, parents);
        input_rate = task.output_rate;
        tasks.push(task);
    }
    let children = (0..specs.len())
        .map(|node| if node + 1 < specs.len() { vec![node + 1] } else { vec![] })
        .collect();
    Graph::new(0, id, tasks, children).unwrap()
}

/// Source, `width` parallel tasks and a sink, all with the same requirements.
pub fn diamond(id: usize, rate: f64, width: usize, cpu: f64, ram: f64) -> Graph {
    let sink = width + 1;
    let mut tasks = vec![Task::new(0, TaskKind::Scan, cpu, ram, 1.0, rate, vec![])];
    let mut children = vec![(1..=width).collect::<Vec<_>>()];
    for node in 1..=width {
        tasks.push(Task::new(node, TaskKind::Filter, cpu, ram, 0.5, tasks[0].output_rate, vec![0]));
        children.push(vec![sink]);
    }
    let sink_rate = (1..=width).map(|node| tasks[node].output_rate).sum::<f64>();
    tasks.push(Task::new(sink, TaskKind::GroupBy, cpu, ram, 1.0, sink_rate, (1..=width).collect()));
    children.push(vec![]);
    Graph::new(0, id, tasks, children).unwrap()
}

/// The three node chain used in several tests: source, a filter with selectivity 0.5 and a sink.
pub fn three_chain() -> Graph {
    chain(0, 10.0, &[(1.0, 1.0, 1.0), (1.0, 1.0, 0.5), (1.0, 1.0, 1.0)])
}

/// Two devices, `[cpu 4, ram 8]` and `[cpu 2, ram 4]`, links of cost 1 and bandwidth 10.
pub fn two_devices() -> SystemConfig {
    system(&[(4.0, 8.0), (2.0, 4.0)], 1.0, 10.0)
}
