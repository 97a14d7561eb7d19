use std::collections::BTreeSet;

use proptest::prelude::*;

use edge_placement::{
    dag::{Graph, Task, TaskKind},
    ledger::DeviceLedger,
    objective::{find_sample_ratio, selectivity_candidates},
    placement_strategies::{dp::DpBackend, exhaustive::ExhaustiveBackend},
    placement_strategy::{PlacementBackend, ResourcePolicy},
    system::{DeviceConfig, LinkConfig, SystemConfig, Tunables},
};

// Latencies are rounded to 3 decimal places, so exact optima may differ by one unit.
const ROUNDING: f64 = 1.5e-3;

// Task `i > 0` always has `i - 1` as a parent, extra edges only point forward.
fn graph_strategy(max_tasks: usize) -> impl Strategy<Value = Graph> {
    (1..=max_tasks).prop_flat_map(|n| {
        (
            proptest::collection::vec((0.1..1.0f64, 1..=10u32), n),
            proptest::collection::vec((any::<usize>(), any::<usize>()), 0..n * 2),
            1.0..10.0f64,
        )
            .prop_map(move |(specs, extra, rate)| {
                let mut parents = (0..n)
                    .map(|node| if node == 0 { BTreeSet::new() } else { BTreeSet::from([node - 1]) })
                    .collect::<Vec<_>>();
                for (a, b) in extra {
                    let (from, to) = (a % n, b % n);
                    if from < to {
                        parents[to].insert(from);
                    }
                }
                build_graph(&specs, &parents, rate)
            })
    })
}

fn chain_strategy(max_tasks: usize) -> impl Strategy<Value = Graph> {
    (proptest::collection::vec((0.1..1.0f64, 1..=10u32), 1..=max_tasks), 1.0..10.0f64).prop_map(|(specs, rate)| {
        let parents = (0..specs.len())
            .map(|node| if node == 0 { BTreeSet::new() } else { BTreeSet::from([node - 1]) })
            .collect::<Vec<_>>();
        build_graph(&specs, &parents, rate)
    })
}

fn build_graph(specs: &[(f64, u32)], parents: &[BTreeSet<usize>], rate: f64) -> Graph {
    let n = specs.len();
    let mut tasks: Vec<Task> = Vec::with_capacity(n);
    let mut children = vec![Vec::new(); n];
    for (node, &(cpu, tenths)) in specs.iter().enumerate() {
        let input_rate = if node == 0 {
            rate
        } else {
            parents[node].iter().map(|&parent| tasks[parent].output_rate).sum::<f64>()
        };
        for &parent in parents[node].iter() {
            children[parent].push(node);
        }
        tasks.push(Task::new(
            node,
            TaskKind::Map,
            cpu,
            1.0,
            tenths as f64 / 10.0,
            input_rate,
            parents[node].iter().copied().collect(),
        ));
    }
    Graph::new(0, 0, tasks, children).unwrap()
}

// Capacities are large enough for any generated graph to fit on a single device.
fn system_strategy() -> impl Strategy<Value = SystemConfig> {
    (2..=3usize).prop_flat_map(|k| {
        (
            proptest::collection::vec(5.0..10.0f64, k),
            proptest::collection::vec((0.1..5.0f64, 10.0..100.0f64), k * k),
            proptest::collection::vec((0.1..5.0f64, 10.0..100.0f64), k),
        )
            .prop_map(move |(cpus, links, clients)| {
                let link = |(cost, bandwidth): (f64, f64)| LinkConfig { cost, bandwidth };
                let device_links = (0..k)
                    .map(|i| {
                        (0..k)
                            .map(|j| {
                                if i == j {
                                    LinkConfig::local()
                                } else {
                                    link(links[i.min(j) * k + i.max(j)])
                                }
                            })
                            .collect()
                    })
                    .collect();
                SystemConfig::new(
                    cpus.into_iter().map(|cpu| DeviceConfig { cpu, ram: 100.0 }).collect(),
                    device_links,
                    vec![clients.into_iter().map(link).collect()],
                    Tunables::default(),
                )
                .unwrap()
            })
    })
}

fn latency(
    backend: &dyn PlacementBackend,
    graph: &Graph,
    config: &SystemConfig,
    excluded: &BTreeSet<usize>,
) -> Option<f64> {
    backend
        .place(graph, &DeviceLedger::new(config), ResourcePolicy::Latency, excluded, config)
        .unwrap()
        .map(|solution| solution.objective.latency)
}

proptest! {
    #[test]
    fn paths_cover_graph(graph in graph_strategy(8)) {
        let mut covered = BTreeSet::new();
        for path in graph.paths() {
            prop_assert_eq!(path.first(), Some(&graph.source()));
            prop_assert_eq!(path.last(), Some(&graph.sink()));
            covered.extend(path.iter().copied());
        }
        prop_assert_eq!(covered.len(), graph.len());

        let order = graph.order();
        prop_assert_eq!(order[0], graph.source());
        prop_assert_eq!(order.iter().collect::<BTreeSet<_>>().len(), graph.len());
    }

    #[test]
    fn chain_order_puts_parents_first(graph in chain_strategy(8)) {
        let position = |node: usize| graph.order().iter().position(|&x| x == node);
        for task in graph.tasks() {
            for &parent in task.parents.iter() {
                prop_assert!(position(parent) < position(task.id));
            }
        }
    }

    #[test]
    fn dp_is_optimal_on_chains(graph in chain_strategy(5), config in system_strategy()) {
        let none = BTreeSet::new();
        let dp = latency(&DpBackend::new(), &graph, &config, &none).unwrap();
        let ex = latency(&ExhaustiveBackend::default(), &graph, &config, &none).unwrap();
        prop_assert!((dp - ex).abs() <= ROUNDING, "dp {} exhaustive {}", dp, ex);
    }

    #[test]
    fn excluding_devices_never_helps(graph in chain_strategy(5), config in system_strategy(), device in 0..3usize) {
        let device = device % config.device_count();
        let backend = DpBackend::new();
        let full = latency(&backend, &graph, &config, &BTreeSet::new()).unwrap();
        let restricted = latency(&backend, &graph, &config, &BTreeSet::from([device])).unwrap();
        prop_assert!(restricted + ROUNDING >= full, "full {} restricted {}", full, restricted);
    }

    #[test]
    fn sample_ratio_minimizes_f(graph in graph_strategy(6), config in system_strategy(), seed in any::<u64>()) {
        let placement = (0..graph.len())
            .map(|node| (seed as usize).wrapping_add(node * 7) % config.device_count())
            .collect::<Vec<_>>();
        let best = find_sample_ratio(&graph, &config, &placement);
        prop_assert!(selectivity_candidates().any(|s| s == best));
        let best_f = graph.calculate_objective_local(&config, &placement, best).f;
        for selectivity in selectivity_candidates() {
            prop_assert!(best_f <= graph.calculate_objective_local(&config, &placement, selectivity).f);
        }
    }
}
