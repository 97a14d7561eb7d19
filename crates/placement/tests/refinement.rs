mod common;

use std::collections::BTreeSet;

use edge_placement::{
    dag::Graph,
    ledger::{Deployment, Outcome},
    objective::find_sample_ratio,
    placement_strategies::dp::DpBackend,
    placement_strategy::ResourcePolicy,
    refinement::{optimize_by_objective, optimize_by_utilization, RankMetric},
    system::SystemConfig,
};

use common::{chain, diamond, system, three_chain};

fn commit(deployment: &mut Deployment, index: usize, placement: Vec<usize>, config: &SystemConfig) {
    let graph = deployment.graph(index);
    let selectivity = find_sample_ratio(graph, config, &placement);
    let objective = graph.calculate_objective_local(config, &placement, selectivity);
    deployment
        .graph_mut(index)
        .enforce_placement(placement, objective, selectivity);
    deployment.recompute(config);
}

fn twin_devices() -> SystemConfig {
    system(&[(4.0, 8.0), (4.0, 8.0)], 1.0, 10.0)
}

#[test]
fn passes_on_empty_deployment_are_no_ops() {
    let config = twin_devices();
    let deployment = Deployment::new(vec![three_chain()], &config);
    let backend = DpBackend::new();

    let outcome = optimize_by_objective(&deployment, &backend, ResourcePolicy::Latency, RankMetric::F, 1.0, &config);
    assert!(matches!(outcome, Ok(Outcome::Rejected)));
    let outcome = optimize_by_utilization(&deployment, &backend, ResourcePolicy::Latency, 0.3, &config);
    assert!(matches!(outcome, Ok(Outcome::Rejected)));
}

#[test]
fn objective_pass_consolidates_split_dag() {
    let config = twin_devices();
    let mut deployment = Deployment::new(vec![three_chain()], &config);
    commit(&mut deployment, 0, vec![0, 1, 0], &config);
    let before = deployment.calculate_objective_global(&config).unwrap();

    let outcome = optimize_by_objective(
        &deployment,
        &DpBackend::new(),
        ResourcePolicy::Latency,
        RankMetric::F,
        1.0,
        &config,
    )
    .unwrap();
    let Outcome::Accepted(next) = outcome else {
        panic!("objective pass should improve a split placement");
    };
    assert_eq!(next.graph(0).placement().unwrap().devices, vec![0, 0, 0]);
    let after = next.calculate_objective_global(&config).unwrap();
    assert!(after.f < before.f);
    assert_eq!(next.ledger().enabled_count(), 1);

    // the input deployment is unchanged
    assert_eq!(deployment.graph(0).placement().unwrap().devices, vec![0, 1, 0]);
}

#[test]
fn utilization_pass_evacuates_idle_device() {
    let config = twin_devices();
    let single = chain(1, 1.0, &[(1.0, 1.0, 1.0)]);
    let mut deployment = Deployment::new(vec![three_chain(), single], &config);
    commit(&mut deployment, 0, vec![0, 0, 0], &config);
    commit(&mut deployment, 1, vec![1], &config);
    let before = deployment.calculate_objective_global(&config).unwrap();

    // device 0 is 75% busy, device 1 only 25%
    let outcome = optimize_by_utilization(&deployment, &DpBackend::new(), ResourcePolicy::Latency, 0.5, &config).unwrap();
    let Outcome::Accepted(next) = outcome else {
        panic!("utilization pass should free device 1");
    };
    assert_eq!(next.graph(1).placement().unwrap().devices, vec![0]);
    assert!(!next.ledger().is_enabled(1));
    assert_eq!(next.ledger().device(0).free_cpu, 0.0);
    assert_eq!(next.placed_dags(), 2);
    assert!(next.calculate_objective_global(&config).unwrap().f < before.f);
}

#[test]
fn utilization_pass_without_idle_devices_is_rejected() {
    let config = twin_devices();
    let mut deployment = Deployment::new(vec![three_chain()], &config);
    commit(&mut deployment, 0, vec![0, 0, 0], &config);
    let outcome = optimize_by_utilization(&deployment, &DpBackend::new(), ResourcePolicy::Latency, 0.0, &config).unwrap();
    assert!(!outcome.is_accepted());
}

#[test]
fn refinement_never_worsens_deployment() {
    let config = system(&[(4.0, 8.0), (3.0, 6.0), (5.0, 4.0), (2.0, 8.0)], 1.5, 20.0);
    let graphs: Vec<Graph> = (0..6)
        .map(|id| {
            if id % 2 == 0 {
                diamond(id, 5.0 + id as f64, 2, 0.5, 1.0)
            } else {
                chain(id, 3.0 + id as f64, &[(0.5, 1.0, 1.0), (1.0, 0.5, 0.5), (0.5, 1.0, 0.7)])
            }
        })
        .collect();
    let backend = DpBackend::new();

    for policy in ResourcePolicy::ALL {
        let mut deployment = Deployment::new(graphs.clone(), &config);
        for index in 0..graphs.len() {
            deployment
                .place_graph(index, &backend, policy, &BTreeSet::new(), &config)
                .unwrap();
        }
        let before = deployment.calculate_objective_global(&config).unwrap();

        for metric in [RankMetric::F, RankMetric::RC, RankMetric::Latency] {
            let outcome = optimize_by_objective(&deployment, &backend, policy, metric, 1.0, &config).unwrap();
            if let Outcome::Accepted(next) = outcome {
                assert!(next.calculate_objective_global(&config).unwrap().f < before.f);
                assert!(next.placed_dags() >= deployment.placed_dags());
                assert!(next.ledger().check_capacity().is_ok());
            }
        }
        let outcome = optimize_by_utilization(&deployment, &backend, policy, 0.3, &config).unwrap();
        if let Outcome::Accepted(next) = outcome {
            assert!(next.calculate_objective_global(&config).unwrap().f < before.f);
            assert!(next.placed_dags() >= deployment.placed_dags());
        }
    }
}
