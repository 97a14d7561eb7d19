mod common;

use std::sync::Arc;

use edge_placement::{
    dag::Graph,
    experiment::{Experiment, RefinementSchedule, StaticWorkload, Workload},
    placement_strategies::exhaustive::ExhaustiveBackend,
    placement_strategy::{backend_from_name, PlacementBackend},
    refinement::RankMetric,
    Error, Result,
};

use common::{chain, diamond, three_chain, two_devices};

fn workload() -> Workload {
    let graphs = vec![
        three_chain(),
        diamond(1, 6.0, 2, 0.5, 1.0),
        chain(2, 2.0, &[(0.5, 0.5, 1.0), (0.5, 0.5, 0.2)]),
        chain(3, 1.0, &[(8.0, 1.0, 1.0)]),
    ];
    Workload::new(two_devices(), graphs).unwrap()
}

fn experiment(trials: usize, refinement: Option<RefinementSchedule>) -> Experiment {
    Experiment::new(
        42,
        trials,
        vec!["DP_lat".parse().unwrap(), "EX_enabled".parse().unwrap(), "DP_min".parse().unwrap()],
        refinement,
        Arc::new(StaticWorkload::new(workload())),
        backend_from_name,
    )
}

#[test]
fn graphs_of_unknown_clients_are_rejected() {
    let tasks = three_chain().tasks().to_vec();
    let foreign = Graph::new(1, 0, tasks, vec![vec![1], vec![2], vec![]]).unwrap();
    assert!(matches!(
        Workload::new(two_devices(), vec![foreign]),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn trial_records_every_dag_for_every_algorithm() {
    let result = experiment(1, None).run_trial(0).unwrap();
    assert_eq!(result.seed, 42);
    assert_eq!(result.runs.len(), 3);
    assert_eq!(result.dag_count(), 4);
    for run in result.runs.iter() {
        assert_eq!(run.globals.len(), 4);
        assert!(run.decisions[0].is_some());
        // needs 8 cpus, more than any device has
        assert!(run.decisions[3].is_none());
        assert_eq!(run.globals[3], run.globals[2]);
        assert_eq!(run.accepted_refinements, 0);
    }
    assert_eq!(result.runs[0].algorithm.to_string(), "DP_lat");
}

#[test]
fn refinement_keeps_runs_consistent() {
    let schedule = RefinementSchedule {
        every: 2,
        gamma: 1.0,
        delta: 0.3,
        metric: RankMetric::F,
    };
    let result = experiment(1, Some(schedule)).run_trial(0).unwrap();
    for run in result.runs.iter() {
        assert_eq!(run.invariant_violations, 0);
        assert!(run.final_global().is_some());
    }
}

#[test]
fn trials_are_sorted_and_seeded() {
    let results = experiment(3, None).run(2).unwrap();
    assert_eq!(results.iter().map(|result| result.trial).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(results.iter().map(|result| result.seed).collect::<Vec<_>>(), vec![42, 43, 44]);
    // the workload does not depend on the seed
    assert_eq!(results[0].runs[0].decisions, results[2].runs[0].decisions);
}

#[test]
fn unknown_backend_fails_the_trial() {
    let experiment = Experiment::new(
        0,
        1,
        vec!["QP_lat".parse().unwrap()],
        None,
        Arc::new(StaticWorkload::new(workload())),
        backend_from_name,
    );
    assert!(matches!(experiment.run_trial(0), Err(Error::UnknownBackend(_))));
}

fn one_state_search(name: &str) -> Result<Box<dyn PlacementBackend>> {
    match name {
        "EX" => Ok(Box::new(ExhaustiveBackend::new(1))),
        _ => backend_from_name(name),
    }
}

#[test]
fn exceeded_search_budget_leaves_dag_unplaced() {
    let schedule = RefinementSchedule {
        every: 2,
        gamma: 1.0,
        delta: 0.3,
        metric: RankMetric::F,
    };
    let experiment = Experiment::new(
        0,
        1,
        vec!["DP_lat".parse().unwrap(), "EX_lat".parse().unwrap()],
        Some(schedule),
        Arc::new(StaticWorkload::new(workload())),
        one_state_search,
    );
    let result = experiment.run_trial(0).unwrap();
    assert!(result.runs[0].decisions[0].is_some());
    assert_eq!(result.runs[1].decisions, vec![None; 4]);
    assert_eq!(result.runs[1].invariant_violations, 0);
}
