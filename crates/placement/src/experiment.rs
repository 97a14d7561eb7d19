//! Experiment driver: feeds DAGs one by one to several algorithms and records the outcome.

use std::{
    collections::BTreeSet,
    io::Write,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::{Duration, Instant},
};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use threadpool::ThreadPool;

use crate::{
    dag::Graph,
    error::{Error, Result},
    ledger::{Deployment, Outcome},
    placement_strategy::{Algorithm, PlacementBackend},
    refinement::{optimize_by_objective, optimize_by_utilization, RankMetric},
    run_stats::{AlgorithmRun, TrialResult},
    system::SystemConfig,
};

/// System and DAGs of one trial.
#[derive(Clone, Debug)]
pub struct Workload {
    pub config: SystemConfig,
    pub graphs: Vec<Graph>,
}

impl Workload {
    /// Checks the config and that every graph belongs to a known client.
    pub fn new(config: SystemConfig, graphs: Vec<Graph>) -> Result<Self> {
        config.validate()?;
        if let Some(graph) = graphs.iter().find(|graph| graph.client() >= config.client_count()) {
            return Err(Error::InvalidConfig(format!(
                "graph {} belongs to unknown client {}",
                graph.id(),
                graph.client()
            )));
        }
        Ok(Workload { config, graphs })
    }
}

/// Source of trial inputs.
pub trait WorkloadSource: Send + Sync {
    /// Workload of the trial with a given seed.
    fn generate(&self, seed: u64) -> Result<Workload>;
}

/// The same workload for every trial.
pub struct StaticWorkload {
    workload: Workload,
}

impl StaticWorkload {
    pub fn new(workload: Workload) -> Self {
        StaticWorkload { workload }
    }
}

impl WorkloadSource for StaticWorkload {
    fn generate(&self, _seed: u64) -> Result<Workload> {
        Ok(self.workload.clone())
    }
}

/// When and how to run refinement passes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefinementSchedule {
    /// Run both passes after every `every` DAGs.
    pub every: usize,
    /// Capacity factor of the objective pass.
    pub gamma: f64,
    /// Utilization threshold of the utilization pass.
    pub delta: f64,
    #[serde(default = "default_metric")]
    pub metric: RankMetric,
}

fn default_metric() -> RankMetric {
    RankMetric::F
}

pub type BackendResolver = fn(&str) -> Result<Box<dyn PlacementBackend>>;

pub struct Experiment {
    seed: u64,
    trials: usize,
    algorithms: Vec<Algorithm>,
    refinement: Option<RefinementSchedule>,
    workload: Arc<dyn WorkloadSource>,
    backend_resolver: BackendResolver,
}

impl Experiment {
    pub fn new(
        seed: u64,
        trials: usize,
        algorithms: Vec<Algorithm>,
        refinement: Option<RefinementSchedule>,
        workload: Arc<dyn WorkloadSource>,
        backend_resolver: BackendResolver,
    ) -> Self {
        Self {
            seed,
            trials,
            algorithms,
            refinement,
            workload,
            backend_resolver,
        }
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Runs all trials on `threads` threads. Results are sorted by trial.
    pub fn run(self, threads: usize) -> Result<Vec<TrialResult>> {
        let total_trials = self.trials;
        let finished_trial_atomic = Arc::new(AtomicUsize::new(0));
        let results = Arc::new(Mutex::new(Vec::new()));
        let this = Arc::new(self);

        let pool = ThreadPool::new(threads.max(1));
        let start_time = Instant::now();
        for trial in 0..total_trials {
            let finished_trial_atomic = finished_trial_atomic.clone();
            let results = results.clone();
            let this = this.clone();
            pool.execute(move || {
                let result = this.run_trial(trial);
                results
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(result);

                let finished_trials = finished_trial_atomic.fetch_add(1, Ordering::SeqCst) + 1;
                let elapsed = start_time.elapsed();
                let remaining = Duration::from_secs_f64(
                    elapsed.as_secs_f64() / finished_trials as f64 * (total_trials - finished_trials) as f64,
                );
                print!("\r{}", " ".repeat(70));
                print!(
                    "\rFinished {}/{} [{}%] trials in {:.2?}, remaining time: {:.2?}",
                    finished_trials,
                    total_trials,
                    (finished_trials as f64 * 100. / total_trials as f64).round() as i32,
                    elapsed,
                    remaining
                );
                let _ = std::io::stdout().flush();
            });
        }

        pool.join();

        print!("\r{}", " ".repeat(70));
        println!("\rFinished {} trials in {:.2?}", total_trials, start_time.elapsed());

        let results = std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner));
        let mut results = results.into_iter().collect::<Result<Vec<_>>>()?;
        results.sort_by_key(|result| result.trial);
        Ok(results)
    }

    /// Runs a single trial.
    pub fn run_trial(&self, trial: usize) -> Result<TrialResult> {
        let seed = self.seed.wrapping_add(trial as u64);
        let workload = self.workload.generate(seed)?;
        let config = &workload.config;
        info!(
            "trial {}: {} devices, {} dags",
            trial,
            config.device_count(),
            workload.graphs.len()
        );

        let backends = self
            .algorithms
            .iter()
            .map(|algorithm| (self.backend_resolver)(&algorithm.backend))
            .collect::<Result<Vec<_>>>()?;
        let mut deployments = self
            .algorithms
            .iter()
            .map(|_| Deployment::new(workload.graphs.clone(), config))
            .collect::<Vec<_>>();
        let mut runs = self
            .algorithms
            .iter()
            .cloned()
            .map(AlgorithmRun::new)
            .collect::<Vec<_>>();

        let no_exclusions = BTreeSet::new();
        for index in 0..workload.graphs.len() {
            for (k, algorithm) in self.algorithms.iter().enumerate() {
                let backend = backends[k].as_ref();
                let decision = match deployments[k].place_graph(index, backend, algorithm.policy, &no_exclusions, config) {
                    Err(Error::SearchBudgetExceeded(states)) => {
                        warn!(
                            "{}: graph {} left unplaced, search exceeded {} states",
                            algorithm, index, states
                        );
                        None
                    }
                    decision => decision?,
                };

                if let Some(schedule) = &self.refinement {
                    if schedule.every > 0 && (index + 1) % schedule.every == 0 {
                        refine(&mut deployments[k], backend, algorithm, schedule, config, &mut runs[k]);
                    }
                }

                runs[k].register(decision, deployments[k].calculate_objective_global(config));
            }
        }

        Ok(TrialResult { trial, seed, runs })
    }
}

fn refine(
    deployment: &mut Deployment,
    backend: &dyn PlacementBackend,
    algorithm: &Algorithm,
    schedule: &RefinementSchedule,
    config: &SystemConfig,
    run: &mut AlgorithmRun,
) {
    let outcome = optimize_by_objective(
        deployment,
        backend,
        algorithm.policy,
        schedule.metric,
        schedule.gamma,
        config,
    );
    apply_outcome("objective", outcome, deployment, algorithm, run);
    let outcome = optimize_by_utilization(deployment, backend, algorithm.policy, schedule.delta, config);
    apply_outcome("utilization", outcome, deployment, algorithm, run);
}

fn apply_outcome(
    pass: &str,
    outcome: Result<Outcome>,
    deployment: &mut Deployment,
    algorithm: &Algorithm,
    run: &mut AlgorithmRun,
) {
    match outcome {
        Ok(Outcome::Accepted(next)) => {
            run.accepted_refinements += 1;
            *deployment = next;
        }
        Ok(Outcome::Rejected) => {}
        Err(e @ Error::CapacityInvariant { .. }) => {
            error!("{}: {} pass aborted, keeping previous state: {}", algorithm, pass, e);
            run.invariant_violations += 1;
        }
        Err(e) => {
            warn!("{}: {} pass aborted, keeping previous state: {}", algorithm, pass, e);
        }
    }
}
