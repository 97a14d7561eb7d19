use std::{fs::File, io::Write, path::PathBuf, sync::Arc};

use clap::Parser;
use edge_placement::{
    experiment::{Experiment, RefinementSchedule, StaticWorkload, Workload, WorkloadSource},
    parser::graphs_from_yaml,
    placement_strategy::{backend_from_name, Algorithm},
    report::ResultWriter,
    run_stats::TrialResult,
    system::SystemConfig,
};
use edge_workload::{config::GeneratorConfig, workload::RandomWorkload};
use env_logger::Builder;
use itertools::Itertools;
use log::info;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(tag = "type")]
enum WorkloadConfig {
    Random {
        #[serde(default)]
        generator: GeneratorConfig,
    },
    Static {
        system: PathBuf,
        graphs: PathBuf,
    },
}

fn default_algorithms() -> Vec<Algorithm> {
    ["DP_lat", "DP_enabled", "DP_min"]
        .into_iter()
        .filter_map(|name| name.parse().ok())
        .collect()
}

#[derive(Deserialize)]
struct Config {
    #[serde(default)]
    seed: u64,
    trials: usize,
    #[serde(default = "default_algorithms")]
    algorithms: Vec<Algorithm>,
    workload: WorkloadConfig,
    #[serde(default)]
    refinement: Option<RefinementSchedule>,
}

/// Runs batch placement experiment.
#[derive(Parser, Debug)]
struct Args {
    /// Path to config.
    #[arg(short, long)]
    config: PathBuf,

    /// Folder for result streams and summary.
    #[arg(short, long)]
    output: PathBuf,

    /// Do not run experiments, just read results from the summary in --output.
    #[arg(long)]
    precalculated: bool,

    /// Number of threads.
    #[arg(long, default_value_t = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))]
    threads: usize,
}

struct ResultRow {
    name: String,
    avg_global_f: f64,
    avg_global_latency: f64,
    placed: f64,
    accepted_refinements: usize,
    invariant_violations: usize,
}

fn run(args: Args) -> edge_placement::Result<()> {
    let summary_path = args.output.join("summary.json");
    let results: Vec<TrialResult> = if args.precalculated {
        serde_json::from_str(&std::fs::read_to_string(&summary_path)?)?
    } else {
        let config: Config = serde_yaml::from_str(&std::fs::read_to_string(&args.config)?)?;
        let workload: Arc<dyn WorkloadSource> = match config.workload {
            WorkloadConfig::Random { generator } => Arc::new(RandomWorkload::new(generator)),
            WorkloadConfig::Static { system, graphs } => Arc::new(StaticWorkload::new(Workload::new(
                SystemConfig::from_yaml(system)?,
                graphs_from_yaml(graphs)?,
            )?)),
        };
        info!(
            "running {} trials of {}",
            config.trials,
            config.algorithms.iter().join(", ")
        );

        let experiment = Experiment::new(
            config.seed,
            config.trials,
            config.algorithms,
            config.refinement,
            workload,
            backend_from_name,
        );
        let mut writer = ResultWriter::create(&args.output, experiment.algorithms())?;
        let results = experiment.run(args.threads)?;
        for trial in results.iter() {
            writer.append_trial(trial)?;
        }
        writer.flush()?;
        File::create(&summary_path)?.write_all(serde_json::to_string_pretty(&results)?.as_bytes())?;
        results
    };

    let rows = results
        .iter()
        .flat_map(|trial| trial.runs.iter())
        .into_group_map_by(|run| run.algorithm.to_string())
        .into_iter()
        .map(|(name, runs)| {
            let globals = runs.iter().filter_map(|run| run.final_global()).collect::<Vec<_>>();
            let count = globals.len().max(1) as f64;
            ResultRow {
                name,
                avg_global_f: globals.iter().map(|g| g.f).sum::<f64>() / count,
                avg_global_latency: globals.iter().map(|g| g.latency).sum::<f64>() / count,
                placed: runs.iter().map(|run| run.placed_count() as f64).sum::<f64>() / runs.len() as f64,
                accepted_refinements: runs.iter().map(|run| run.accepted_refinements).sum(),
                invariant_violations: runs.iter().map(|run| run.invariant_violations).sum(),
            }
        })
        .sorted_by(|a, b| a.avg_global_f.total_cmp(&b.avg_global_f).then(a.name.cmp(&b.name)))
        .collect::<Vec<_>>();

    let width = rows.iter().map(|row| row.name.len()).max().unwrap_or(0).max(9);
    println!(
        "| {: <width$} | avg global F | avg latency sum | avg placed | refinements | violations |",
        "algorithm",
        width = width
    );
    println!(
        "|-{:-<width$}-|--------------|-----------------|------------|-------------|------------|",
        "",
        width = width
    );
    for row in rows.into_iter() {
        println!(
            "| {: <width$} | {: >12.3} | {: >15.3} | {: >10.2} | {: >11} | {: >10} |",
            row.name,
            row.avg_global_f,
            row.avg_global_latency,
            row.placed,
            row.accepted_refinements,
            row.invariant_violations,
            width = width
        );
    }
    Ok(())
}

fn main() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
