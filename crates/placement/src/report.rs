//! Space delimited result streams.
//!
//! Every stream starts with a header naming the algorithms and gets one row per DAG, with `-1`
//! standing for a DAG that could not be placed (or a global objective with nothing placed).

use std::{
    fs::{File, OpenOptions},
    path::Path,
};

use crate::{
    error::Result,
    objective::GlobalObjective,
    placement_strategy::Algorithm,
    run_stats::{DagDecision, TrialResult},
};

/// Value printed for infeasible placements.
pub const INFEASIBLE: &str = "-1";

/// Reported metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Latency,
    F,
    RC,
    Selectivity,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Latency, Metric::F, Metric::RC, Metric::Selectivity];

    fn file_stem(&self) -> &'static str {
        match self {
            Metric::Latency => "latency",
            Metric::F => "F",
            Metric::RC => "RC",
            Metric::Selectivity => "selectivity",
        }
    }

    fn of_decision(&self, decision: &DagDecision) -> f64 {
        match self {
            Metric::Latency => decision.latency,
            Metric::F => decision.f,
            Metric::RC => decision.rc,
            Metric::Selectivity => decision.selectivity,
        }
    }

    fn of_global(&self, global: &GlobalObjective) -> f64 {
        match self {
            Metric::Latency => global.latency,
            Metric::F => global.f,
            Metric::RC => global.rc,
            Metric::Selectivity => global.selectivity,
        }
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| INFEASIBLE.to_string(), |value| value.to_string())
}

struct Stream {
    metric: Metric,
    global: bool,
    writer: csv::Writer<File>,
}

/// Writer of the eight result streams of an experiment.
pub struct ResultWriter {
    streams: Vec<Stream>,
}

impl ResultWriter {
    /// Creates the stream files in `folder`, truncating old ones, and writes headers.
    pub fn create<P: AsRef<Path>>(folder: P, algorithms: &[Algorithm]) -> Result<Self> {
        std::fs::create_dir_all(&folder)?;
        let mut streams = Vec::new();
        for global in [false, true] {
            for metric in Metric::ALL {
                let name = if global {
                    format!("{}_global.csv", metric.file_stem())
                } else {
                    format!("{}.csv", metric.file_stem())
                };
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(folder.as_ref().join(name))?;
                let mut writer = csv::WriterBuilder::new()
                    .delimiter(b' ')
                    .has_headers(false)
                    .from_writer(file);
                writer.write_record(algorithms.iter().map(|algorithm| algorithm.to_string()))?;
                streams.push(Stream {
                    metric,
                    global,
                    writer,
                });
            }
        }
        Ok(ResultWriter { streams })
    }

    /// Appends one row per DAG of `trial` to every stream.
    pub fn append_trial(&mut self, trial: &TrialResult) -> Result<()> {
        for stream in self.streams.iter_mut() {
            for dag in 0..trial.dag_count() {
                let row = trial.runs.iter().map(|run| {
                    if stream.global {
                        format_value(run.globals[dag].as_ref().map(|global| stream.metric.of_global(global)))
                    } else {
                        format_value(run.decisions[dag].as_ref().map(|decision| stream.metric.of_decision(decision)))
                    }
                });
                stream.writer.write_record(row)?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        for stream in self.streams.iter_mut() {
            stream.writer.flush()?;
        }
        Ok(())
    }
}
