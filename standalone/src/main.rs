//! Runs a whole MapReduce job in this process, one task after another.
//!
//! Useful for checking a workload before submitting it to a cluster: the
//! files produced are the same ones the distributed system writes.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::input::expand_inputs;
use common::merge::{clean_intermediate, merge};
use common::task::{run_task, JobPhase, JobSpec};
use common::Workload;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Glob spec for the input files, one map task per match
    #[arg(short, long)]
    input: String,

    /// Name of the workload
    #[arg(short, long)]
    workload: String,

    /// Number of reduce tasks
    #[arg(short = 'r', long, default_value = "3")]
    n_reduce: usize,

    /// Name of the job. Defaults to the workload name.
    #[arg(short, long)]
    name: Option<String>,

    /// Where intermediate files and the result are written.
    #[arg(short = 'd', long, default_value = ".")]
    work_dir: PathBuf,

    /// Leave intermediate segments and reduce outputs behind.
    #[arg(short, long)]
    keep_intermediate: bool,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    args: Vec<String>,
}

/// Run every map task, then every reduce task, then merge.
fn run_sequential(
    spec: &JobSpec,
    engine: &Workload,
    work_dir: &Path,
    keep_intermediate: bool,
) -> Result<PathBuf> {
    for phase in [JobPhase::Map, JobPhase::Reduce] {
        let tasks = spec.tasks(phase);
        info!("Running {} {} tasks of {}", tasks.len(), phase, spec.name());
        for task in &tasks {
            run_task(task, engine, work_dir).with_context(|| format!("task {task} failed"))?;
        }
    }

    let output = merge(work_dir, spec.name(), spec.n_reduce())?;
    if !keep_intermediate {
        clean_intermediate(work_dir, spec.name(), spec.n_map(), spec.n_reduce())?;
    }
    Ok(output)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let engine = workload::try_named(&args.workload).ok_or_else(|| {
        anyhow!(
            "unknown workload `{}`, expected one of {:?}",
            args.workload,
            workload::NAMES
        )
    })?;

    let inputs = expand_inputs(&args.input)?;
    let name = args.name.unwrap_or_else(|| args.workload.clone());
    let spec = JobSpec::new(name, args.workload, inputs, args.n_reduce, args.args)?;

    std::fs::create_dir_all(&args.work_dir)?;
    let output = run_sequential(&spec, &engine, &args.work_dir, args.keep_intermediate)?;
    info!("Result written to `{}`", output.display());

    Ok(())
}
