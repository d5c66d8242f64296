// Each submitted job is driven by a single `process_job` task; several of
// them may run at once, competing for the same pool of idle workers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::sync::Mutex;
use tracing::{error, info};

use common::address::AddressSource;
use common::job::JobState;
use common::merge::{clean_intermediate, merge};
use common::schedule::{schedule, TaskInvoker};
use common::task::{JobPhase, JobSpec};

use crate::jobs::JobQueue;

/// Everything a job needs besides its own spec.
#[derive(Clone)]
pub struct JobContext {
    pub jobs: Arc<Mutex<JobQueue>>,
    pub addresses: AddressSource,
    pub invoker: Arc<dyn TaskInvoker>,
    pub work_dir: PathBuf,
    pub keep_intermediate: bool,
}

/// Run a job to completion, recording its progress in the job history.
pub async fn process_job(spec: JobSpec, ctx: JobContext) {
    let name = spec.name().to_owned();

    match _process_job(&spec, &ctx).await {
        Ok(output) => {
            ctx.jobs
                .lock()
                .await
                .update_job_state(&name, JobState::Completed);
            info!("Job {name} completed, output in `{}`", output.display());
        }
        Err(e) => {
            error!("Job {name} failed: {e:#}");
            ctx.jobs.lock().await.fail_job(&name, format!("{e:#}"));
        }
    }
}

async fn _process_job(spec: &JobSpec, ctx: &JobContext) -> anyhow::Result<PathBuf> {
    // 1. Mapping stage.
    set_state(ctx, spec, JobState::Mapping).await;
    schedule(
        spec.tasks(JobPhase::Map),
        &ctx.addresses,
        ctx.invoker.clone(),
    )
    .await;

    // 2. Reduce stage.
    set_state(ctx, spec, JobState::Reducing).await;
    schedule(
        spec.tasks(JobPhase::Reduce),
        &ctx.addresses,
        ctx.invoker.clone(),
    )
    .await;

    // 3. Merge the reduce outputs into a single file.
    set_state(ctx, spec, JobState::Merging).await;
    let work_dir = ctx.work_dir.clone();
    let name = spec.name().to_owned();
    let (n_map, n_reduce) = (spec.n_map(), spec.n_reduce());
    let keep_intermediate = ctx.keep_intermediate;

    tokio::task::spawn_blocking(move || {
        let output = merge(&work_dir, &name, n_reduce)?;
        if !keep_intermediate {
            clean_intermediate(&work_dir, &name, n_map, n_reduce)
                .context("failed to clean up intermediate files")?;
        }
        Ok::<_, anyhow::Error>(output)
    })
    .await
    .map_err(|e| anyhow!("merge task panicked: {e}"))?
}

async fn set_state(ctx: &JobContext, spec: &JobSpec, state: JobState) {
    info!("Job {} is {}", spec.name(), state);
    ctx.jobs.lock().await.update_job_state(spec.name(), state);
}
