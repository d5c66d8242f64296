//
// Import gRPC stubs/definitions.
//
pub use coordinator::{coordinator_client::CoordinatorClient, RegisterRequest};
pub mod coordinator {
    tonic::include_proto!("coordinator");
}

pub use worker::worker_server::{Worker, WorkerServer};
pub use worker::{DoTaskRequest, DoTaskResponse, Phase};
pub mod worker {
    tonic::include_proto!("worker");
}

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info};

use common::task::{run_task, JobPhase, TaskDescriptor};

#[derive(Debug, PartialEq, Eq)]
enum WorkerState {
    Idle,
    InProgress,
}

#[derive(Debug)]
pub struct MRWorker {
    state: Mutex<WorkerState>,
    work_dir: PathBuf,
    served: AtomicUsize,
    max_tasks: Option<usize>,
    shutdown: CancellationToken,
}

impl MRWorker {
    pub fn new(work_dir: PathBuf, max_tasks: Option<usize>, shutdown: CancellationToken) -> MRWorker {
        MRWorker {
            state: Mutex::new(WorkerState::Idle),
            work_dir,
            served: AtomicUsize::new(0),
            max_tasks,
            shutdown,
        }
    }

    /// Claim the worker for one task. Returns `None` if a task is already
    /// running. The worker is idle again once the claim is dropped, also
    /// when the request is cancelled halfway.
    fn try_begin(&self) -> Option<Claim<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == WorkerState::InProgress {
            return None;
        }
        *state = WorkerState::InProgress;
        Some(Claim { state: &self.state })
    }

    async fn execute(&self, task: TaskDescriptor) -> anyhow::Result<()> {
        let workload = workload::try_named(task.workload())
            .ok_or_else(|| anyhow!("The workload `{}` is not a known workload", task.workload()))?;
        let work_dir = self.work_dir.clone();

        tokio::task::spawn_blocking(move || run_task(&task, &workload, &work_dir)).await?
    }
}

struct Claim<'a> {
    state: &'a Mutex<WorkerState>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = WorkerState::Idle;
    }
}

/// Rebuild the task descriptor sent by the coordinator.
pub fn task_from_request(request: DoTaskRequest) -> anyhow::Result<TaskDescriptor> {
    let phase = match Phase::try_from(request.phase) {
        Ok(Phase::Map) => JobPhase::Map,
        Ok(Phase::Reduce) => JobPhase::Reduce,
        Err(_) => return Err(anyhow!("unknown task phase {}", request.phase)),
    };

    TaskDescriptor::new(
        request.job_name,
        phase,
        request.task_number as usize,
        request.file,
        request.num_other as usize,
        request.workload,
        request.aux,
    )
}

#[tonic::async_trait]
impl Worker for MRWorker {
    async fn do_task(
        &self,
        request: Request<DoTaskRequest>,
    ) -> Result<Response<DoTaskResponse>, Status> {
        let task = task_from_request(request.into_inner())
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        // we accept the work only if we are free
        let Some(claim) = self.try_begin() else {
            debug!("Busy, turning down {task}");
            return Ok(Response::new(DoTaskResponse { success: false }));
        };

        info!("Starting {task}");
        let result = self.execute(task.clone()).await;
        drop(claim);

        match &result {
            Ok(()) => info!("Finished {task}"),
            Err(e) => error!("{task} failed: {e:#}"),
        }

        let served = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        if self.max_tasks.is_some_and(|max| served >= max) {
            info!("Served {served} tasks, shutting down");
            self.shutdown.cancel();
        }

        Ok(Response::new(DoTaskResponse {
            success: result.is_ok(),
        }))
    }
}
