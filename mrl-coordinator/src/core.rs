use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tonic::{Request, Response, Status};
use tracing::info;

pub use coordinator::coordinator_server::{Coordinator, CoordinatorServer};
use coordinator::{
    JobInfo, JobsRequest, JobsResponse, RegisterRequest, RegisterResponse, StatusRequest,
    StatusResponse, SubmitRequest, SubmitResponse,
};
pub mod coordinator {
    tonic::include_proto!("coordinator");
}

pub mod worker {
    tonic::include_proto!("worker");
}
pub use worker::worker_client::WorkerClient;

use common::naming::result_path;
use common::schedule::TaskInvoker;
use common::task::JobSpec;

use crate::job_queue::{process_job, JobContext};
use crate::jobs::{Job, JobQueue};
use crate::worker_registry::WorkerRegistry;

pub struct MRCoordinator {
    jobs: Arc<Mutex<JobQueue>>,
    registry: Arc<Mutex<WorkerRegistry>>,
    invoker: Arc<dyn TaskInvoker>,
    work_dir: PathBuf,
    keep_intermediate: bool,
}

impl MRCoordinator {
    pub fn new(work_dir: PathBuf, keep_intermediate: bool, invoker: Arc<dyn TaskInvoker>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(JobQueue::new())),
            registry: Arc::new(Mutex::new(WorkerRegistry::new())),
            invoker,
            work_dir,
            keep_intermediate,
        }
    }

    /// Validate a submission and turn it into a job spec.
    fn job_from_request(request: SubmitRequest) -> Result<JobSpec, Status> {
        if workload::try_named(&request.workload).is_none() {
            return Err(Status::invalid_argument(format!(
                "unknown workload `{}`, expected one of {:?}",
                request.workload,
                workload::NAMES
            )));
        }

        JobSpec::new(
            request.job_name,
            request.workload,
            request.inputs,
            request.n_reduce as usize,
            request.aux,
        )
        .map_err(|e| Status::invalid_argument(e.to_string()))
    }
}

#[tonic::async_trait]
impl Coordinator for MRCoordinator {
    /// Worker requests to join the workforce.
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let address = request.into_inner().address;
        if address.is_empty() {
            return Err(Status::invalid_argument("a worker must give its address"));
        }

        let registered_workers = self.registry.lock().await.register_worker(address);

        Ok(Response::new(RegisterResponse {
            registered_workers: registered_workers as u32,
        }))
    }

    async fn submit(
        &self,
        request: Request<SubmitRequest>,
    ) -> Result<Response<SubmitResponse>, Status> {
        let spec = Self::job_from_request(request.into_inner())?;
        let output = result_path(&self.work_dir, spec.name());

        if !self
            .jobs
            .lock()
            .await
            .push_job(Job::new(spec.clone(), output.clone()))
        {
            return Err(Status::already_exists(format!(
                "a job named `{}` was already submitted",
                spec.name()
            )));
        }

        info!(
            "Job {} submitted: {} over {} inputs, {} reduce tasks",
            spec.name(),
            spec.workload(),
            spec.n_map(),
            spec.n_reduce()
        );

        let ctx = JobContext {
            jobs: self.jobs.clone(),
            addresses: self.registry.lock().await.addresses(),
            invoker: self.invoker.clone(),
            work_dir: self.work_dir.clone(),
            keep_intermediate: self.keep_intermediate,
        };
        let reply = SubmitResponse {
            job_name: spec.name().to_owned(),
            output: output.display().to_string(),
        };
        tokio::spawn(process_job(spec, ctx));

        Ok(Response::new(reply))
    }

    async fn jobs(&self, _request: Request<JobsRequest>) -> Result<Response<JobsResponse>, Status> {
        let jobs = self
            .jobs
            .lock()
            .await
            .get_all_jobs()
            .iter()
            .map(|job| JobInfo {
                job_name: job.get_name().to_owned(),
                workload: job.get_spec().workload().to_owned(),
                state: job.get_state().to_string(),
                n_map: job.get_spec().n_map() as u32,
                n_reduce: job.get_spec().n_reduce() as u32,
                output: job.get_output().display().to_string(),
                error: job.get_error().unwrap_or_default().to_owned(),
            })
            .collect();

        Ok(Response::new(JobsResponse { jobs }))
    }

    async fn status(
        &self,
        _request: Request<StatusRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let (registered_workers, idle_workers) = {
            let registry = self.registry.lock().await;
            (registry.len(), registry.idle())
        };
        let running_jobs = self.jobs.lock().await.number_of_jobs_running();

        Ok(Response::new(StatusResponse {
            registered_workers: registered_workers as u32,
            idle_workers: idle_workers as u32,
            running_jobs: running_jobs as u32,
        }))
    }
}
