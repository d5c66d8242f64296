//! Task invocation over gRPC.

use async_trait::async_trait;
use tonic::Request;
use tracing::debug;

use common::schedule::{InvokeError, TaskInvoker};
use common::task::{JobPhase, TaskDescriptor};

use crate::core::worker::{DoTaskRequest, Phase};
use crate::core::WorkerClient;

impl From<&TaskDescriptor> for DoTaskRequest {
    fn from(task: &TaskDescriptor) -> Self {
        let phase = match task.phase() {
            JobPhase::Map => Phase::Map,
            JobPhase::Reduce => Phase::Reduce,
        };

        DoTaskRequest {
            job_name: task.job_name().to_owned(),
            phase: phase as i32,
            task_number: task.task_number() as u32,
            file: task.file().map(str::to_owned),
            num_other: task.num_other() as u32,
            workload: task.workload().to_owned(),
            aux: task.aux().to_vec(),
        }
    }
}

/// Sends each task to the worker's `DoTask` endpoint and waits for its reply.
#[derive(Debug, Default)]
pub struct GrpcInvoker;

fn endpoint(address: &str) -> String {
    if address.contains("://") {
        address.to_owned()
    } else {
        format!("http://{address}")
    }
}

#[async_trait]
impl TaskInvoker for GrpcInvoker {
    async fn invoke(&self, address: &str, task: &TaskDescriptor) -> Result<(), InvokeError> {
        let mut client = WorkerClient::connect(endpoint(address))
            .await
            .map_err(|e| InvokeError::Unreachable {
                address: address.to_owned(),
                reason: e.to_string(),
            })?;

        let response = client
            .do_task(Request::new(DoTaskRequest::from(task)))
            .await
            .map_err(|status| InvokeError::Transport {
                address: address.to_owned(),
                reason: status.message().to_owned(),
            })?;

        if response.into_inner().success {
            debug!("{address} finished {task}");
            Ok(())
        } else {
            Err(InvokeError::TaskFailed {
                address: address.to_owned(),
                task: task.to_string(),
            })
        }
    }
}
