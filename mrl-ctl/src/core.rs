use common::input::expand_inputs;

//
// Import gRPC stubs/definitions.
//
use crate::core::coordinator::coordinator_client::CoordinatorClient;
use crate::core::coordinator::{JobsRequest, StatusRequest, SubmitRequest};

pub mod coordinator {
    tonic::include_proto!("coordinator");
}

// Tasks
pub async fn jobs(coordinator: String) -> anyhow::Result<()> {
    let mut client = CoordinatorClient::connect(coordinator).await?;
    let request = tonic::Request::new(JobsRequest {});
    let response = client.jobs(request).await?;

    let jobs = response.into_inner().jobs;

    println!("[Jobs]");
    if jobs.is_empty() {
        println!("No jobs submitted.");
        return Ok(());
    }

    println!(
        "{:<16} {:<14} {:<10} {:>5} {:>8}  output",
        "name", "workload", "state", "maps", "reduces"
    );
    for job in jobs {
        println!(
            "{:<16} {:<14} {:<10} {:>5} {:>8}  {}",
            job.job_name, job.workload, job.state, job.n_map, job.n_reduce, job.output
        );
        if !job.error.is_empty() {
            println!("    error: {}", job.error);
        }
    }

    Ok(())
}

pub async fn submit(
    coordinator: String,
    name: String,
    input: String,
    workload: String,
    n_reduce: u32,
    aux: Vec<String>,
) -> anyhow::Result<()> {
    let inputs = expand_inputs(&input)?;
    let n_map = inputs.len();

    let mut client = CoordinatorClient::connect(coordinator).await?;
    let request = tonic::Request::new(SubmitRequest {
        job_name: name,
        workload,
        inputs,
        n_reduce,
        aux,
    });
    let response = client.submit(request).await?.into_inner();

    println!(
        "Submitted job {} ({} map tasks, {} reduce tasks); the result will be written to {}",
        response.job_name, n_map, n_reduce, response.output
    );

    Ok(())
}

pub async fn status(coordinator: String) -> anyhow::Result<()> {
    let mut client = CoordinatorClient::connect(coordinator).await?;
    let request = tonic::Request::new(StatusRequest {});
    let response = client.status(request).await?.into_inner();

    println!("[Status]");
    println!("Registered workers: {}", response.registered_workers);
    println!("Idle workers:       {}", response.idle_workers);
    println!("Running jobs:       {}", response.running_jobs);

    Ok(())
}
