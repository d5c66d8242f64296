mod args;

use args::Args;

mod core;

use core::{CoordinatorServer, MRCoordinator};

mod job_queue;
mod jobs;
mod rpc;
mod worker_registry;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rpc::GrpcInvoker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Retrieve server configuration from command line.
    // Note: There are default values for EACH argument.
    let args = Args::parse();

    // Configure address.
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    std::fs::create_dir_all(&args.work_dir)?;

    let coordinator = MRCoordinator::new(
        args.work_dir.clone(),
        args.keep_intermediate,
        Arc::new(GrpcInvoker),
    );

    info!(
        "CoordinatorServer listening on {}, working in `{}`",
        addr,
        args.work_dir.display()
    );

    Server::builder()
        .add_service(CoordinatorServer::new(coordinator))
        .serve_with_shutdown(addr, async {
            let _ = signal::ctrl_c().await;
            info!("Coordinator exiting...");
        })
        .await?;

    Ok(())
}
