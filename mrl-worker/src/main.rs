use std::net::SocketAddr;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod core;
use core::{CoordinatorClient, MRWorker, RegisterRequest, WorkerServer};

mod args;
use args::Args;

async fn start_server(
    addr: SocketAddr,
    worker: MRWorker,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let handle = tokio::task::spawn(async move {
        info!("Worker server listening on {}", addr);

        let result = Server::builder()
            .add_service(WorkerServer::new(worker))
            .serve_with_shutdown(addr, shutdown.cancelled())
            .await;
        if let Err(e) = result {
            error!("Worker server failed: {}", e);
        }
    });
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    handle
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    std::fs::create_dir_all(&args.work_dir)?;
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let advertised = args.advertise.unwrap_or_else(|| format!("http://{addr}"));

    // Start server as background task.
    let shutdown = CancellationToken::new();
    let worker = MRWorker::new(args.work_dir, args.max_tasks, shutdown.clone());
    let server = start_server(addr, worker, shutdown.clone()).await;

    let mut client = CoordinatorClient::connect(args.address).await?;
    let request = tonic::Request::new(RegisterRequest {
        address: advertised.clone(),
    });
    let response = client.register(request).await?;

    info!(
        "Worker registered as {} ({} workers known to the coordinator)",
        advertised,
        response.into_inner().registered_workers
    );

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(err) = result {
                error!("Fatal error encountered {}", err);
                shutdown.cancel();
                return Err(format!("Unable to listen for shutdown signal: {}", err).into());
            }
            info!("Worker server exiting...");
        }
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancel();
    server.await?;
    Ok(())
}
