mod args;
use args::{Args, Commands};
use clap::Parser;

mod core;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Args {
        coordinator,
        command,
    } = Args::parse();

    match command {
        Commands::Jobs => core::jobs(coordinator).await?,
        Commands::Status => core::status(coordinator).await?,
        Commands::Submit {
            input,
            workload,
            name,
            n_reduce,
            args,
        } => {
            let name = name.unwrap_or_else(|| workload.clone());
            core::submit(coordinator, name, input, workload, n_reduce, args).await?
        }
    }

    Ok(())
}
