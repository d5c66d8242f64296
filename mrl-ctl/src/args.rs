use clap::{command, Parser, Subcommand};

//
// For parsing user specified command.
//
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address of the coordinator server
    #[arg(short, long, default_value = "http://[::1]:8030")]
    pub coordinator: String,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all jobs which have been submitted to the system and their states.
    Jobs,
    /// Display the health status of the system, showing how many workers are registered,
    /// how many of them are idle and how many jobs are running.
    Status,
    /// Submit a job to the cluster
    Submit {
        /// Glob spec for the input files, one map task per match
        #[arg(short, long)]
        input: String,

        /// Name of the workload
        #[arg(short, long)]
        workload: String,

        /// Name of the job, used in every file it produces. Defaults to the workload name.
        #[arg(short, long)]
        name: Option<String>,

        /// Number of reduce tasks
        #[arg(short = 'r', long, default_value = "3")]
        n_reduce: u32,

        /// Auxiliary arguments to pass to the MapReduce application.
        #[clap(value_parser, last = true)]
        args: Vec<String>,
    },
}
