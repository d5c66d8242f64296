use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address of the coordinator server
    #[arg(short = 'j', long = "join", default_value = "http://[::1]:8030")]
    pub address: String,

    /// The interface to run the worker on.
    #[arg(long, default_value = "[::1]")]
    pub host: String,

    /// The port to run the worker on.
    #[arg(short, long)]
    pub port: u16,

    /// Address announced to the coordinator. Defaults to `http://<host>:<port>`.
    #[arg(long)]
    pub advertise: Option<String>,

    /// Directory shared with the coordinator and the other workers, where
    /// intermediate and output files are written.
    #[arg(short, long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Stop after serving this many tasks.
    #[arg(long)]
    pub max_tasks: Option<usize>,
}
