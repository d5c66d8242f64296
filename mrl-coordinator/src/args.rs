use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The port for the server to run on.
    #[arg(short, long, default_value = "8030")]
    pub port: u16,

    /// The interface for the server to listen on.
    #[arg(long, default_value = "[::1]")]
    pub host: String,

    /// Directory shared with the workers. Intermediate files and job
    /// results are written here.
    #[arg(short, long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Leave intermediate segments and reduce outputs behind once a job is done.
    #[arg(short, long)]
    pub keep_intermediate: bool,
}
