use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "introseek", about = "Finds the shared intro segment across a set of episodes")]
pub struct Cli {
    /// Video or audio files to scan (at least two)
    pub inputs: Vec<PathBuf>,

    /// FFT plan cache to load before analysis starts
    #[arg(long)]
    pub plan_cache: Option<PathBuf>,

    /// Write a power-of-two FFT plan cache to the given path and exit
    #[arg(long)]
    pub export_plan_cache: Option<PathBuf>,

    /// Worker threads (default: all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Optional TOML config file
    #[arg(long, default_value = "introseek.toml")]
    pub config: PathBuf,
}
