use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML
    #[arg(long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Evaluate one parameter file on the kinematic rig and append its score
    Run {
        /// Parameter/result JSON document
        #[arg(value_name = "PARAMS")]
        params: PathBuf,

        /// Episode length in simulated seconds
        #[arg(long, default_value_t = 60.0)]
        duration: f64,

        /// Physical tick length in seconds
        #[arg(long, default_value_t = 0.001)]
        dt: f64,
    },
    /// Write a random normalized parameter file sized for the configured rig
    Seed {
        #[arg(value_name = "OUT")]
        out: PathBuf,

        /// RNG seed (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },
}
