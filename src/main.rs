// Entry point: evaluates parameter files on the kinematic rig.
use anyhow::{Context, Result};
use cablecpg::body::rig::KinematicRig;
use cablecpg::cli::{Args, Command};
use cablecpg::config::AppConfig;
use cablecpg::trial::params::random_document;
use cablecpg::trial::{EpisodeOptions, TrialController, run_episode};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = AppConfig::load_or_default(&args.config);
    config.validate().context("invalid configuration")?;

    match args.command {
        Command::Run {
            params,
            duration,
            dt,
        } => {
            let mut rig = KinematicRig::from_config(&config.rig);
            let mut trial = TrialController::new(config, &params);
            let score = run_episode(&mut trial, &mut rig, EpisodeOptions { duration, dt })
                .with_context(|| format!("trial {} failed", params.display()))?;
            println!("{}", serde_json::to_string(&score)?);
        }
        Command::Seed { out, seed } => {
            let seed = seed.unwrap_or_else(rand::random);
            let mut rng = SmallRng::seed_from_u64(seed);
            let nodes = config.rig.cable_count();
            let feedback = config.trial.feedback.then(|| {
                let states = config.feedback.state_width;
                (states, states * 2)
            });
            let doc = random_document(&mut rng, nodes, feedback);
            std::fs::write(&out, serde_json::to_string_pretty(&doc)? + "\n")
                .with_context(|| format!("writing {}", out.display()))?;
            info!(path = %out.display(), seed, nodes, "wrote parameter file");
        }
    }
    Ok(())
}
