use cablecpg::body::rig::KinematicRig;
use cablecpg::config::{AppConfig, ParamRange, RigConfig};
use cablecpg::trial::params::{ParamsFile, random_document};
use cablecpg::trial::{EpisodeOptions, TrialController, TrialPhase, run_episode};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::fs;
use std::path::PathBuf;

fn unique_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "cablecpg_episode_test_{}_{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos(),
        name,
    ));
    p
}

fn run(config: AppConfig, feedback: Option<(usize, usize)>, name: &str) {
    let rig_cfg = config.rig.clone();
    let mut rig = KinematicRig::from_config(&rig_cfg);
    let path = unique_path(name);
    let mut rng = SmallRng::seed_from_u64(17);
    let doc = random_document(&mut rng, rig_cfg.cable_count(), feedback);
    fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let mut trial = TrialController::new(config, &path);
    let score = run_episode(
        &mut trial,
        &mut rig,
        EpisodeOptions {
            duration: 2.0,
            dt: 0.001,
        },
    )
    .unwrap();
    assert_eq!(trial.phase(), TrialPhase::TornDown);
    assert!(trial.controllers().is_empty());
    assert_eq!(trial.state().ticks, 2000);
    assert!(!score.aborted);
    // Drift of 0.05/s along x for 2 s.
    assert!((score.distance - 0.1).abs() < 1e-9, "distance {}", score.distance);
    assert!(score.energy <= 0.0);
    assert!((score.final_com[0] - score.initial_com[0] - 0.1).abs() < 1e-9);

    let written = ParamsFile::read(&path).unwrap();
    let last = written.scores().last().copied().unwrap();
    assert_eq!(last.distance, score.distance);
    assert_eq!(last.energy, score.energy);
    let metrics = written.root()["metrics"].as_array().unwrap();
    assert_eq!(metrics.len(), 2);
    assert_eq!(
        metrics[1]["final COM x"].as_f64(),
        Some(score.final_com[0])
    );
    let _ = fs::remove_file(&path);
}

#[test]
fn feedback_episode_scores_rig_drift() {
    run(AppConfig::default(), Some((2, 4)), "feedback.json");
}

#[test]
fn open_loop_episode_scores_rig_drift() {
    let mut config = AppConfig::default();
    config.trial.feedback = false;
    config.rig = RigConfig {
        segments: 3,
        cables_per_segment: 3,
        ..RigConfig::default()
    };
    run(config, None, "open_loop.json");
}

#[test]
fn explicit_control_length_tightens_cables() {
    let mut config = AppConfig::default();
    config.trial.feedback = false;
    config.impedance.use_default = false;
    config.impedance.control_length = 9.5;
    // Keep the drive small next to the position term.
    config.limits.amp = ParamRange::new(0.0, 1.0);
    let rig_cfg = config.rig.clone();
    let mut rig = KinematicRig::from_config(&rig_cfg);
    let path = unique_path("control_length.json");
    let mut rng = SmallRng::seed_from_u64(1);
    let doc = random_document(&mut rng, rig_cfg.cable_count(), None);
    fs::write(&path, doc.to_string()).unwrap();

    let mut trial = TrialController::new(config, &path);
    let score = run_episode(
        &mut trial,
        &mut rig,
        EpisodeOptions {
            duration: 1.0,
            dt: 0.001,
        },
    )
    .unwrap();
    assert!(score.energy < 0.0, "energy {}", score.energy);
    let _ = fs::remove_file(&path);
}

#[test]
fn invalid_tick_length_is_rejected_before_setup() {
    let mut rig = KinematicRig::from_config(&RigConfig::default());
    let mut trial = TrialController::new(AppConfig::default(), unique_path("never.json"));
    let err = run_episode(
        &mut trial,
        &mut rig,
        EpisodeOptions {
            duration: 1.0,
            dt: 0.0,
        },
    );
    assert!(err.is_err());
    assert_eq!(trial.phase(), TrialPhase::Uninitialized);
}
