use cablecpg::body::rig::KinematicRig;
use cablecpg::config::{AppConfig, ConfigError, RigConfig};
use cablecpg::trial::{TrialController, TrialError, TrialPhase};
use serde_json::json;
use std::fs;
use std::path::PathBuf;

fn unique_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "cablecpg_shape_test_{}_{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos(),
        name,
    ));
    p
}

#[test]
fn three_node_rows_for_four_cables_fail_before_construction() {
    // 3 segments with 2 cables per gap: 4 cables.
    let rig_cfg = RigConfig {
        segments: 3,
        ..RigConfig::default()
    };
    let rig = KinematicRig::from_config(&rig_cfg);
    let path = unique_path("params.json");
    let doc = json!({
        "nodeVals": { "params": [[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]] },
        "edgeVals": { "params": [[0.5, 0.5], [0.5, 0.5], [0.5, 0.5],
                                 [0.5, 0.5], [0.5, 0.5], [0.5, 0.5]] },
    });
    let text = serde_json::to_string_pretty(&doc).unwrap();
    fs::write(&path, &text).unwrap();

    let mut config = AppConfig::default();
    config.trial.feedback = false;
    let mut trial = TrialController::new(config, &path);
    let err = trial.setup(&rig).unwrap_err();
    assert!(matches!(
        err,
        TrialError::Config(ConfigError::Shape {
            section: "nodeVals.params",
            expected: 4,
            found: 3
        })
    ));
    assert_eq!(trial.phase(), TrialPhase::Uninitialized);
    assert!(trial.controllers().is_empty());
    assert!(trial.network().is_none());
    assert_eq!(fs::read_to_string(&path).unwrap(), text);
    let _ = fs::remove_file(&path);
}

#[test]
fn out_of_range_normalized_value_is_a_config_error() {
    let rig = KinematicRig::from_config(&RigConfig {
        segments: 2,
        cables_per_segment: 2,
        ..RigConfig::default()
    });
    let path = unique_path("range.json");
    let doc = json!({
        "nodeVals": { "params": [[0.1, 1.5], [0.3, 0.4]] },
        "edgeVals": { "params": [[0.5, 0.5]] },
    });
    fs::write(&path, doc.to_string()).unwrap();
    let mut config = AppConfig::default();
    config.trial.feedback = false;
    let mut trial = TrialController::new(config, &path);
    assert!(matches!(
        trial.setup(&rig),
        Err(TrialError::Config(ConfigError::NotNormalized { index: 0, .. }))
    ));
    let _ = fs::remove_file(&path);
}

#[test]
fn unreadable_document_fails_setup() {
    let rig = KinematicRig::from_config(&RigConfig::default());
    let path = unique_path("missing.json");
    let mut trial = TrialController::new(AppConfig::default(), &path);
    assert!(matches!(trial.setup(&rig), Err(TrialError::Read { .. })));

    fs::write(&path, "{ not json").unwrap();
    let mut trial = TrialController::new(AppConfig::default(), &path);
    assert!(matches!(trial.setup(&rig), Err(TrialError::Json { .. })));
    let _ = fs::remove_file(&path);
}
