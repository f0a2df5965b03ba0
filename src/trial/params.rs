//! The parameter/result document shared with the external search.
//!
//! Read once at setup, rewritten once at teardown with one `scores` record
//! and two `metrics` records appended. Everything else in the document is
//! carried through untouched.

use crate::body::Vec3;
use crate::config::ConfigError;
use crate::core::cpg::FEEDBACK_CHANNELS;
use crate::core::neural::FeedForwardNet;
use crate::trial::TrialError;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub distance: f64,
    pub energy: f64,
}

/// Contents of `feedbackVals.params`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSpec {
    pub num_states: usize,
    pub num_actions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_hidden: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neural_filename: Option<String>,
}

impl FeedbackSpec {
    pub fn hidden(&self) -> usize {
        self.num_hidden.unwrap_or(self.num_states * 2)
    }
}

#[derive(Clone, Debug)]
pub struct ParamsFile {
    path: PathBuf,
    root: Map<String, Value>,
}

impl ParamsFile {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, TrialError> {
        let path = path.as_ref().to_path_buf();
        let text = fs::read_to_string(&path).map_err(|source| TrialError::Read {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| TrialError::Json {
            path: path.clone(),
            source,
        })?;
        let Value::Object(root) = value else {
            return Err(ConfigError::Malformed {
                section: "<root>",
                reason: "document is not a JSON object".to_string(),
            }
            .into());
        };
        Ok(Self { path, root })
    }

    /// An in-memory document that will be written to `path`.
    pub fn from_value(path: impl Into<PathBuf>, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(root) => Ok(Self {
                path: path.into(),
                root,
            }),
            _ => Err(ConfigError::Malformed {
                section: "<root>",
                reason: "document is not a JSON object".to_string(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    fn section<T: DeserializeOwned>(
        &self,
        outer: &str,
        name: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        let Some(params) = self.root.get(outer).and_then(|v| v.get("params")) else {
            return Ok(None);
        };
        serde_json::from_value(params.clone())
            .map(Some)
            .map_err(|err| ConfigError::Malformed {
                section: name,
                reason: err.to_string(),
            })
    }

    pub fn node_values(&self) -> Result<Vec<Vec<f64>>, ConfigError> {
        self.section("nodeVals", "nodeVals.params")?
            .ok_or(ConfigError::MissingSection("nodeVals.params"))
    }

    pub fn edge_values(&self) -> Result<Vec<Vec<f64>>, ConfigError> {
        self.section("edgeVals", "edgeVals.params")?
            .ok_or(ConfigError::MissingSection("edgeVals.params"))
    }

    pub fn feedback_spec(&self) -> Result<Option<FeedbackSpec>, ConfigError> {
        self.section("feedbackVals", "feedbackVals.params")
    }

    /// Resolves a path named inside the document against the document's directory.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        self.path
            .parent()
            .map(|dir| dir.join(candidate))
            .unwrap_or_else(|| candidate.to_path_buf())
    }

    /// Builds the feedback network described by `spec`; weights may be inline or in a file.
    pub fn feedback_net(&self, spec: &FeedbackSpec) -> Result<FeedForwardNet, TrialError> {
        if spec.num_actions != FEEDBACK_CHANNELS {
            return Err(ConfigError::InvalidValue {
                field: "feedbackVals.params.numActions",
                reason: format!("expected {FEEDBACK_CHANNELS}, got {}", spec.num_actions),
            }
            .into());
        }
        let hidden = spec.hidden();
        let net = match (&spec.weights, &spec.neural_filename) {
            (Some(weights), _) => {
                FeedForwardNet::from_flat(spec.num_states, hidden, spec.num_actions, weights)?
            }
            (None, Some(file)) => FeedForwardNet::load(
                &self.resolve(file),
                spec.num_states,
                hidden,
                spec.num_actions,
            )?,
            (None, None) => {
                return Err(ConfigError::MissingSection("feedbackVals.params.weights").into());
            }
        };
        Ok(net)
    }

    fn output_section(&mut self, name: &'static str) -> Result<&mut Vec<Value>, ConfigError> {
        let slot = self.root.entry(name).or_insert(Value::Null);
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        slot.as_array_mut().ok_or(ConfigError::Malformed {
            section: name,
            reason: "output section is not an array".to_string(),
        })
    }

    pub fn append_score(&mut self, score: ScoreRecord) -> Result<(), ConfigError> {
        self.output_section("scores")?.push(json!({
            "distance": score.distance,
            "energy": score.energy,
        }));
        Ok(())
    }

    pub fn append_metrics(&mut self, initial: Vec3, last: Vec3) -> Result<(), ConfigError> {
        let metrics = self.output_section("metrics")?;
        metrics.push(json!({
            "initial COM x": initial[0],
            "initial COM y": initial[1],
            "initial COM z": initial[2],
        }));
        metrics.push(json!({
            "final COM x": last[0],
            "final COM y": last[1],
            "final COM z": last[2],
        }));
        Ok(())
    }

    /// Every `scores` record that parses as `{distance, energy}`.
    pub fn scores(&self) -> Vec<ScoreRecord> {
        self.root
            .get("scores")
            .and_then(Value::as_array)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|r| serde_json::from_value(r.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn write(&self) -> Result<(), TrialError> {
        let mut text = serde_json::to_string_pretty(&self.root).map_err(|source| {
            TrialError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        text.push('\n');
        fs::write(&self.path, text).map_err(|source| TrialError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// A fresh normalized candidate for `nodes` controllers.
///
/// With `feedback` set, node rows carry five values and an inline
/// `feedbackVals` block with weights in `[-1, 1]` is included.
pub fn random_document<R: Rng + ?Sized>(
    rng: &mut R,
    nodes: usize,
    feedback: Option<(usize, usize)>,
) -> Value {
    let width = if feedback.is_some() { 5 } else { 2 };
    let node_rows: Vec<Vec<f64>> = (0..nodes)
        .map(|_| (0..width).map(|_| rng.random_range(0.0..=1.0)).collect())
        .collect();
    let edge_rows: Vec<[f64; 2]> = (0..nodes * nodes.saturating_sub(1) / 2)
        .map(|_| [rng.random_range(0.0..=1.0), rng.random_range(0.0..=1.0)])
        .collect();
    let mut doc = json!({
        "nodeVals": { "params": node_rows },
        "edgeVals": { "params": edge_rows },
    });
    if let Some((states, hidden)) = feedback {
        let count = FeedForwardNet::weight_count(states, hidden, FEEDBACK_CHANNELS);
        let weights: Vec<f64> = (0..count).map(|_| rng.random_range(-1.0..=1.0)).collect();
        let spec = FeedbackSpec {
            num_states: states,
            num_actions: FEEDBACK_CHANNELS,
            num_hidden: Some(hidden),
            weights: Some(weights),
            neural_filename: None,
        };
        doc["feedbackVals"] = json!({ "params": spec });
    }
    doc
}
