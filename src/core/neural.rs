//! Fixed-weight feed-forward network (one sigmoid hidden layer).
//!
//! Weights are laid out unit by unit: for every hidden unit its input
//! weights followed by its bias, then for every output unit its hidden
//! weights followed by its bias.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("configured state width {configured} does not match network input width {network}")]
    StateWidth { configured: usize, network: usize },
    #[error("network produces {found} outputs, feedback needs {expected}")]
    ActionWidth { expected: usize, found: usize },
    #[error("layer widths must be non-zero ({inputs}-{hidden}-{outputs})")]
    EmptyLayer {
        inputs: usize,
        hidden: usize,
        outputs: usize,
    },
    #[error("{inputs}-{hidden}-{outputs} network needs {expected} weights, found {found}")]
    WeightCount {
        inputs: usize,
        hidden: usize,
        outputs: usize,
        expected: usize,
        found: usize,
    },
    #[error("failed to read weight file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("weight file {}: cannot parse {token:?}", path.display())]
    Parse { path: PathBuf, token: String },
    #[error("network input has {found} values, expected {expected}")]
    InputWidth { expected: usize, found: usize },
    #[error("feedback is enabled but no network is configured")]
    MissingNetwork,
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedForwardNet {
    inputs: usize,
    hidden: usize,
    outputs: usize,
    input_hidden: Vec<f64>,
    hidden_output: Vec<f64>,
}

impl FeedForwardNet {
    pub fn weight_count(inputs: usize, hidden: usize, outputs: usize) -> usize {
        (inputs + 1) * hidden + (hidden + 1) * outputs
    }

    pub fn from_flat(
        inputs: usize,
        hidden: usize,
        outputs: usize,
        weights: &[f64],
    ) -> Result<Self, FeedbackError> {
        if inputs == 0 || hidden == 0 || outputs == 0 {
            return Err(FeedbackError::EmptyLayer {
                inputs,
                hidden,
                outputs,
            });
        }
        let expected = Self::weight_count(inputs, hidden, outputs);
        if weights.len() != expected {
            return Err(FeedbackError::WeightCount {
                inputs,
                hidden,
                outputs,
                expected,
                found: weights.len(),
            });
        }
        let split = (inputs + 1) * hidden;
        Ok(Self {
            inputs,
            hidden,
            outputs,
            input_hidden: weights[..split].to_vec(),
            hidden_output: weights[split..].to_vec(),
        })
    }

    /// Loads comma or whitespace separated weights from a text file.
    pub fn load(
        path: &Path,
        inputs: usize,
        hidden: usize,
        outputs: usize,
    ) -> Result<Self, FeedbackError> {
        let text = fs::read_to_string(path).map_err(|source| FeedbackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let weights = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(|tok| {
                tok.parse::<f64>().map_err(|_| FeedbackError::Parse {
                    path: path.to_path_buf(),
                    token: tok.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_flat(inputs, hidden, outputs, &weights)
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn hidden(&self) -> usize {
        self.hidden
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Forward pass; every output lies in (0, 1).
    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>, FeedbackError> {
        if input.len() != self.inputs {
            return Err(FeedbackError::InputWidth {
                expected: self.inputs,
                found: input.len(),
            });
        }
        let hidden: Vec<f64> = self
            .input_hidden
            .chunks_exact(self.inputs + 1)
            .map(|w| {
                let (w_in, bias) = w.split_at(self.inputs);
                let sum: f64 = w_in.iter().zip(input).map(|(w, x)| w * x).sum();
                sigmoid(sum + bias[0])
            })
            .collect();
        Ok(self
            .hidden_output
            .chunks_exact(self.hidden + 1)
            .map(|w| {
                let (w_h, bias) = w.split_at(self.hidden);
                let sum: f64 = w_h.iter().zip(&hidden).map(|(w, h)| w * h).sum();
                sigmoid(sum + bias[0])
            })
            .collect())
    }
}
