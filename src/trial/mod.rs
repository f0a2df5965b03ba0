//! One evaluation episode: setup from a parameter file, fixed-rate control, scoring.

pub mod controller;
pub mod params;
pub mod runner;
pub mod scoring;

use crate::body::Vec3;
use crate::config::ConfigError;
use crate::core::cpg::CpgError;
use crate::core::neural::FeedbackError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub use controller::{TrialController, TrialPhase, TrialState};
pub use runner::{EpisodeOptions, run_episode};

#[derive(Debug, Error)]
pub enum TrialError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Cpg(#[from] CpgError),
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("structure has no body group {0} to track")]
    UnknownSegment(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum AbortReason {
    Diverged { node: usize },
    HeightOutOfRange { height: f64, min: f64, max: f64 },
    /// Any other failure while computing descending input or integrating.
    Fault(String),
}

/// Result of one physical tick; the driver stops the episode on `Abort`.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Continue,
    Abort(AbortReason),
}

impl StepOutcome {
    pub fn is_abort(&self) -> bool {
        matches!(self, StepOutcome::Abort(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrialScore {
    pub distance: f64,
    pub energy: f64,
    pub aborted: bool,
    pub initial_com: Vec3,
    pub final_com: Vec3,
}
