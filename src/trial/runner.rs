use crate::body::Structure;
use crate::config::ConfigError;
use crate::trial::{StepOutcome, TrialController, TrialError, TrialScore};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpisodeOptions {
    /// Simulated seconds.
    pub duration: f64,
    /// Physical tick length in seconds.
    pub dt: f64,
}

impl Default for EpisodeOptions {
    fn default() -> Self {
        Self {
            duration: 60.0,
            dt: 0.001,
        }
    }
}

impl EpisodeOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "dt",
                reason: format!("must be finite and > 0, got {}", self.dt),
            });
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "duration",
                reason: format!("must be finite and >= 0, got {}", self.duration),
            });
        }
        Ok(())
    }

    pub fn ticks(&self) -> u64 {
        (self.duration / self.dt).round() as u64
    }
}

/// Drives one full episode: setup, physics and control ticks, teardown.
///
/// The structure is stepped before the trial sees each tick. An abort ends
/// the loop early; teardown always runs once setup succeeded.
pub fn run_episode<S: Structure>(
    trial: &mut TrialController,
    structure: &mut S,
    options: EpisodeOptions,
) -> Result<TrialScore, TrialError> {
    options.validate()?;
    trial.setup(structure)?;
    let ticks = options.ticks();
    for tick in 0..ticks {
        structure.step(options.dt);
        if let StepOutcome::Abort(reason) = trial.on_step(structure, options.dt) {
            info!(tick, ?reason, "episode stopped early");
            break;
        }
    }
    trial.teardown(structure)
}
