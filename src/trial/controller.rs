use crate::body::{CableActuator, Structure, Vec3};
use crate::config::{AppConfig, ConfigError};
use crate::control::connectivity::connect_all;
use crate::control::{ActuatorController, AnyDescending, DescendingStrategy, ImpedanceController};
use crate::core::clock::{ControlClock, Tick};
use crate::core::cpg::{CpgError, FeedbackGains, NodeParams, OscillatorNetwork};
use crate::core::scaler::{NodeTable, scale_edge_params, scale_node_params};
use crate::trial::params::{ParamsFile, ScoreRecord};
use crate::trial::scoring::{planar_distance, total_energy};
use crate::trial::{AbortReason, StepOutcome, TrialError, TrialScore};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialPhase {
    Uninitialized,
    Setup,
    Running,
    TornDown,
}

/// Per-episode bookkeeping, reset at setup.
#[derive(Clone, Debug, Default)]
pub struct TrialState {
    pub total_time: f64,
    pub ticks: Tick,
    pub control_steps: u64,
    pub initial_segment_com: Vec3,
    pub initial_com: Vec3,
    /// Tracked-segment centre of mass, sampled with the periodic diagnostics.
    pub com_samples: Vec<Vec3>,
    /// Set once the episode is aborted ("bogus"); never cleared.
    pub abort: Option<AbortReason>,
    pub score: Option<TrialScore>,
}

/// Everything setup builds, committed to the trial only when all of it succeeded.
struct Built {
    params: ParamsFile,
    network: OscillatorNetwork,
    controllers: Vec<ActuatorController>,
    strategy: AnyDescending,
}

pub struct TrialController {
    config: AppConfig,
    params_path: PathBuf,
    phase: TrialPhase,
    clock: ControlClock,
    state: TrialState,
    params: Option<ParamsFile>,
    network: Option<OscillatorNetwork>,
    controllers: Vec<ActuatorController>,
    strategy: Option<AnyDescending>,
}

fn node_params(table: &NodeTable, row: usize, config: &AppConfig) -> NodeParams {
    let values = table.row(row);
    let params = NodeParams::from_scaled(values[0], values[1], &config.cpg);
    if config.trial.feedback {
        params.with_feedback(FeedbackGains {
            freq: values[2],
            amp: values[3],
            phase: values[4],
        })
    } else {
        params
    }
}

fn abort_reason(err: CpgError) -> AbortReason {
    match err {
        CpgError::Diverged { node, .. } => AbortReason::Diverged { node },
        other => AbortReason::Fault(other.to_string()),
    }
}

impl TrialController {
    pub fn new(config: AppConfig, params_path: impl Into<PathBuf>) -> Self {
        let clock = ControlClock::new(config.trial.control_interval);
        Self {
            config,
            params_path: params_path.into(),
            phase: TrialPhase::Uninitialized,
            clock,
            state: TrialState::default(),
            params: None,
            network: None,
            controllers: Vec::new(),
            strategy: None,
        }
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &TrialState {
        &self.state
    }

    pub fn is_aborted(&self) -> bool {
        self.state.abort.is_some()
    }

    pub fn network(&self) -> Option<&OscillatorNetwork> {
        self.network.as_ref()
    }

    pub fn controllers(&self) -> &[ActuatorController] {
        &self.controllers
    }

    pub fn strategy(&self) -> Option<&AnyDescending> {
        self.strategy.as_ref()
    }

    /// Reads the parameter file and builds the network and one controller per cable.
    ///
    /// On error nothing is kept and the trial stays `Uninitialized`.
    ///
    /// # Panics
    /// Panics if called more than once.
    pub fn setup<S: Structure>(&mut self, structure: &S) -> Result<(), TrialError> {
        assert_eq!(
            self.phase,
            TrialPhase::Uninitialized,
            "trial setup called twice"
        );
        let built = self.build(structure)?;

        let segment = self.config.trial.segment;
        let initial_segment_com = structure
            .segment_com(segment)
            .ok_or(TrialError::UnknownSegment(segment))?;
        self.state = TrialState {
            initial_segment_com,
            initial_com: structure.com(),
            ..TrialState::default()
        };
        self.clock = ControlClock::new(self.config.trial.control_interval);
        info!(
            params = %self.params_path.display(),
            controllers = built.controllers.len(),
            feedback = built.strategy.is_feedback(),
            "trial set up"
        );
        self.params = Some(built.params);
        self.network = Some(built.network);
        self.controllers = built.controllers;
        self.strategy = Some(built.strategy);
        self.phase = TrialPhase::Setup;
        Ok(())
    }

    fn build<S: Structure>(&self, structure: &S) -> Result<Built, TrialError> {
        let config = &self.config;
        config.validate()?;
        let segment = config.trial.segment;
        if structure.segment_com(segment).is_none() {
            return Err(TrialError::UnknownSegment(segment));
        }

        let params = ParamsFile::read(&self.params_path)?;
        let actuators = structure.actuators();
        let n = actuators.len();
        let feedback = config.trial.feedback;
        let nodes = scale_node_params(
            &params.node_values()?,
            &config.limits.node_ranges(feedback),
            n,
        )?;
        let edges = scale_edge_params(
            &params.edge_values()?,
            config.limits.weight,
            config.limits.phase,
            n,
        )?;
        let net = if feedback {
            let spec = params
                .feedback_spec()?
                .ok_or(ConfigError::MissingSection("feedbackVals.params"))?;
            Some(params.feedback_net(&spec)?)
        } else {
            None
        };
        let mut strategy =
            AnyDescending::from_config(feedback, net, config.feedback.state_width)?;
        let control_length =
            (!config.impedance.use_default).then_some(config.impedance.control_length);
        let impedance = ImpedanceController::from_config(&config.impedance);

        let mut network = OscillatorNetwork::new();
        let mut controllers = Vec::with_capacity(n);
        for (i, actuator) in actuators.iter().enumerate() {
            let mut controller = ActuatorController::new(i, config.trial.control_interval)?;
            controller.on_attach(actuator);
            controller.assign_node(&mut network, node_params(&nodes, i, config))?;
            controllers.push(controller);
        }
        connect_all(&mut network, &mut controllers, &edges)?;
        for controller in &mut controllers {
            controller.setup_control(impedance, control_length)?;
        }
        strategy.on_attach(&controllers)?;

        Ok(Built {
            params,
            network,
            controllers,
            strategy,
        })
    }

    fn abort(state: &mut TrialState, reason: AbortReason) -> StepOutcome {
        warn!(
            tick = state.ticks,
            time = state.total_time,
            ?reason,
            "trial aborted"
        );
        state.abort = Some(reason.clone());
        StepOutcome::Abort(reason)
    }

    /// Advances the trial by one physical tick of length `dt`.
    ///
    /// # Panics
    /// Panics before setup or after teardown.
    pub fn on_step<S: Structure>(&mut self, structure: &mut S, dt: f64) -> StepOutcome {
        assert!(
            matches!(self.phase, TrialPhase::Setup | TrialPhase::Running),
            "trial stepped in phase {:?}",
            self.phase
        );
        self.phase = TrialPhase::Running;
        if let Some(reason) = &self.state.abort {
            return StepOutcome::Abort(reason.clone());
        }
        let (Some(network), Some(strategy)) = (self.network.as_mut(), self.strategy.as_mut())
        else {
            panic!("running trial without a network");
        };

        self.state.ticks += 1;
        self.state.total_time += dt;

        if let Some(elapsed) = self.clock.advance(dt) {
            let commands = match strategy.on_step(&*structure, &self.controllers) {
                Ok(commands) => commands,
                Err(err) => {
                    return Self::abort(&mut self.state, AbortReason::Fault(err.to_string()));
                }
            };
            if let Err(err) = network.update(&commands, elapsed) {
                return Self::abort(&mut self.state, abort_reason(err));
            }
            self.state.control_steps += 1;
        }

        let actuators = structure.actuators_mut();
        for controller in &mut self.controllers {
            let Some(node) = controller.node() else {
                continue;
            };
            let drive = network.cpg_value(node);
            if let Some(actuator) = actuators.get_mut(controller.actuator_index()) {
                controller.on_step(actuator, drive, dt);
            }
        }

        let trial = &self.config.trial;
        if let Some(com) = structure.segment_com(trial.segment) {
            let height = com[1];
            if height > trial.max_height || height < trial.min_height {
                let (min, max) = (trial.min_height, trial.max_height);
                let reason = AbortReason::HeightOutOfRange { height, min, max };
                return Self::abort(&mut self.state, reason);
            }
            if trial.log_every_ticks > 0 && self.state.ticks % trial.log_every_ticks == 0 {
                self.state.com_samples.push(com);
                let tensions: Vec<f64> = structure.actuators().iter().map(|a| a.tension()).collect();
                debug!(
                    tick = self.state.ticks,
                    time = self.state.total_time,
                    com = ?com,
                    ?tensions,
                    "trial diagnostics"
                );
            }
        }
        StepOutcome::Continue
    }

    /// Scores the episode, appends the result to the parameter file and releases everything.
    ///
    /// # Panics
    /// Panics unless the trial was set up and not yet torn down.
    pub fn teardown<S: Structure>(&mut self, structure: &S) -> Result<TrialScore, TrialError> {
        assert!(
            matches!(self.phase, TrialPhase::Setup | TrialPhase::Running),
            "trial torn down in phase {:?}",
            self.phase
        );
        self.phase = TrialPhase::TornDown;

        let final_segment = structure
            .segment_com(self.config.trial.segment)
            .unwrap_or(self.state.initial_segment_com);
        let aborted = self.is_aborted();
        let distance = if aborted {
            self.config.trial.penalty
        } else {
            planar_distance(self.state.initial_segment_com, final_segment)
        };
        let score = TrialScore {
            distance,
            energy: total_energy(structure.actuators()),
            aborted,
            initial_com: self.state.initial_com,
            final_com: structure.com(),
        };
        self.state.score = Some(score);

        for controller in &mut self.controllers {
            controller.detach();
        }
        self.controllers.clear();
        self.network = None;
        self.strategy = None;

        info!(
            distance = score.distance,
            energy = score.energy,
            aborted,
            ticks = self.state.ticks,
            "trial torn down"
        );

        if let Some(mut params) = self.params.take() {
            params.append_score(ScoreRecord {
                distance: score.distance,
                energy: score.energy,
            })?;
            params.append_metrics(score.initial_com, score.final_com)?;
            params.write()?;
        }
        Ok(score)
    }
}
