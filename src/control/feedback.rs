//! Descending input to the oscillator network, computed once per control step.
//!
//! Two strategies exist: open loop (no descending input at all) and a
//! sensory feedback path that runs every cable's state through a small
//! feed-forward network to modulate its node's frequency, amplitude and phase.

use crate::body::{CableActuator, Structure};
use crate::control::actuator::ActuatorController;
use crate::core::cpg::{DescendingCommand, FEEDBACK_CHANNELS};
use crate::core::neural::{FeedForwardNet, FeedbackError};

/// Values sensed per cable: relative stretch and centred tension.
pub const CABLE_STATE_WIDTH: usize = 2;

/// Normalized state of one cable, each entry roughly in `[-1, 1]`.
pub fn cable_state<A: CableActuator>(actuator: &A) -> [f64; CABLE_STATE_WIDTH] {
    let start = actuator.start_length();
    let stretch = if start > 0.0 {
        (actuator.current_length() - start) / start
    } else {
        0.0
    };
    let max_tension = actuator.max_tension();
    let tension = if max_tension > 0.0 {
        (actuator.tension() - max_tension / 2.0) / max_tension
    } else {
        0.0
    };
    [stretch, tension]
}

pub trait DescendingStrategy {
    /// Checks the strategy against the controllers it will serve.
    fn on_attach(&mut self, controllers: &[ActuatorController]) -> Result<(), FeedbackError>;

    /// Commands for every node, indexed by node; empty for no input.
    fn on_step<S: Structure>(
        &mut self,
        structure: &S,
        controllers: &[ActuatorController],
    ) -> Result<Vec<DescendingCommand>, FeedbackError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OpenLoop;

impl DescendingStrategy for OpenLoop {
    fn on_attach(&mut self, _controllers: &[ActuatorController]) -> Result<(), FeedbackError> {
        Ok(())
    }

    fn on_step<S: Structure>(
        &mut self,
        _structure: &S,
        _controllers: &[ActuatorController],
    ) -> Result<Vec<DescendingCommand>, FeedbackError> {
        Ok(Vec::new())
    }
}

#[derive(Clone, Debug)]
pub struct FeedbackPath {
    net: FeedForwardNet,
    nodes: usize,
}

impl FeedbackPath {
    pub fn new(net: FeedForwardNet, state_width: usize) -> Result<Self, FeedbackError> {
        if state_width != net.inputs() {
            return Err(FeedbackError::StateWidth {
                configured: state_width,
                network: net.inputs(),
            });
        }
        if net.inputs() != CABLE_STATE_WIDTH {
            return Err(FeedbackError::StateWidth {
                configured: CABLE_STATE_WIDTH,
                network: net.inputs(),
            });
        }
        if net.outputs() != FEEDBACK_CHANNELS {
            return Err(FeedbackError::ActionWidth {
                expected: FEEDBACK_CHANNELS,
                found: net.outputs(),
            });
        }
        Ok(Self { net, nodes: 0 })
    }

    /// Feedback channels for one cable, mapped from sigmoid range to `[-1, 1]`.
    pub fn channels<A: CableActuator>(
        &self,
        actuator: &A,
    ) -> Result<[f64; FEEDBACK_CHANNELS], FeedbackError> {
        let input = cable_state(actuator).map(|s| s / 2.0 + 0.5);
        let output = self.net.forward(&input)?;
        let mut channels = [0.0; FEEDBACK_CHANNELS];
        for (c, y) in channels.iter_mut().zip(output) {
            *c = y * 2.0 - 1.0;
        }
        Ok(channels)
    }
}

impl DescendingStrategy for FeedbackPath {
    fn on_attach(&mut self, controllers: &[ActuatorController]) -> Result<(), FeedbackError> {
        self.nodes = controllers.len();
        Ok(())
    }

    fn on_step<S: Structure>(
        &mut self,
        structure: &S,
        controllers: &[ActuatorController],
    ) -> Result<Vec<DescendingCommand>, FeedbackError> {
        let actuators = structure.actuators();
        let mut commands = vec![DescendingCommand::default(); self.nodes];
        for controller in controllers {
            let index = controller.actuator_index();
            let Some(node) = controller.node() else {
                panic!("feedback requested for actuator {index} without a node");
            };
            let Some(actuator) = actuators.get(index) else {
                panic!("controller refers to missing actuator {index}");
            };
            let Some(slot) = commands.get_mut(node) else {
                panic!("node {node} outside the {} attached nodes", self.nodes);
            };
            *slot = DescendingCommand::from_feedback(self.channels(actuator)?);
        }
        Ok(commands)
    }
}

#[derive(Clone, Debug)]
pub enum AnyDescending {
    OpenLoop(OpenLoop),
    Feedback(FeedbackPath),
}

impl DescendingStrategy for AnyDescending {
    fn on_attach(&mut self, controllers: &[ActuatorController]) -> Result<(), FeedbackError> {
        match self {
            AnyDescending::OpenLoop(s) => s.on_attach(controllers),
            AnyDescending::Feedback(s) => s.on_attach(controllers),
        }
    }

    fn on_step<S: Structure>(
        &mut self,
        structure: &S,
        controllers: &[ActuatorController],
    ) -> Result<Vec<DescendingCommand>, FeedbackError> {
        match self {
            AnyDescending::OpenLoop(s) => s.on_step(structure, controllers),
            AnyDescending::Feedback(s) => s.on_step(structure, controllers),
        }
    }
}

impl AnyDescending {
    /// `net` is required when feedback is enabled and ignored otherwise.
    pub fn from_config(
        feedback: bool,
        net: Option<FeedForwardNet>,
        state_width: usize,
    ) -> Result<Self, FeedbackError> {
        match (feedback, net) {
            (true, Some(net)) => Ok(AnyDescending::Feedback(FeedbackPath::new(net, state_width)?)),
            (true, None) => Err(FeedbackError::MissingNetwork),
            (false, _) => Ok(AnyDescending::OpenLoop(OpenLoop)),
        }
    }

    pub fn is_feedback(&self) -> bool {
        matches!(self, AnyDescending::Feedback(_))
    }
}
