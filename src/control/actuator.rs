//! Per-cable controller binding one actuator to one oscillator node.

use crate::body::{BodyHandle, CableActuator};
use crate::config::ConfigError;
use crate::control::impedance::ImpedanceController;
use crate::core::clock::ControlClock;
use crate::core::cpg::{CpgError, NodeParams, OscillatorNetwork};
use tracing::trace;

/// Lifecycle of an actuator controller; transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActuatorState {
    Unattached,
    Attached,
    Connected,
    Controlling,
    Detached,
}

#[derive(Clone, Debug)]
pub struct ActuatorController {
    actuator: usize,
    state: ActuatorState,
    clock: ControlClock,
    node: Option<usize>,
    bodies: Option<(BodyHandle, BodyHandle)>,
    impedance: Option<ImpedanceController>,
    control_length: f64,
    last_length: f64,
    commanded_tension: f64,
}

impl ActuatorController {
    /// `actuator` is the cable's index in the structure.
    pub fn new(actuator: usize, control_step: f64) -> Result<Self, ConfigError> {
        if !control_step.is_finite() || control_step < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "trial.control_interval",
                reason: format!("negative control step {control_step}"),
            });
        }
        Ok(Self {
            actuator,
            state: ActuatorState::Unattached,
            clock: ControlClock::new(control_step),
            node: None,
            bodies: None,
            impedance: None,
            control_length: 0.0,
            last_length: 0.0,
            commanded_tension: 0.0,
        })
    }

    pub fn actuator_index(&self) -> usize {
        self.actuator
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn node(&self) -> Option<usize> {
        self.node
    }

    pub fn endpoints(&self) -> Option<(BodyHandle, BodyHandle)> {
        self.bodies
    }

    pub fn control_length(&self) -> f64 {
        self.control_length
    }

    pub fn commanded_tension(&self) -> f64 {
        self.commanded_tension
    }

    /// Resolves the cable's endpoint bodies and its default control length.
    pub fn on_attach<A: CableActuator>(&mut self, subject: &A) {
        assert_eq!(
            self.state,
            ActuatorState::Unattached,
            "actuator {} attached twice",
            self.actuator
        );
        self.bodies = Some(subject.endpoints());
        self.control_length = subject.start_length();
        self.last_length = subject.current_length();
        self.state = ActuatorState::Attached;
    }

    /// Registers this controller's node with the network.
    ///
    /// # Panics
    /// Panics if a node was already assigned or the controller is not attached.
    pub fn assign_node(
        &mut self,
        network: &mut OscillatorNetwork,
        params: NodeParams,
    ) -> Result<usize, CpgError> {
        assert!(
            self.node.is_none(),
            "actuator {} already owns node {:?}",
            self.actuator,
            self.node
        );
        assert_eq!(
            self.state,
            ActuatorState::Attached,
            "actuator {} must be attached before node assignment",
            self.actuator
        );
        let index = network.add_node(params)?;
        self.node = Some(index);
        Ok(index)
    }

    /// Two controllers couple iff their cables share an endpoint body.
    ///
    /// # Panics
    /// Panics if either controller is not attached.
    pub fn shares_body(&self, other: &ActuatorController) -> bool {
        let (Some((from, to)), Some((their_from, their_to))) = (self.bodies, other.bodies) else {
            panic!(
                "coupling test between unattached actuators {} and {}",
                self.actuator, other.actuator
            );
        };
        from == their_from || to == their_to || from == their_to || to == their_from
    }

    pub(crate) fn mark_connected(&mut self) {
        assert_eq!(
            self.state,
            ActuatorState::Attached,
            "actuator {} connected out of order",
            self.actuator
        );
        assert!(self.node.is_some(), "actuator {} has no node", self.actuator);
        self.state = ActuatorState::Connected;
    }

    /// Installs the impedance law; `control_length` overrides the cable's start length.
    ///
    /// # Panics
    /// Panics unless the controller is connected and has no impedance law yet.
    pub fn setup_control(
        &mut self,
        impedance: ImpedanceController,
        control_length: Option<f64>,
    ) -> Result<(), ConfigError> {
        assert_eq!(
            self.state,
            ActuatorState::Connected,
            "actuator {} set up before connection",
            self.actuator
        );
        assert!(
            self.impedance.is_none(),
            "actuator {} already has an impedance law",
            self.actuator
        );
        if let Some(length) = control_length {
            if !length.is_finite() || length < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: "impedance.control_length",
                    reason: format!("negative control length {length}"),
                });
            }
            self.control_length = length;
        }
        self.impedance = Some(impedance);
        Ok(())
    }

    /// Advances the motor, issuing a new impedance command once per control step.
    ///
    /// # Panics
    /// Panics unless the controller is connected and has an impedance law.
    pub fn on_step<A: CableActuator>(&mut self, subject: &mut A, drive: f64, dt: f64) {
        assert!(
            matches!(
                self.state,
                ActuatorState::Connected | ActuatorState::Controlling
            ),
            "actuator {} stepped in state {:?}",
            self.actuator,
            self.state
        );
        let Some(impedance) = self.impedance else {
            panic!("actuator {} stepped without an impedance law", self.actuator);
        };
        self.state = ActuatorState::Controlling;

        match self.clock.advance(dt) {
            Some(elapsed) => {
                let length = subject.current_length();
                let velocity = if elapsed > 0.0 {
                    (length - self.last_length) / elapsed
                } else {
                    0.0
                };
                self.commanded_tension =
                    impedance.control(subject, elapsed, self.control_length, velocity, drive);
                self.last_length = length;
                trace!(
                    actuator = self.actuator,
                    drive,
                    tension = self.commanded_tension,
                    "impedance command"
                );
            }
            None => subject.move_motors(dt),
        }
    }

    /// # Panics
    /// Panics unless the controller is connected or controlling.
    pub fn detach(&mut self) {
        assert!(
            matches!(
                self.state,
                ActuatorState::Connected | ActuatorState::Controlling
            ),
            "actuator {} detached in state {:?}",
            self.actuator,
            self.state
        );
        self.state = ActuatorState::Detached;
        self.impedance = None;
    }
}
