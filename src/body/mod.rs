//! Narrow view of the physical structure the controllers drive.
//!
//! Geometry and dynamics live elsewhere; the control core only needs cable
//! readings, a motor interface and centre-of-mass queries.

pub mod rig;

pub type Vec3 = [f64; 3];

/// Opaque identity of a rigid body, compared by equality only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

/// Per-motor-step record kept by an actuator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActuatorHistory {
    pub tensions: Vec<f64>,
    pub rest_lengths: Vec<f64>,
}

impl ActuatorHistory {
    pub fn record(&mut self, tension: f64, rest_length: f64) {
        self.tensions.push(tension);
        self.rest_lengths.push(rest_length);
    }

    pub fn len(&self) -> usize {
        self.tensions.len().min(self.rest_lengths.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One motorised cable.
pub trait CableActuator {
    fn current_length(&self) -> f64;
    fn start_length(&self) -> f64;
    fn tension(&self) -> f64;
    fn max_tension(&self) -> f64;
    /// Bodies the first and last anchors attach to.
    fn endpoints(&self) -> (BodyHandle, BodyHandle);
    /// Lets the motor catch up on its current command.
    fn move_motors(&mut self, dt: f64);
    /// Sets a new tension target and advances the motor by `dt`.
    fn command_tension(&mut self, tension: f64, dt: f64);
    fn history(&self) -> &ActuatorHistory;
}

/// The structure as seen by the trial.
pub trait Structure {
    type Actuator: CableActuator;

    fn actuators(&self) -> &[Self::Actuator];
    fn actuators_mut(&mut self) -> &mut [Self::Actuator];
    /// Centre of mass of one tracked body group.
    fn segment_com(&self, segment: usize) -> Option<Vec3>;
    /// Centre of mass of the whole structure.
    fn com(&self) -> Vec3;
    /// Advances the physical model by `dt`.
    fn step(&mut self, dt: f64);
}
