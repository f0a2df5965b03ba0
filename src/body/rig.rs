//! Kinematic stand-in structure: point bodies joined by motorised cables.
//!
//! Bodies translate with a fixed drift and never deform the cables, so cable
//! length stays at its start value; tension follows the motor-driven rest
//! length through a linear spring. Enough to exercise a trial end to end.

use crate::body::{ActuatorHistory, BodyHandle, CableActuator, Structure, Vec3};
use crate::config::RigConfig;

#[derive(Clone, Debug)]
pub struct RigCable {
    from: BodyHandle,
    to: BodyHandle,
    length: f64,
    start_length: f64,
    rest_length: f64,
    target_rest: f64,
    tension: f64,
    stiffness: f64,
    max_tension: f64,
    motor_speed: f64,
    history: ActuatorHistory,
}

impl RigCable {
    fn new(from: BodyHandle, to: BodyHandle, length: f64, cfg: &RigConfig) -> Self {
        Self {
            from,
            to,
            length,
            start_length: length,
            rest_length: length,
            target_rest: length,
            tension: 0.0,
            stiffness: cfg.stiffness,
            max_tension: cfg.max_tension,
            motor_speed: cfg.motor_speed,
            history: ActuatorHistory::default(),
        }
    }

    pub fn rest_length(&self) -> f64 {
        self.rest_length
    }

    fn refresh_tension(&mut self) {
        let stretch = (self.length - self.rest_length).max(0.0);
        self.tension = (self.stiffness * stretch).min(self.max_tension);
    }
}

impl CableActuator for RigCable {
    fn current_length(&self) -> f64 {
        self.length
    }

    fn start_length(&self) -> f64 {
        self.start_length
    }

    fn tension(&self) -> f64 {
        self.tension
    }

    fn max_tension(&self) -> f64 {
        self.max_tension
    }

    fn endpoints(&self) -> (BodyHandle, BodyHandle) {
        (self.from, self.to)
    }

    fn move_motors(&mut self, dt: f64) {
        let max_step = self.motor_speed * dt.max(0.0);
        let delta = (self.target_rest - self.rest_length).clamp(-max_step, max_step);
        self.rest_length += delta;
        self.refresh_tension();
        self.history.record(self.tension, self.rest_length);
    }

    fn command_tension(&mut self, tension: f64, dt: f64) {
        let tension = tension.clamp(0.0, self.max_tension);
        let stiffness = self.stiffness.max(f64::EPSILON);
        self.target_rest = (self.length - tension / stiffness).max(0.0);
        self.move_motors(dt);
    }

    fn history(&self) -> &ActuatorHistory {
        &self.history
    }
}

#[derive(Clone, Debug)]
pub struct KinematicRig {
    bodies: Vec<Vec3>,
    cables: Vec<RigCable>,
    drift: Vec3,
    time: f64,
}

fn distance(a: Vec3, b: Vec3) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

impl KinematicRig {
    /// One body per entry of `bodies`; one cable per `(from, to)` link.
    ///
    /// # Panics
    /// Panics if a link names a body that does not exist.
    pub fn new(bodies: Vec<Vec3>, links: &[(usize, usize)], cfg: &RigConfig) -> Self {
        let cables = links
            .iter()
            .map(|&(from, to)| {
                assert!(from < bodies.len() && to < bodies.len(), "link ({from}, {to}) out of range");
                let length = distance(bodies[from], bodies[to]).max(f64::EPSILON);
                RigCable::new(BodyHandle(from as u32), BodyHandle(to as u32), length, cfg)
            })
            .collect();
        Self {
            bodies,
            cables,
            drift: cfg.drift,
            time: 0.0,
        }
    }

    /// A straight chain of segments with `cables_per_segment` cables between neighbours.
    pub fn from_config(cfg: &RigConfig) -> Self {
        let bodies: Vec<Vec3> = (0..cfg.segments)
            .map(|k| [k as f64 * cfg.segment_spacing, cfg.body_height, 0.0])
            .collect();
        let links: Vec<(usize, usize)> = (1..cfg.segments)
            .flat_map(|k| std::iter::repeat_n((k - 1, k), cfg.cables_per_segment))
            .collect();
        Self::new(bodies, &links, cfg)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_drift(&mut self, drift: Vec3) {
        self.drift = drift;
    }

    /// Moves one body without touching the cables.
    pub fn set_body_position(&mut self, body: usize, position: Vec3) {
        if let Some(b) = self.bodies.get_mut(body) {
            *b = position;
        }
    }
}

impl Structure for KinematicRig {
    type Actuator = RigCable;

    fn actuators(&self) -> &[RigCable] {
        &self.cables
    }

    fn actuators_mut(&mut self) -> &mut [RigCable] {
        &mut self.cables
    }

    fn segment_com(&self, segment: usize) -> Option<Vec3> {
        self.bodies.get(segment).copied()
    }

    fn com(&self) -> Vec3 {
        if self.bodies.is_empty() {
            return [0.0; 3];
        }
        let n = self.bodies.len() as f64;
        let mut sum = [0.0; 3];
        for b in &self.bodies {
            for axis in 0..3 {
                sum[axis] += b[axis];
            }
        }
        sum.map(|s| s / n)
    }

    fn step(&mut self, dt: f64) {
        self.time += dt;
        for b in &mut self.bodies {
            for axis in 0..3 {
                b[axis] += self.drift[axis] * dt;
            }
        }
    }
}
