use crate::body::CableActuator;
use crate::config::ImpedanceConfig;

/// PD-style tension law around a target length and a target velocity.
///
/// ```text
/// T = tension + k_position · (L − L_target) + k_velocity · (v − v_target)
/// ```
///
/// The oscillator drive enters as `v_target`; the result is clamped to
/// `[0, max_tension]` since cables can only pull.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImpedanceController {
    offset_tension: f64,
    k_position: f64,
    k_velocity: f64,
}

impl ImpedanceController {
    pub fn new(offset_tension: f64, k_position: f64, k_velocity: f64) -> Self {
        Self {
            offset_tension,
            k_position,
            k_velocity,
        }
    }

    pub fn from_config(cfg: &ImpedanceConfig) -> Self {
        Self::new(cfg.tension, cfg.k_position, cfg.k_velocity)
    }

    pub fn tension_command(
        &self,
        length: f64,
        target_length: f64,
        velocity: f64,
        target_velocity: f64,
        max_tension: f64,
    ) -> f64 {
        let raw = self.offset_tension
            + self.k_position * (length - target_length)
            + self.k_velocity * (velocity - target_velocity);
        raw.clamp(0.0, max_tension.max(0.0))
    }

    /// Computes the command for `actuator` and moves its motor over `elapsed`.
    pub fn control<A: CableActuator>(
        &self,
        actuator: &mut A,
        elapsed: f64,
        target_length: f64,
        velocity: f64,
        drive: f64,
    ) -> f64 {
        let tension = self.tension_command(
            actuator.current_length(),
            target_length,
            velocity,
            drive,
            actuator.max_tension(),
        );
        actuator.command_tension(tension, elapsed);
        tension
    }
}
