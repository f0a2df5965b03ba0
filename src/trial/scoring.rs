use crate::body::{ActuatorHistory, CableActuator, Vec3};

/// Displacement in the ground plane; y is vertical.
pub fn planar_distance(initial: Vec3, last: Vec3) -> f64 {
    let dx = last[0] - initial[0];
    let dz = last[2] - initial[2];
    (dx * dx + dz * dz).sqrt()
}

/// Work done while the motor shortens the cable; never positive.
///
/// Each step contributes `previous_tension · Δrest_length` when the rest
/// length decreased and nothing otherwise.
pub fn energy(history: &ActuatorHistory) -> f64 {
    let n = history.len();
    (1..n)
        .map(|j| {
            let delta = history.rest_lengths[j] - history.rest_lengths[j - 1];
            history.tensions[j - 1] * delta.min(0.0)
        })
        .sum()
}

pub fn total_energy<A: CableActuator>(actuators: &[A]) -> f64 {
    actuators.iter().map(|a| energy(a.history())).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(samples: &[(f64, f64)]) -> ActuatorHistory {
        let mut h = ActuatorHistory::default();
        for &(t, l) in samples {
            h.record(t, l);
        }
        h
    }

    #[test]
    fn vertical_motion_is_not_distance() {
        assert_eq!(planar_distance([0.0, 0.0, 0.0], [3.0, 100.0, 4.0]), 5.0);
    }

    #[test]
    fn lengthening_costs_nothing() {
        let h = history(&[(100.0, 1.0), (200.0, 1.1), (300.0, 1.3), (50.0, 1.4)]);
        assert_eq!(energy(&h), 0.0);
    }

    #[test]
    fn shortening_uses_previous_tension() {
        let h = history(&[(100.0, 2.0), (200.0, 1.5), (300.0, 1.75), (400.0, 1.25)]);
        // 100 * -0.5 + 0 + 300 * -0.5
        assert_eq!(energy(&h), -200.0);
    }

    #[test]
    fn short_histories_are_zero() {
        assert_eq!(energy(&ActuatorHistory::default()), 0.0);
        assert_eq!(energy(&history(&[(10.0, 1.0)])), 0.0);
    }
}
