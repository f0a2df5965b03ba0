//! Oscillator phase arithmetic in radians.

use std::f64::consts::{PI, TAU};

/// Wraps into `[0, 2π)`.
#[inline]
pub fn wrap_0_tau(x: f64) -> f64 {
    let w = x.rem_euclid(TAU);
    // rem_euclid rounds up to exactly TAU for tiny negative inputs.
    if w >= TAU { 0.0 } else { w }
}

/// Wraps into `[-π, π)`.
#[inline]
pub fn wrap_pm_pi(x: f64) -> f64 {
    wrap_0_tau(x + PI) - PI
}

/// Signed lead of phase `a` over phase `b`, in `[-π, π)`.
#[inline]
pub fn phase_offset(a: f64, b: f64) -> f64 {
    wrap_pm_pi(a - b)
}
