//! Per-cable control: impedance law, actuator lifecycle, coupling and feedback.

pub mod actuator;
pub mod connectivity;
pub mod feedback;
pub mod impedance;

pub use actuator::{ActuatorController, ActuatorState};
pub use feedback::{AnyDescending, DescendingStrategy};
pub use impedance::ImpedanceController;
