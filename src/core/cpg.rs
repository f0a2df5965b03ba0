//! Coupled phase/radius oscillator network (one node per actuator).
//!
//! Each node follows
//!
//! ```text
//! dφ_i/dt = 2π·ω_i + g_φ·u_φ + Σ_j w_ij · sin(φ_j − φ_i − b_ij)
//! dr_i/dt = c_r · (R_i − r_i)
//! ```
//!
//! where `ω_i` and `R_i` come from the node's offset/scale parameters and the
//! descending command, optionally shifted by feedback modulation. The system
//! is advanced with classical fourth-order Runge-Kutta; the control interval
//! can be as coarse as 0.1 s, so a single Euler step is not enough.

use crate::config::CpgConfig;
use crate::core::edges::EdgeParams;
use crate::core::phase::wrap_0_tau;
use std::f64::consts::TAU;
use thiserror::Error;
use tracing::warn;

/// Feedback modulation channels per node: frequency, amplitude, phase.
pub const FEEDBACK_CHANNELS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CpgError {
    #[error("network is integrating; nodes can no longer be added")]
    Sealed,
    #[error("node {0} does not exist")]
    UnknownNode(usize),
    #[error("connections for node {0} are already defined")]
    AlreadyConnected(usize),
    #[error("node {0} cannot couple to itself")]
    SelfCoupling(usize),
    #[error("node {node}: {neighbors} neighbours, {weights} weights, {phases} phase biases")]
    ConnectionShape {
        node: usize,
        neighbors: usize,
        weights: usize,
        phases: usize,
    },
    #[error("invalid node parameters: {0}")]
    InvalidParams(String),
    #[error("expected {expected} descending commands, got {found}")]
    CommandCount { expected: usize, found: usize },
    #[error("invalid integration step {0}")]
    InvalidStep(f64),
    #[error("node {node} diverged (phase {phase}, radius {radius})")]
    Diverged { node: usize, phase: f64, radius: f64 },
}

/// Gains applied to the feedback modulation channels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeedbackGains {
    pub freq: f64,
    pub amp: f64,
    pub phase: f64,
}

/// Fixed parameter vector of one oscillator node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeParams {
    pub freq_offset: f64,
    pub freq_scale: f64,
    pub radius_offset: f64,
    pub radius_scale: f64,
    pub r_const: f64,
    pub d_min: f64,
    pub d_max: f64,
    pub feedback: FeedbackGains,
}

impl NodeParams {
    /// Offset and scale are both seeded from the scaled frequency/amplitude.
    pub fn from_scaled(freq: f64, amp: f64, cpg: &CpgConfig) -> Self {
        Self {
            freq_offset: freq,
            freq_scale: freq,
            radius_offset: amp,
            radius_scale: amp,
            r_const: cpg.r_const,
            d_min: cpg.d_min,
            d_max: cpg.d_max,
            feedback: FeedbackGains::default(),
        }
    }

    pub fn with_feedback(mut self, gains: FeedbackGains) -> Self {
        self.feedback = gains;
        self
    }

    fn validate(&self) -> Result<(), CpgError> {
        let values = [
            self.freq_offset,
            self.freq_scale,
            self.radius_offset,
            self.radius_scale,
            self.r_const,
            self.d_min,
            self.d_max,
            self.feedback.freq,
            self.feedback.amp,
            self.feedback.phase,
        ];
        if values.iter().any(|v| v.is_nan()) {
            return Err(CpgError::InvalidParams("NaN parameter".to_string()));
        }
        if self.r_const < 0.0 {
            return Err(CpgError::InvalidParams(format!(
                "negative r_const {}",
                self.r_const
            )));
        }
        if self.d_min > self.d_max {
            return Err(CpgError::InvalidParams(format!(
                "d_min {} above d_max {}",
                self.d_min, self.d_max
            )));
        }
        Ok(())
    }
}

/// Per-node input for one integration step.
///
/// `level` is the classic descending command (bounded by `[d_min, d_max]`);
/// `freq`, `amp` and `phase` are feedback modulation in `[-1, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DescendingCommand {
    pub level: f64,
    pub freq: f64,
    pub amp: f64,
    pub phase: f64,
}

impl DescendingCommand {
    pub fn from_feedback(channels: [f64; FEEDBACK_CHANNELS]) -> Self {
        Self {
            level: 0.0,
            freq: channels[0],
            amp: channels[1],
            phase: channels[2],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeState {
    /// Phase in [0, 2π).
    pub phase: f64,
    /// Radius, never negative.
    pub radius: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Coupling {
    neighbor: usize,
    weight: f64,
    phase_bias: f64,
}

#[derive(Clone, Debug)]
pub struct OscillatorNode {
    params: NodeParams,
    state: NodeState,
    couplings: Vec<Coupling>,
    connected: bool,
}

impl OscillatorNode {
    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn neighbors(&self) -> impl Iterator<Item = usize> + '_ {
        self.couplings.iter().map(|c| c.neighbor)
    }

    /// Drive value `r · sin(φ)`.
    pub fn value(&self) -> f64 {
        self.state.radius * self.state.phase.sin()
    }

    /// Angular velocity (rad/s), target radius and convergence rate for a command.
    fn targets(&self, cmd: &DescendingCommand) -> (f64, f64, f64) {
        let p = &self.params;
        if cmd.level < p.d_min || cmd.level > p.d_max {
            return (0.0, 0.0, p.r_const);
        }
        let freq = p.freq_offset + p.freq_scale * cmd.level + p.feedback.freq * cmd.freq;
        let radius = p.radius_offset + p.radius_scale * cmd.level + p.feedback.amp * cmd.amp;
        let omega = TAU * freq + p.feedback.phase * cmd.phase;
        (omega, radius.max(0.0), p.r_const)
    }
}

/// Owns all node state and the fixed coupling topology.
#[derive(Clone, Debug, Default)]
pub struct OscillatorNetwork {
    nodes: Vec<OscillatorNode>,
    sealed: bool,
    steps: u64,
}

impl OscillatorNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True once the first integration step has run.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn node(&self, index: usize) -> Option<&OscillatorNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[OscillatorNode] {
        &self.nodes
    }

    /// Appends a node and returns its index (0, 1, 2, ..).
    pub fn add_node(&mut self, params: NodeParams) -> Result<usize, CpgError> {
        if self.sealed {
            return Err(CpgError::Sealed);
        }
        params.validate()?;
        let index = self.nodes.len();
        self.nodes.push(OscillatorNode {
            params,
            state: NodeState::default(),
            couplings: Vec::new(),
            connected: false,
        });
        Ok(index)
    }

    /// Overrides a node's initial condition; the phase is wrapped into [0, 2π).
    pub fn set_state(&mut self, index: usize, phase: f64, radius: f64) -> Result<(), CpgError> {
        let node = self
            .nodes
            .get_mut(index)
            .ok_or(CpgError::UnknownNode(index))?;
        if !phase.is_finite() || !radius.is_finite() {
            return Err(CpgError::InvalidParams(format!(
                "non-finite initial state for node {index}"
            )));
        }
        node.state = NodeState {
            phase: wrap_0_tau(phase),
            radius: radius.max(0.0),
        };
        Ok(())
    }

    /// Records one node's coupled neighbours; callable once per node.
    pub fn define_connections(
        &mut self,
        index: usize,
        neighbors: &[usize],
        weights: &[f64],
        phase_biases: &[f64],
    ) -> Result<(), CpgError> {
        if neighbors.len() != weights.len() || neighbors.len() != phase_biases.len() {
            return Err(CpgError::ConnectionShape {
                node: index,
                neighbors: neighbors.len(),
                weights: weights.len(),
                phases: phase_biases.len(),
            });
        }
        let count = self.nodes.len();
        if let Some(&bad) = neighbors.iter().find(|&&n| n >= count) {
            return Err(CpgError::UnknownNode(bad));
        }
        if neighbors.contains(&index) {
            return Err(CpgError::SelfCoupling(index));
        }
        let node = self
            .nodes
            .get_mut(index)
            .ok_or(CpgError::UnknownNode(index))?;
        if node.connected {
            return Err(CpgError::AlreadyConnected(index));
        }
        node.couplings = neighbors
            .iter()
            .zip(weights.iter().zip(phase_biases))
            .map(|(&neighbor, (&weight, &phase_bias))| Coupling {
                neighbor,
                weight,
                phase_bias,
            })
            .collect();
        node.connected = true;
        Ok(())
    }

    /// Coupling seen from `from` towards `to`, if any.
    pub fn coupling(&self, from: usize, to: usize) -> Option<EdgeParams> {
        self.nodes
            .get(from)?
            .couplings
            .iter()
            .find(|c| c.neighbor == to)
            .map(|c| EdgeParams {
                weight: c.weight,
                phase: c.phase_bias,
            })
    }

    /// Current drive value of node `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a node of this network.
    pub fn cpg_value(&self, index: usize) -> f64 {
        self.nodes[index].value()
    }

    fn derivatives(
        &self,
        targets: &[(f64, f64, f64)],
        phases: &[f64],
        radii: &[f64],
        d_phase: &mut [f64],
        d_radius: &mut [f64],
    ) {
        for (i, node) in self.nodes.iter().enumerate() {
            let (omega, radius_target, r_const) = targets[i];
            let coupling: f64 = node
                .couplings
                .iter()
                .map(|c| c.weight * (phases[c.neighbor] - phases[i] - c.phase_bias).sin())
                .sum();
            d_phase[i] = omega + coupling;
            d_radius[i] = r_const * (radius_target - radii[i]);
        }
    }

    /// Integrates every node forward by `dt`.
    ///
    /// `commands` is either empty (no descending input) or holds one entry
    /// per node. On divergence the previous state is kept and an error is
    /// returned; the caller is expected to abort the episode.
    pub fn update(&mut self, commands: &[DescendingCommand], dt: f64) -> Result<(), CpgError> {
        let n = self.nodes.len();
        if !commands.is_empty() && commands.len() != n {
            return Err(CpgError::CommandCount {
                expected: n,
                found: commands.len(),
            });
        }
        if !dt.is_finite() || dt < 0.0 {
            return Err(CpgError::InvalidStep(dt));
        }
        self.sealed = true;
        if n == 0 || dt == 0.0 {
            return Ok(());
        }

        let idle = DescendingCommand::default();
        let targets: Vec<(f64, f64, f64)> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| node.targets(commands.get(i).unwrap_or(&idle)))
            .collect();

        let phase0: Vec<f64> = self.nodes.iter().map(|nd| nd.state.phase).collect();
        let radius0: Vec<f64> = self.nodes.iter().map(|nd| nd.state.radius).collect();

        // k[stage] = [d_phase, d_radius]
        let mut k: [[Vec<f64>; 2]; 4] = std::array::from_fn(|_| [vec![0.0; n], vec![0.0; n]]);
        let mut phase_tmp = phase0.clone();
        let mut radius_tmp = radius0.clone();

        let stage_scale = [0.5 * dt, 0.5 * dt, dt];
        for stage in 0..4 {
            let [kp, kr] = &mut k[stage];
            self.derivatives(&targets, &phase_tmp, &radius_tmp, kp, kr);
            if stage < 3 {
                let h = stage_scale[stage];
                for i in 0..n {
                    phase_tmp[i] = phase0[i] + h * kp[i];
                    radius_tmp[i] = radius0[i] + h * kr[i];
                }
            }
        }

        let mut next = Vec::with_capacity(n);
        for i in 0..n {
            let phase = phase0[i]
                + dt / 6.0 * (k[0][0][i] + 2.0 * k[1][0][i] + 2.0 * k[2][0][i] + k[3][0][i]);
            let radius = radius0[i]
                + dt / 6.0 * (k[0][1][i] + 2.0 * k[1][1][i] + 2.0 * k[2][1][i] + k[3][1][i]);
            if !phase.is_finite() || !radius.is_finite() {
                warn!(node = i, phase, radius, "oscillator diverged");
                return Err(CpgError::Diverged {
                    node: i,
                    phase,
                    radius,
                });
            }
            next.push(NodeState {
                phase: wrap_0_tau(phase),
                radius: radius.max(0.0),
            });
        }
        for (node, state) in self.nodes.iter_mut().zip(next) {
            node.state = state;
        }
        self.steps += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::phase::phase_offset;

    fn params(freq: f64, amp: f64) -> NodeParams {
        NodeParams::from_scaled(freq, amp, &CpgConfig::default())
    }

    #[test]
    fn add_node_assigns_sequential_indices() {
        let mut net = OscillatorNetwork::new();
        assert_eq!(net.add_node(params(1.0, 1.0)).unwrap(), 0);
        assert_eq!(net.add_node(params(1.0, 1.0)).unwrap(), 1);
        assert_eq!(net.add_node(params(1.0, 1.0)).unwrap(), 2);
        assert_eq!(net.len(), 3);
    }

    #[test]
    fn add_node_after_integration_is_rejected() {
        let mut net = OscillatorNetwork::new();
        net.add_node(params(1.0, 1.0)).unwrap();
        assert!(!net.is_sealed());
        net.update(&[], 0.01).unwrap();
        assert!(net.is_sealed());
        assert_eq!(net.add_node(params(1.0, 1.0)), Err(CpgError::Sealed));
    }

    #[test]
    fn connections_are_defined_once() {
        let mut net = OscillatorNetwork::new();
        net.add_node(params(1.0, 1.0)).unwrap();
        net.add_node(params(1.0, 1.0)).unwrap();
        net.define_connections(0, &[1], &[0.5], &[0.2]).unwrap();
        assert_eq!(
            net.define_connections(0, &[1], &[0.5], &[0.2]),
            Err(CpgError::AlreadyConnected(0))
        );
        assert_eq!(
            net.define_connections(1, &[1], &[0.5], &[0.2]),
            Err(CpgError::SelfCoupling(1))
        );
        assert!(matches!(
            net.define_connections(1, &[0], &[0.5], &[]),
            Err(CpgError::ConnectionShape { .. })
        ));
        assert_eq!(
            net.coupling(0, 1),
            Some(EdgeParams {
                weight: 0.5,
                phase: 0.2
            })
        );
    }

    #[test]
    fn uncoupled_phase_advances_at_base_frequency() {
        let mut net = OscillatorNetwork::new();
        net.add_node(params(0.5, 2.0)).unwrap();
        net.set_state(0, 0.0, 2.0).unwrap();
        let dt = 0.01;
        for _ in 0..100 {
            net.update(&[], dt).unwrap();
        }
        // 0.5 Hz over 1 s is half a cycle.
        let phase = net.node(0).unwrap().state().phase;
        assert!((phase - std::f64::consts::PI).abs() < 1e-9, "phase={phase}");
    }

    #[test]
    fn radius_relaxes_to_amplitude() {
        let mut net = OscillatorNetwork::new();
        net.add_node(params(1.0, 3.0)).unwrap();
        for _ in 0..100 {
            net.update(&[], 0.05).unwrap();
        }
        let r = net.node(0).unwrap().state().radius;
        assert!((r - 3.0).abs() < 1e-6, "radius={r}");
    }

    #[test]
    fn phase_wraps_and_radius_stays_non_negative() {
        let mut net = OscillatorNetwork::new();
        for k in 0..4 {
            let gains = FeedbackGains {
                amp: 2.0,
                ..Default::default()
            };
            net.add_node(params(3.0 + k as f64, 0.5 * k as f64).with_feedback(gains))
                .unwrap();
        }
        let all = [0, 1, 2, 3];
        for i in 0..4 {
            let others: Vec<usize> = all.iter().copied().filter(|&j| j != i).collect();
            net.define_connections(i, &others, &[1.5; 3], &[0.3; 3]).unwrap();
        }
        for step in 0..500 {
            let cmds: Vec<DescendingCommand> = (0..4)
                .map(|i| DescendingCommand {
                    amp: if (step + i) % 2 == 0 { -1.0 } else { 1.0 },
                    ..Default::default()
                })
                .collect();
            net.update(&cmds, 0.1).unwrap();
            for node in net.nodes() {
                let s = node.state();
                assert!((0.0..TAU).contains(&s.phase), "phase {}", s.phase);
                assert!(s.radius >= 0.0, "radius {}", s.radius);
            }
        }
    }

    #[test]
    fn feedback_shifts_target_amplitude() {
        let mut net = OscillatorNetwork::new();
        let gains = FeedbackGains {
            freq: 0.0,
            amp: 2.0,
            phase: 0.0,
        };
        net.add_node(params(1.0, 3.0).with_feedback(gains)).unwrap();
        let cmd = [DescendingCommand::from_feedback([0.0, 0.5, 0.0])];
        for _ in 0..200 {
            net.update(&cmd, 0.05).unwrap();
        }
        let r = net.node(0).unwrap().state().radius;
        assert!((r - 4.0).abs() < 1e-6, "radius={r}");
    }

    #[test]
    fn command_outside_bounds_silences_node() {
        let mut net = OscillatorNetwork::new();
        net.add_node(params(1.0, 3.0)).unwrap();
        net.set_state(0, 1.0, 3.0).unwrap();
        let cmd = [DescendingCommand {
            level: 10.0,
            ..Default::default()
        }];
        for _ in 0..200 {
            net.update(&cmd, 0.05).unwrap();
        }
        let s = net.node(0).unwrap().state();
        assert!((s.phase - 1.0).abs() < 1e-9);
        assert!(s.radius < 1e-6);
    }

    #[test]
    fn coupled_pair_synchronizes() {
        let mut net = OscillatorNetwork::new();
        net.add_node(params(1.0, 1.0)).unwrap();
        net.add_node(params(1.0, 1.0)).unwrap();
        net.define_connections(0, &[1], &[1.0], &[0.0]).unwrap();
        net.define_connections(1, &[0], &[1.0], &[0.0]).unwrap();
        net.set_state(0, 0.3, 1.0).unwrap();
        net.set_state(1, 2.5, 1.0).unwrap();
        for _ in 0..400 {
            net.update(&[], 0.05).unwrap();
        }
        let a = net.node(0).unwrap().state().phase;
        let b = net.node(1).unwrap().state().phase;
        assert!(phase_offset(a, b).abs() < 1e-3, "a={a} b={b}");
    }

    #[test]
    fn extreme_frequency_reports_divergence() {
        let mut net = OscillatorNetwork::new();
        net.add_node(params(1.0, 1.0)).unwrap();
        net.add_node(params(f64::MAX, 1.0)).unwrap();
        let before = net.node(1).unwrap().state();
        let err = net.update(&[], 0.1).unwrap_err();
        assert!(matches!(err, CpgError::Diverged { node: 1, .. }));
        assert_eq!(net.node(1).unwrap().state(), before);
    }

    #[test]
    fn command_count_must_match() {
        let mut net = OscillatorNetwork::new();
        net.add_node(params(1.0, 1.0)).unwrap();
        net.add_node(params(1.0, 1.0)).unwrap();
        assert_eq!(
            net.update(&[DescendingCommand::default()], 0.1),
            Err(CpgError::CommandCount {
                expected: 2,
                found: 1
            })
        );
    }
}
