use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Problems with configuration or with the parameter document; fatal for a trial.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("missing section {0}")]
    MissingSection(&'static str),
    #[error("malformed section {section}: {reason}")]
    Malformed {
        section: &'static str,
        reason: String,
    },
    #[error("{section} holds {found} entries, expected {expected}")]
    Shape {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{section}[{index}] holds {found} values, expected {expected}")]
    ParamCount {
        section: &'static str,
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("{section}[{index}] = {value} is not a normalized value in [0, 1]")]
    NotNormalized {
        section: &'static str,
        index: usize,
        value: f64,
    },
}

/// Inclusive physical range a normalized parameter is mapped onto.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ParamRange {
    pub low: f64,
    pub high: f64,
}

impl ParamRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Affine map from [0, 1] onto [low, high].
    #[inline]
    pub fn scale(&self, normalized: f64) -> f64 {
        normalized * (self.high - self.low) + self.low
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low > self.high {
            return Err(ConfigError::InvalidValue {
                field,
                reason: format!("expected finite low <= high, got [{}, {}]", self.low, self.high),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Seconds between oscillator updates and impedance commands.
    #[serde(default = "TrialConfig::default_control_interval")]
    pub control_interval: f64,
    /// Body group whose centre of mass is tracked for fitness and safety.
    #[serde(default)]
    pub segment: usize,
    #[serde(default = "TrialConfig::default_min_height")]
    pub min_height: f64,
    #[serde(default = "TrialConfig::default_max_height")]
    pub max_height: f64,
    /// Physical ticks between diagnostic samples; 0 disables them.
    #[serde(default = "TrialConfig::default_log_every_ticks")]
    pub log_every_ticks: u64,
    /// Distance reported for aborted trials.
    #[serde(default = "TrialConfig::default_penalty")]
    pub penalty: f64,
    #[serde(default = "TrialConfig::default_feedback")]
    pub feedback: bool,
}

impl TrialConfig {
    fn default_control_interval() -> f64 {
        0.1
    }
    fn default_min_height() -> f64 {
        0.0
    }
    fn default_max_height() -> f64 {
        30.0
    }
    fn default_log_every_ticks() -> u64 {
        100
    }
    fn default_penalty() -> f64 {
        -1.0
    }
    fn default_feedback() -> bool {
        true
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            control_interval: Self::default_control_interval(),
            segment: 0,
            min_height: Self::default_min_height(),
            max_height: Self::default_max_height(),
            log_every_ticks: Self::default_log_every_ticks(),
            penalty: Self::default_penalty(),
            feedback: Self::default_feedback(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "LimitsConfig::default_freq")]
    pub freq: ParamRange,
    #[serde(default = "LimitsConfig::default_amp")]
    pub amp: ParamRange,
    #[serde(default = "LimitsConfig::default_weight")]
    pub weight: ParamRange,
    #[serde(default = "LimitsConfig::default_phase")]
    pub phase: ParamRange,
    #[serde(default = "LimitsConfig::default_freq_feedback")]
    pub freq_feedback: ParamRange,
    #[serde(default = "LimitsConfig::default_amp_feedback")]
    pub amp_feedback: ParamRange,
    #[serde(default = "LimitsConfig::default_phase_feedback")]
    pub phase_feedback: ParamRange,
}

impl LimitsConfig {
    fn default_freq() -> ParamRange {
        ParamRange::new(0.0, 30.0)
    }
    fn default_amp() -> ParamRange {
        ParamRange::new(0.0, 30.0)
    }
    fn default_weight() -> ParamRange {
        ParamRange::new(0.0, 1.0)
    }
    fn default_phase() -> ParamRange {
        ParamRange::new(-PI, PI)
    }
    fn default_freq_feedback() -> ParamRange {
        ParamRange::new(-1.0, 1.0)
    }
    fn default_amp_feedback() -> ParamRange {
        ParamRange::new(-5.0, 5.0)
    }
    fn default_phase_feedback() -> ParamRange {
        ParamRange::new(-PI, PI)
    }

    /// Per-node ranges in parameter-file order.
    pub fn node_ranges(&self, feedback: bool) -> Vec<ParamRange> {
        if feedback {
            vec![
                self.freq,
                self.amp,
                self.freq_feedback,
                self.amp_feedback,
                self.phase_feedback,
            ]
        } else {
            vec![self.freq, self.amp]
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            freq: Self::default_freq(),
            amp: Self::default_amp(),
            weight: Self::default_weight(),
            phase: Self::default_phase(),
            freq_feedback: Self::default_freq_feedback(),
            amp_feedback: Self::default_amp_feedback(),
            phase_feedback: Self::default_phase_feedback(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpgConfig {
    /// Radius convergence rate (1/s).
    #[serde(default = "CpgConfig::default_r_const")]
    pub r_const: f64,
    #[serde(default)]
    pub d_min: f64,
    #[serde(default = "CpgConfig::default_d_max")]
    pub d_max: f64,
}

impl CpgConfig {
    fn default_r_const() -> f64 {
        20.0
    }
    fn default_d_max() -> f64 {
        5.0
    }
}

impl Default for CpgConfig {
    fn default() -> Self {
        Self {
            r_const: Self::default_r_const(),
            d_min: 0.0,
            d_max: Self::default_d_max(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpedanceConfig {
    #[serde(default)]
    pub tension: f64,
    #[serde(default = "ImpedanceConfig::default_k_position")]
    pub k_position: f64,
    #[serde(default = "ImpedanceConfig::default_k_velocity")]
    pub k_velocity: f64,
    /// Use each cable's start length as the impedance baseline.
    #[serde(default = "ImpedanceConfig::default_use_default")]
    pub use_default: bool,
    #[serde(default = "ImpedanceConfig::default_control_length")]
    pub control_length: f64,
}

impl ImpedanceConfig {
    fn default_k_position() -> f64 {
        1000.0
    }
    fn default_k_velocity() -> f64 {
        100.0
    }
    fn default_use_default() -> bool {
        true
    }
    fn default_control_length() -> f64 {
        10.0
    }
}

impl Default for ImpedanceConfig {
    fn default() -> Self {
        Self {
            tension: 0.0,
            k_position: Self::default_k_position(),
            k_velocity: Self::default_k_velocity(),
            use_default: Self::default_use_default(),
            control_length: Self::default_control_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Sensed values per cable fed into the feedback network.
    #[serde(default = "FeedbackConfig::default_state_width")]
    pub state_width: usize,
}

impl FeedbackConfig {
    fn default_state_width() -> usize {
        2
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            state_width: Self::default_state_width(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default = "RigConfig::default_segments")]
    pub segments: usize,
    #[serde(default = "RigConfig::default_cables_per_segment")]
    pub cables_per_segment: usize,
    #[serde(default = "RigConfig::default_segment_spacing")]
    pub segment_spacing: f64,
    #[serde(default = "RigConfig::default_body_height")]
    pub body_height: f64,
    #[serde(default = "RigConfig::default_stiffness")]
    pub stiffness: f64,
    #[serde(default = "RigConfig::default_max_tension")]
    pub max_tension: f64,
    #[serde(default = "RigConfig::default_motor_speed")]
    pub motor_speed: f64,
    /// Body velocity (units/s) applied every step.
    #[serde(default = "RigConfig::default_drift")]
    pub drift: [f64; 3],
}

impl RigConfig {
    fn default_segments() -> usize {
        4
    }
    fn default_cables_per_segment() -> usize {
        2
    }
    fn default_segment_spacing() -> f64 {
        10.0
    }
    fn default_body_height() -> f64 {
        5.0
    }
    fn default_stiffness() -> f64 {
        1000.0
    }
    fn default_max_tension() -> f64 {
        7000.0
    }
    fn default_motor_speed() -> f64 {
        12.0
    }
    fn default_drift() -> [f64; 3] {
        [0.05, 0.0, 0.0]
    }

    /// Number of actuated cables the rig will carry.
    pub fn cable_count(&self) -> usize {
        self.segments.saturating_sub(1) * self.cables_per_segment
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            segments: Self::default_segments(),
            cables_per_segment: Self::default_cables_per_segment(),
            segment_spacing: Self::default_segment_spacing(),
            body_height: Self::default_body_height(),
            stiffness: Self::default_stiffness(),
            max_tension: Self::default_max_tension(),
            motor_speed: Self::default_motor_speed(),
            drift: Self::default_drift(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub trial: TrialConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cpg: CpgConfig,
    #[serde(default)]
    pub impedance: ImpedanceConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub rig: RigConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.trial;
        if !t.control_interval.is_finite() || t.control_interval < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "trial.control_interval",
                reason: format!("must be finite and >= 0, got {}", t.control_interval),
            });
        }
        if !(t.min_height < t.max_height) {
            return Err(ConfigError::InvalidValue {
                field: "trial.min_height",
                reason: format!("must be below max_height ({} >= {})", t.min_height, t.max_height),
            });
        }
        let l = &self.limits;
        l.freq.validate("limits.freq")?;
        l.amp.validate("limits.amp")?;
        l.weight.validate("limits.weight")?;
        l.phase.validate("limits.phase")?;
        l.freq_feedback.validate("limits.freq_feedback")?;
        l.amp_feedback.validate("limits.amp_feedback")?;
        l.phase_feedback.validate("limits.phase_feedback")?;
        if !self.cpg.r_const.is_finite() || self.cpg.r_const < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "cpg.r_const",
                reason: format!("must be finite and >= 0, got {}", self.cpg.r_const),
            });
        }
        if self.cpg.d_min > self.cpg.d_max {
            return Err(ConfigError::InvalidValue {
                field: "cpg.d_min",
                reason: "must not exceed cpg.d_max".to_string(),
            });
        }
        if !self.impedance.use_default && self.impedance.control_length < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "impedance.control_length",
                reason: format!("negative control length {}", self.impedance.control_length),
            });
        }
        if self.feedback.state_width == 0 {
            return Err(ConfigError::InvalidValue {
                field: "feedback.state_width",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        warn!("Failed to parse config {path}: {err}. Using defaults.");
                    }
                },
                Err(err) => {
                    warn!("Failed to read config {path}: {err}. Using defaults.");
                }
            }
            return Self::default();
        }

        // File does not exist: write defaults (commented out) and return them.
        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                let mut commented = String::new();
                for line in text.lines() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        commented.push('\n');
                    } else if trimmed.starts_with('[')
                        && trimmed.ends_with(']')
                        && !trimmed.contains('.')
                    {
                        commented.push_str(line);
                        commented.push('\n');
                    } else {
                        commented.push_str("# ");
                        commented.push_str(line);
                        commented.push('\n');
                    }
                }
                if let Err(err) = fs::write(path_obj, commented) {
                    warn!("Failed to write default config to {path}: {err}");
                }
            }
            Err(err) => {
                warn!("Failed to serialize default config ({err}); continuing with defaults");
            }
        }
        default_cfg
    }
}
