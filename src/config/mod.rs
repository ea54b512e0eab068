// src/config/mod.rs - Machine configuration loaded from TOML
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::motion::coordinates::{MACHINE_NUM_AXIS, MACHINE_NUM_EXTRUDER, NUM_STEPPERS};
use crate::motion::junction::JerkControl;
use crate::motion::kinematics::{DeltaGeometry, Kinematics, KinematicsType, create_kinematics};
use crate::parameter::{PARAMETER_VERSION, Parameter};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub printer: PrinterConfig,

    #[serde(default)]
    pub motion: MotionConfig,

    #[serde(default)]
    pub axes: AxesConfig,

    #[serde(default = "default_extruders")]
    pub extruders: Vec<ExtruderConfig>,

    #[serde(default)]
    pub delta: DeltaGeometry,

    #[serde(default)]
    pub job: JobConfig,
}

/// Printer base configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PrinterConfig {
    #[serde(default)]
    pub printer_name: String,

    #[serde(default)]
    pub kinematics: KinematicsType,
}

/// Motion limits. Per-stepper arrays list the axes first, then the extruders.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotionConfig {
    #[serde(default = "default_jerk")]
    pub max_jerk: f64,

    #[serde(default = "default_acceleration")]
    pub acceleration: f64,

    #[serde(default = "default_max_acceleration")]
    pub max_acceleration: [f64; NUM_STEPPERS],

    #[serde(default = "default_max_feedrate")]
    pub max_feedrate: [f64; NUM_STEPPERS],

    #[serde(default)]
    pub minimum_feedrate: f64,

    #[serde(default)]
    pub minimum_travel_feedrate: f64,

    #[serde(default = "default_segments_per_second")]
    pub segments_per_second: f64,

    #[serde(default)]
    pub jerk_control: JerkControl,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AxesConfig {
    #[serde(default = "default_axis_steps_per_unit")]
    pub steps_per_unit: [f64; MACHINE_NUM_AXIS],
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtruderConfig {
    #[serde(default = "default_extruder_steps_per_unit")]
    pub steps_per_unit: f64,

    /// Flow multiplier in percent
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

/// Decoded moves for the host to feed through the planner.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    #[serde(default = "default_feedrate")]
    pub default_feedrate: f64,

    #[serde(default)]
    pub moves: Vec<MoveRequest>,
}

/// One decoded move. Omitted axes keep their position, an omitted feedrate
/// keeps the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
    #[serde(default)]
    pub e: f64,
    #[serde(default)]
    pub feedrate: Option<f64>,
}

// Default value functions
fn default_jerk() -> f64 { 20.0 }
fn default_acceleration() -> f64 { 1000.0 }
fn default_max_acceleration() -> [f64; NUM_STEPPERS] { Parameter::default().max_acceleration }
fn default_max_feedrate() -> [f64; NUM_STEPPERS] { Parameter::default().max_feedrate }
fn default_segments_per_second() -> f64 { 200.0 }
fn default_axis_steps_per_unit() -> [f64; MACHINE_NUM_AXIS] { Parameter::default().axis_steps_per_unit }
fn default_extruder_steps_per_unit() -> f64 { 93.0 }
fn default_multiplier() -> f64 { 100.0 }
fn default_feedrate() -> f64 { 50.0 }
fn default_extruders() -> Vec<ExtruderConfig> { vec![ExtruderConfig::default(); MACHINE_NUM_EXTRUDER] }

impl Default for Config {
    fn default() -> Self {
        Self {
            printer: PrinterConfig::default(),
            motion: MotionConfig::default(),
            axes: AxesConfig::default(),
            extruders: default_extruders(),
            delta: DeltaGeometry::default(),
            job: JobConfig::default(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_jerk: default_jerk(),
            acceleration: default_acceleration(),
            max_acceleration: default_max_acceleration(),
            max_feedrate: default_max_feedrate(),
            minimum_feedrate: 0.0,
            minimum_travel_feedrate: 0.0,
            segments_per_second: default_segments_per_second(),
            jerk_control: JerkControl::default(),
        }
    }
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self { steps_per_unit: default_axis_steps_per_unit() }
    }
}

impl Default for ExtruderConfig {
    fn default() -> Self {
        Self {
            steps_per_unit: default_extruder_steps_per_unit(),
            multiplier: default_multiplier(),
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            default_feedrate: default_feedrate(),
            moves: Vec::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
            }
        };

        for (axis, steps) in self.axes.steps_per_unit.iter().enumerate() {
            positive(&format!("axes.steps_per_unit[{axis}]"), *steps)?;
        }
        if self.extruders.len() != MACHINE_NUM_EXTRUDER {
            return Err(ConfigError::Invalid(format!(
                "expected {} extruders, found {}",
                MACHINE_NUM_EXTRUDER,
                self.extruders.len()
            )));
        }
        for (index, extruder) in self.extruders.iter().enumerate() {
            positive(&format!("extruders[{index}].steps_per_unit"), extruder.steps_per_unit)?;
            positive(&format!("extruders[{index}].multiplier"), extruder.multiplier)?;
        }
        for stepper in 0..NUM_STEPPERS {
            positive(&format!("motion.max_feedrate[{stepper}]"), self.motion.max_feedrate[stepper])?;
            positive(&format!("motion.max_acceleration[{stepper}]"), self.motion.max_acceleration[stepper])?;
        }
        positive("motion.max_jerk", self.motion.max_jerk)?;
        positive("motion.acceleration", self.motion.acceleration)?;
        positive("motion.segments_per_second", self.motion.segments_per_second)?;
        if self.motion.minimum_feedrate < 0.0 || self.motion.minimum_travel_feedrate < 0.0 {
            return Err(ConfigError::Invalid("minimum feedrates must not be negative".to_string()));
        }
        if self.printer.kinematics == KinematicsType::Delta {
            positive("delta.diagonal_rod", self.delta.diagonal_rod)?;
            positive("delta.radius", self.delta.radius)?;
            if self.delta.radius >= self.delta.diagonal_rod {
                return Err(ConfigError::Invalid("delta.radius must be shorter than delta.diagonal_rod".to_string()));
            }
        }
        positive("job.default_feedrate", self.job.default_feedrate)?;
        Ok(())
    }

    /// Machine constants for the planner.
    pub fn parameter(&self) -> Result<Parameter, ConfigError> {
        self.validate()?;
        Ok(Parameter {
            version: PARAMETER_VERSION,
            axis_steps_per_unit: self.axes.steps_per_unit,
            extruder_steps_per_unit: std::array::from_fn(|i| self.extruders[i].steps_per_unit),
            extrude_multiplier: std::array::from_fn(|i| self.extruders[i].multiplier),
            minimum_feedrate: self.motion.minimum_feedrate,
            minimum_travel_feedrate: self.motion.minimum_travel_feedrate,
            max_feedrate: self.motion.max_feedrate,
            max_acceleration: self.motion.max_acceleration,
            acceleration: self.motion.acceleration,
            max_jerk: self.motion.max_jerk,
            segments_per_second: self.motion.segments_per_second,
            jerk_control: self.motion.jerk_control,
        })
    }

    pub fn kinematics(&self) -> Box<dyn Kinematics> {
        create_kinematics(self.printer.kinematics, self.delta)
    }
}

pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let config: Config = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!("Rejected config file '{}': {}", path, e);
        return Err(e);
    }
    tracing::info!("Loaded configuration from {}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.extruders.len(), MACHINE_NUM_EXTRUDER);
        assert_eq!(config.parameter().unwrap(), Parameter::default());
    }

    #[test]
    fn test_validate_rejects_zero_steps() {
        let mut config = Config::default();
        config.axes.steps_per_unit[1] = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_extruder_count() {
        let mut config = Config::default();
        config.extruders.push(ExtruderConfig::default());
        assert!(matches!(config.parameter(), Err(ConfigError::Invalid(_))));
    }
}
