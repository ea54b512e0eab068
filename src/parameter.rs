// src/parameter.rs
//! Machine constants read by the planner. Built once from the configuration
//! and shared read-only.

use crate::motion::coordinates::{MACHINE_NUM_AXIS, MACHINE_NUM_EXTRUDER, NUM_STEPPERS};
use crate::motion::junction::JerkControl;

pub const PARAMETER_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub version: u8,
    pub axis_steps_per_unit: [f64; MACHINE_NUM_AXIS],
    pub extruder_steps_per_unit: [f64; MACHINE_NUM_EXTRUDER],
    /// Flow multiplier per extruder, percent.
    pub extrude_multiplier: [f64; MACHINE_NUM_EXTRUDER],
    /// Floor for moves that extrude, mm/s.
    pub minimum_feedrate: f64,
    /// Floor for travel moves, mm/s.
    pub minimum_travel_feedrate: f64,
    /// Per stepper, mm/s.
    pub max_feedrate: [f64; NUM_STEPPERS],
    /// Per stepper, mm/s².
    pub max_acceleration: [f64; NUM_STEPPERS],
    /// Default path acceleration, mm/s².
    pub acceleration: f64,
    /// mm/s
    pub max_jerk: f64,
    pub segments_per_second: f64,
    pub jerk_control: JerkControl,
}

impl Default for Parameter {
    fn default() -> Self {
        Self {
            version: PARAMETER_VERSION,
            axis_steps_per_unit: [80.0, 80.0, 400.0],
            extruder_steps_per_unit: [93.0],
            extrude_multiplier: [100.0],
            minimum_feedrate: 0.0,
            minimum_travel_feedrate: 0.0,
            max_feedrate: [300.0, 300.0, 5.0, 25.0],
            max_acceleration: [3000.0, 3000.0, 100.0, 10000.0],
            acceleration: 1000.0,
            max_jerk: 20.0,
            segments_per_second: 200.0,
            jerk_control: JerkControl::Efficient,
        }
    }
}

impl Parameter {
    /// Motor steps per mm of the given stepper (axes first, then extruders).
    pub fn steps_per_unit(&self, stepper: usize) -> f64 {
        if stepper < MACHINE_NUM_AXIS {
            self.axis_steps_per_unit[stepper]
        } else {
            self.extruder_steps_per_unit[stepper - MACHINE_NUM_AXIS]
        }
    }

    /// Steps per mm of requested filament, flow multiplier applied.
    pub fn extruder_steps_per_mm(&self, extruder: usize) -> f64 {
        self.extruder_steps_per_unit[extruder] * self.extrude_multiplier[extruder] / 100.0
    }

    pub fn floor_feedrate(&self, feedrate: f64, extruding: bool) -> f64 {
        if extruding {
            feedrate.max(self.minimum_feedrate)
        } else {
            feedrate.max(self.minimum_travel_feedrate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_per_unit_layout() {
        let parameter = Parameter::default();
        assert_eq!(parameter.steps_per_unit(0), 80.0);
        assert_eq!(parameter.steps_per_unit(2), 400.0);
        assert_eq!(parameter.steps_per_unit(MACHINE_NUM_AXIS), 93.0);
    }

    #[test]
    fn test_floor_feedrate_depends_on_extrusion() {
        let parameter = Parameter {
            minimum_feedrate: 2.0,
            minimum_travel_feedrate: 10.0,
            ..Parameter::default()
        };
        assert_eq!(parameter.floor_feedrate(1.0, true), 2.0);
        assert_eq!(parameter.floor_feedrate(1.0, false), 10.0);
        assert_eq!(parameter.floor_feedrate(50.0, false), 50.0);
    }

    #[test]
    fn test_multiplier_scales_extrusion() {
        let parameter = Parameter {
            extrude_multiplier: [50.0],
            ..Parameter::default()
        };
        assert_eq!(parameter.extruder_steps_per_mm(0), 46.5);
    }
}
