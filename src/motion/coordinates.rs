// src/motion/coordinates.rs
//! Position types used by the planner: world space in millimetres, axis space
//! in absolute steps, and per-block step magnitudes with direction bits.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::motion::MotionError;

pub const MACHINE_NUM_AXIS: usize = 3;
pub const MACHINE_NUM_EXTRUDER: usize = 1;
/// Axis steppers come first, extruder steppers follow.
pub const NUM_STEPPERS: usize = MACHINE_NUM_AXIS + MACHINE_NUM_EXTRUDER;

const _: () = assert!(MACHINE_NUM_AXIS <= 3, "at most three machine axes are supported");
const _: () = assert!(MACHINE_NUM_EXTRUDER >= 1, "at least one extruder is required");
const _: () = assert!(NUM_STEPPERS <= 8, "direction bits are stored in a u8");

/// Requested head position. `x`, `y`, `z` are absolute millimetres, `e` is
/// relative filament length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldCoordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub e: f64,
}

impl WorldCoordinates {
    pub const fn new(x: f64, y: f64, z: f64, e: f64) -> Self {
        Self { x, y, z, e }
    }

    pub const fn from_xyz(xyz: [f64; 3], e: f64) -> Self {
        Self { x: xyz[0], y: xyz[1], z: xyz[2], e }
    }

    pub const fn xyz(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean length of the XYZ part.
    pub fn xyz_length(&self) -> f64 {
        self.xyz().iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.e.is_finite()
    }
}

impl Add for WorldCoordinates {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z, self.e + rhs.e)
    }
}

impl Sub for WorldCoordinates {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z, self.e - rhs.e)
    }
}

impl Mul<f64> for WorldCoordinates {
    type Output = Self;

    fn mul(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor, self.e * factor)
    }
}

/// Integer step positions (or deltas) per axis and per extruder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AxisCoordinates {
    pub axis: [i64; MACHINE_NUM_AXIS],
    pub extruder: [i64; MACHINE_NUM_EXTRUDER],
}

impl AxisCoordinates {
    pub const fn new(axis: [i64; MACHINE_NUM_AXIS], extruder: [i64; MACHINE_NUM_EXTRUDER]) -> Self {
        Self { axis, extruder }
    }

    /// Value for a flat stepper index.
    pub fn stepper(&self, index: usize) -> i64 {
        if index < MACHINE_NUM_AXIS {
            self.axis[index]
        } else {
            self.extruder[index - MACHINE_NUM_AXIS]
        }
    }

    pub fn steppers(&self) -> [i64; NUM_STEPPERS] {
        std::array::from_fn(|i| self.stepper(i))
    }

    pub fn from_steppers(steppers: [i64; NUM_STEPPERS]) -> Self {
        Self {
            axis: std::array::from_fn(|i| steppers[i]),
            extruder: std::array::from_fn(|i| steppers[MACHINE_NUM_AXIS + i]),
        }
    }
}

impl Add for AxisCoordinates {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let (a, b) = (self.steppers(), rhs.steppers());
        Self::from_steppers(std::array::from_fn(|i| a[i] + b[i]))
    }
}

impl Sub for AxisCoordinates {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let (a, b) = (self.steppers(), rhs.steppers());
        Self::from_steppers(std::array::from_fn(|i| a[i] - b[i]))
    }
}

/// One bit per stepper, set means negative direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DirectionBits(u8);

impl DirectionBits {
    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub fn set_negative(&mut self, stepper: usize) {
        self.0 |= 1 << stepper;
    }

    pub const fn is_negative(&self, stepper: usize) -> bool {
        self.0 & (1 << stepper) != 0
    }

    pub const fn sign(&self, stepper: usize) -> i64 {
        if self.is_negative(stepper) { -1 } else { 1 }
    }
}

/// Unsigned step magnitudes, sign carried in `direction_bits`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StepperCoordinates {
    pub steps: [u32; NUM_STEPPERS],
    pub direction_bits: DirectionBits,
}

impl StepperCoordinates {
    /// Fails when a stepper would travel more than `u32::MAX` steps.
    pub fn from_delta(delta: &AxisCoordinates) -> Result<Self, MotionError> {
        let mut direction_bits = DirectionBits::default();
        let mut steps = [0u32; NUM_STEPPERS];
        for (i, value) in delta.steppers().into_iter().enumerate() {
            if value < 0 {
                direction_bits.set_negative(i);
            }
            steps[i] = u32::try_from(value.unsigned_abs()).map_err(|_| {
                MotionError::InvalidMove(format!("stepper {i} delta of {value} steps does not fit in one block"))
            })?;
        }
        Ok(Self { steps, direction_bits })
    }

    /// Steps of the longest-travelling stepper.
    pub fn step_event_count(&self) -> u32 {
        self.steps.iter().copied().max().unwrap_or(0)
    }

    pub fn extruder_steps(&self) -> u32 {
        self.steps[MACHINE_NUM_AXIS..].iter().copied().max().unwrap_or(0)
    }

    /// Signed delta for one stepper.
    pub fn signed(&self, stepper: usize) -> i64 {
        self.direction_bits.sign(stepper) * i64::from(self.steps[stepper])
    }
}
