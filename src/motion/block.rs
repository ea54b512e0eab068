// src/motion/block.rs

use std::sync::{Arc, Mutex};

use crate::motion::coordinates::StepperCoordinates;
use crate::ring_buffer::RingBuffer;

pub const MOTION_BUFFER_SIZE: usize = 32;

/// A planned linear move, ready for the stepper consumer.
///
/// Speeds are step events per second of the limiting stepper, acceleration is
/// step events per second squared. Only the look-ahead passes touch a block
/// after it has been enqueued, and only its entry/exit speeds and trapezoid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionBlock {
    pub steps: StepperCoordinates,
    pub step_event_count: u32,
    /// Path length in mm (XYZ, or |E| for extrude-only moves).
    pub millimeters: f64,
    /// Requested path speed after limiting, mm/s.
    pub nominal_feedrate: f64,
    pub nominal_speed: f64,
    pub acceleration: f64,
    /// Junction limit for the entry speed.
    pub max_entry_speed: f64,
    pub entry_speed: f64,
    pub exit_speed: f64,
    /// Peak speed actually reached; below `nominal_speed` when the block is too short.
    pub cruise_speed: f64,
    pub accelerate_until: u32,
    pub decelerate_after: u32,
    /// Nominal speed is reachable from any entry speed within this block.
    pub nominal_length: bool,
    pub recalculate: bool,
    pub active_extruder: u8,
}

impl MotionBlock {
    /// Step events per mm of path, converts between mm/s and steps/s.
    pub fn steps_per_mm(&self) -> f64 {
        if self.millimeters > 0.0 {
            f64::from(self.step_event_count) / self.millimeters
        } else {
            0.0
        }
    }

    /// Execution time of the trapezoid in seconds.
    pub fn duration(&self) -> f64 {
        let cruise = self.cruise_speed;
        if cruise <= 0.0 {
            return 0.0;
        }
        let accelerate_steps = f64::from(self.accelerate_until);
        let plateau_steps = f64::from(self.decelerate_after.saturating_sub(self.accelerate_until));
        let decelerate_steps = f64::from(self.step_event_count.saturating_sub(self.decelerate_after));

        let ramp = |from: f64, steps: f64| {
            if steps == 0.0 {
                0.0
            } else if (cruise - from).abs() > f64::EPSILON && self.acceleration > 0.0 {
                (cruise - from).abs() / self.acceleration
            } else {
                steps / cruise
            }
        };

        ramp(self.entry_speed, accelerate_steps)
            + plateau_steps / cruise
            + ramp(self.exit_speed, decelerate_steps)
    }
}

pub type MotionBuffer<const N: usize = MOTION_BUFFER_SIZE> = RingBuffer<MotionBlock, N>;

/// Motion buffer shared by the planner (producer) and the stepper (consumer).
/// Holding the lock is the critical section.
pub type SharedMotionBuffer<const N: usize = MOTION_BUFFER_SIZE> = Arc<Mutex<MotionBuffer<N>>>;

pub fn shared_motion_buffer<const N: usize>() -> SharedMotionBuffer<N> {
    Arc::new(Mutex::new(MotionBuffer::<N>::new()))
}
