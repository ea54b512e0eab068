// src/motion/mod.rs
pub mod block;
pub mod coordinates;
pub mod junction;
pub mod kinematics;
pub mod planner;
pub mod trapezoid;

pub use block::{MOTION_BUFFER_SIZE, MotionBlock, MotionBuffer, SharedMotionBuffer, shared_motion_buffer};
pub use coordinates::{
    AxisCoordinates, DirectionBits, MACHINE_NUM_AXIS, MACHINE_NUM_EXTRUDER, NUM_STEPPERS,
    StepperCoordinates, WorldCoordinates,
};
pub use junction::JerkControl;
pub use kinematics::{DeltaGeometry, Kinematics, KinematicsType, create_kinematics};
pub use planner::{MOTIONPLANNER_MINIMUM_SEGMENT_SIZE, MotionPlanner};

use thiserror::Error;

use crate::ring_buffer::RingBufferError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    #[error("Kinematics error: {0}")]
    Kinematics(String),
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Motion aborted by emergency stop")]
    Aborted,
    #[error("Motion buffer lock poisoned")]
    BufferPoisoned,
    #[error("Motion buffer error: {0}")]
    Buffer(#[from] RingBufferError),
}
