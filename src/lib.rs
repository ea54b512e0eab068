// src/lib.rs
//! Motion planning core of a 3D printer firmware: fixed-size ring buffers,
//! the move planner with jerk-limited junctions and look-ahead, and the
//! motion buffer handed to the stepper.

pub mod config;
pub mod gcode;
pub mod motion;
pub mod parameter;
pub mod print_job;
pub mod ring_buffer;
pub mod scheduler;
pub mod simulator;

pub use config::{Config, ConfigError, load_config};
pub use motion::{MotionError, MotionPlanner};
pub use parameter::Parameter;
pub use ring_buffer::{IterEnd, RingBuffer, RingBufferError};
