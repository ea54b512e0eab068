// src/simulator/mod.rs
//! Stand-in for the stepper interrupt: drains the motion buffer in order and
//! keeps track of where the steppers end up and how long the moves take.

use std::time::Duration;

use crate::motion::block::{MOTION_BUFFER_SIZE, MotionBlock, SharedMotionBuffer};
use crate::motion::coordinates::{AxisCoordinates, NUM_STEPPERS};
use crate::motion::MotionError;

/// Simulation clock
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    pub current_time: Duration,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: Duration) {
        self.current_time += dt;
    }
}

pub struct StepperSimulator<const N: usize = MOTION_BUFFER_SIZE> {
    motion_buffer: SharedMotionBuffer<N>,
    position: [i64; NUM_STEPPERS],
    clock: SimClock,
    executed_blocks: usize,
    step_events: u64,
}

impl<const N: usize> StepperSimulator<N> {
    pub fn new(motion_buffer: SharedMotionBuffer<N>) -> Self {
        Self {
            motion_buffer,
            position: [0; NUM_STEPPERS],
            clock: SimClock::new(),
            executed_blocks: 0,
            step_events: 0,
        }
    }

    /// Starts from a known stepper position instead of zero.
    pub fn with_position(mut self, position: &AxisCoordinates) -> Self {
        self.position = position.steppers();
        self
    }

    /// Pops and executes the oldest block, if any.
    pub fn step(&mut self) -> Result<Option<MotionBlock>, MotionError> {
        let block = {
            let mut buffer = self.motion_buffer.lock().map_err(|_| MotionError::BufferPoisoned)?;
            if buffer.is_empty() {
                return Ok(None);
            }
            buffer.read()?
        };
        self.execute(&block);
        Ok(Some(block))
    }

    /// Executes everything currently buffered, returns the number of blocks run.
    pub fn drain(&mut self) -> Result<usize, MotionError> {
        let mut count = 0;
        while self.step()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    fn execute(&mut self, block: &MotionBlock) {
        for (stepper, position) in self.position.iter_mut().enumerate() {
            *position += block.steps.signed(stepper);
        }
        let duration = block.duration();
        if duration.is_finite() && duration > 0.0 {
            self.clock.advance(Duration::from_secs_f64(duration));
        }
        self.executed_blocks += 1;
        self.step_events += u64::from(block.step_event_count);
        tracing::trace!(
            "Executed block {}: {} events in {:.4}s",
            self.executed_blocks,
            block.step_event_count,
            duration
        );
    }

    pub fn position(&self) -> AxisCoordinates {
        AxisCoordinates::from_steppers(self.position)
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.current_time
    }

    pub fn executed_blocks(&self) -> usize {
        self.executed_blocks
    }

    pub fn step_events(&self) -> u64 {
        self.step_events
    }
}
