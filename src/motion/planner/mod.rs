// src/motion/planner/mod.rs

mod lookahead;

use std::sync::Arc;

use crate::motion::block::{MOTION_BUFFER_SIZE, MotionBlock, SharedMotionBuffer};
use crate::motion::coordinates::{
    AxisCoordinates, MACHINE_NUM_AXIS, MACHINE_NUM_EXTRUDER, NUM_STEPPERS, StepperCoordinates,
    WorldCoordinates,
};
use crate::motion::junction::{JerkControl, calculate_unit_vector, efficient_junction_speed, vector_junction_speed};
use crate::motion::kinematics::Kinematics;
use crate::motion::trapezoid::{calculate_trapezoid, reachable_speed};
use crate::motion::MotionError;
use crate::parameter::Parameter;
use crate::scheduler::{Idle, StopHandle};

/// Moves with this many step events or fewer are dropped.
pub const MOTIONPLANNER_MINIMUM_SEGMENT_SIZE: u32 = 5;

/// Turns requested moves into `MotionBlock`s and feeds the shared motion buffer.
///
/// The planner is the single producer of its buffer. Its tracked positions
/// describe where the machine will be once every buffered block has run.
pub struct MotionPlanner<const N: usize = MOTION_BUFFER_SIZE> {
    parameter: Arc<Parameter>,
    kinematics: Box<dyn Kinematics>,
    motion_buffer: SharedMotionBuffer<N>,
    idle: Box<dyn Idle>,
    stop: StopHandle,
    /// Planned XYZ target, advanced per segment.
    world_position: [f64; 3],
    /// Planned filament per extruder, mm.
    extruder_position: [f64; MACHINE_NUM_EXTRUDER],
    /// XYZ at the end of the last enqueued block, matches `axis_position`.
    block_origin: [f64; 3],
    axis_position: AxisCoordinates,
    previous_unit: [f64; 3],
    /// Nominal path speed of the last enqueued block, mm/s.
    previous_nominal_feedrate: f64,
    active_extruder: usize,
}

impl<const N: usize> MotionPlanner<N> {
    pub fn new(
        parameter: Arc<Parameter>,
        kinematics: Box<dyn Kinematics>,
        motion_buffer: SharedMotionBuffer<N>,
        idle: Box<dyn Idle>,
        stop: StopHandle,
    ) -> Result<Self, MotionError> {
        let mut planner = Self {
            parameter,
            kinematics,
            motion_buffer,
            idle,
            stop,
            world_position: [0.0; 3],
            extruder_position: [0.0; MACHINE_NUM_EXTRUDER],
            block_origin: [0.0; 3],
            axis_position: AxisCoordinates::default(),
            previous_unit: [0.0; 3],
            previous_nominal_feedrate: 0.0,
            active_extruder: 0,
        };
        planner.set_position(&WorldCoordinates::default())?;
        Ok(planner)
    }

    /// Plans a move given as step deltas. Only valid for linear kinematics.
    ///
    /// Returns `Ok(false)` when the move is too small to enqueue; the tracked
    /// position is then left unchanged and the caller should fold the delta
    /// into its next request.
    pub fn add_move(&mut self, delta: &AxisCoordinates, feedrate: f64) -> Result<bool, MotionError> {
        if !feedrate.is_finite() {
            return Err(MotionError::InvalidMove(format!("non-finite feedrate {feedrate} mm/s")));
        }
        if !self.kinematics.is_linear() {
            return Err(MotionError::InvalidMove(format!(
                "{:?} kinematics need world coordinate moves",
                self.kinematics.kinematics_type()
            )));
        }

        let mut axis_mm = [0.0; 3];
        for (i, value) in axis_mm.iter_mut().enumerate().take(MACHINE_NUM_AXIS) {
            *value = delta.axis[i] as f64 / self.parameter.axis_steps_per_unit[i];
        }
        let xyz = self.kinematics.forward_kinematics(&axis_mm)?;
        let extruded = delta.extruder[self.active_extruder] as f64
            / self.parameter.extruder_steps_per_mm(self.active_extruder);
        let world_delta = WorldCoordinates::from_xyz(xyz, extruded);

        let accepted = self.plan_block(delta, &world_delta, feedrate)?;
        if accepted {
            self.axis_position = self.axis_position + *delta;
            for (i, origin) in self.block_origin.iter_mut().enumerate() {
                *origin += xyz[i];
            }
            self.world_position = self.block_origin;
            self.extruder_position[self.active_extruder] += extruded;
        }
        Ok(accepted)
    }

    /// Plans a move to an absolute XYZ target with relative extrusion `e`.
    ///
    /// Nonlinear kinematics split the move into equal-time segments, one block
    /// each. Segments too small to enqueue are skipped and their steps end up
    /// in the next accepted block.
    pub fn add_world_move(&mut self, target: &WorldCoordinates, feedrate: f64) -> Result<bool, MotionError> {
        if !target.is_finite() || !feedrate.is_finite() {
            return Err(MotionError::InvalidMove(format!(
                "non-finite move to {target:?} at {feedrate} mm/s"
            )));
        }

        let start = self.world_position;
        let start_e = self.extruder_position[self.active_extruder];
        let end = target.xyz();
        let travel: [f64; 3] = std::array::from_fn(|i| end[i] - start[i]);

        let mut length = WorldCoordinates::from_xyz(travel, 0.0).xyz_length();
        if length <= f64::EPSILON {
            length = target.e.abs();
        }
        if length <= f64::EPSILON {
            return Ok(false);
        }

        let feedrate = self.parameter.floor_feedrate(feedrate, target.e != 0.0);
        let segments = self.segment_count(length, feedrate);
        tracing::trace!("Move of {:.3}mm split into {} segments", length, segments);

        let mut accepted = false;
        for segment in 1..=segments {
            let fraction = segment as f64 / segments as f64;
            let world: [f64; 3] = if segment == segments {
                end
            } else {
                std::array::from_fn(|i| start[i] + travel[i] * fraction)
            };
            let extruded = start_e + target.e * fraction;

            let axis_target = self.to_axis_coordinates(&world, extruded)?;
            let delta = axis_target - self.axis_position;
            let extruded_delta = delta.extruder[self.active_extruder] as f64
                / self.parameter.extruder_steps_per_mm(self.active_extruder);
            let world_delta = WorldCoordinates::from_xyz(
                std::array::from_fn(|i| world[i] - self.block_origin[i]),
                extruded_delta,
            );

            let enqueued = self.plan_block(&delta, &world_delta, feedrate)?;
            self.world_position = world;
            self.extruder_position[self.active_extruder] = extruded;
            if enqueued {
                self.axis_position = axis_target;
                self.block_origin = world;
                accepted = true;
            }
        }
        Ok(accepted)
    }

    /// `max(1, round(segments_per_second * L / F))`, always 1 for linear kinematics.
    ///
    /// Capped so no segment is shorter than one step of the finest axis;
    /// shorter segments would be skipped anyway.
    pub fn segment_count(&self, length: f64, feedrate: f64) -> usize {
        if self.kinematics.is_linear() || feedrate <= 0.0 {
            return 1;
        }
        let finest = self.parameter.axis_steps_per_unit.iter().copied().fold(0.0, f64::max);
        let limit = (length * finest).ceil().max(1.0);
        let segments = (self.parameter.segments_per_second * length / feedrate).round();
        if segments.is_finite() && segments >= 1.0 {
            segments.min(limit) as usize
        } else {
            1
        }
    }

    fn to_axis_coordinates(&self, world: &[f64; 3], extruded: f64) -> Result<AxisCoordinates, MotionError> {
        let axis_mm = self.kinematics.inverse_kinematics(world)?;
        let mut axis = self.axis_position;
        for i in 0..MACHINE_NUM_AXIS {
            axis.axis[i] = (axis_mm[i] * self.parameter.axis_steps_per_unit[i]).round() as i64;
        }
        axis.extruder[self.active_extruder] =
            (extruded * self.parameter.extruder_steps_per_mm(self.active_extruder)).round() as i64;
        Ok(axis)
    }

    fn plan_block(
        &mut self,
        delta: &AxisCoordinates,
        world_delta: &WorldCoordinates,
        feedrate: f64,
    ) -> Result<bool, MotionError> {
        let parameter = Arc::clone(&self.parameter);
        let steps = StepperCoordinates::from_delta(delta)?;
        let step_event_count = steps.step_event_count();
        let feedrate = parameter.floor_feedrate(feedrate, steps.extruder_steps() > 0);

        if step_event_count <= MOTIONPLANNER_MINIMUM_SEGMENT_SIZE {
            tracing::trace!("Dropping move of {} step events", step_event_count);
            return Ok(false);
        }
        if feedrate.is_nan() || feedrate <= 0.0 {
            return Err(MotionError::InvalidMove(format!("feedrate must be positive, got {feedrate}")));
        }

        let mut millimeters = world_delta.xyz_length();
        if millimeters <= f64::EPSILON {
            millimeters = world_delta.e.abs();
        }
        if millimeters <= f64::EPSILON {
            millimeters = (0..NUM_STEPPERS)
                .map(|i| f64::from(steps.steps[i]) / parameter.steps_per_unit(i))
                .fold(0.0, f64::max);
        }

        // Slow the whole move down until no stepper exceeds its own limit.
        let mut inverse_second = feedrate / millimeters;
        let mut speed_factor: f64 = 1.0;
        for i in 0..NUM_STEPPERS {
            let stepper_feedrate = f64::from(steps.steps[i]) / parameter.steps_per_unit(i) * inverse_second;
            if stepper_feedrate > parameter.max_feedrate[i] {
                speed_factor = speed_factor.min(parameter.max_feedrate[i] / stepper_feedrate);
            }
        }
        inverse_second *= speed_factor;
        let nominal_feedrate = feedrate * speed_factor;
        let events = f64::from(step_event_count);
        let nominal_speed = events * inverse_second;
        let steps_per_mm = events / millimeters;

        let mut acceleration = parameter.acceleration * steps_per_mm;
        for i in 0..NUM_STEPPERS {
            if steps.steps[i] == 0 {
                continue;
            }
            let stepper_steps = f64::from(steps.steps[i]);
            let limit = parameter.max_acceleration[i] * parameter.steps_per_unit(i);
            if acceleration * stepper_steps / events > limit {
                acceleration = limit * events / stepper_steps;
            }
        }

        let unit_vector = calculate_unit_vector(&world_delta.xyz());
        let unit = [unit_vector[0], unit_vector[1], unit_vector[2]];
        let max_jerk = parameter.max_jerk;
        let safe_speed = nominal_feedrate.min(max_jerk / 2.0);

        self.wait_for_space()?;
        let mut buffer = self.motion_buffer.lock().map_err(|_| MotionError::BufferPoisoned)?;

        let junction_speed = if buffer.is_empty() || self.previous_nominal_feedrate <= 0.0 {
            safe_speed
        } else {
            let previous = self.previous_nominal_feedrate;
            let straight = unit.iter().all(|v| *v == 0.0) || self.previous_unit.iter().all(|v| *v == 0.0);
            match parameter.jerk_control {
                JerkControl::Vector if !straight => {
                    vector_junction_speed(&self.previous_unit, &unit, previous, nominal_feedrate, max_jerk)
                }
                _ => efficient_junction_speed(previous, nominal_feedrate, max_jerk)
                    .min(previous)
                    .min(nominal_feedrate),
            }
        };

        let max_entry_speed = junction_speed.max(0.0) * steps_per_mm;
        let safe_exit_speed = safe_speed * steps_per_mm;
        let allowable_speed = reachable_speed(safe_exit_speed, acceleration, events);

        let mut block = MotionBlock {
            steps,
            step_event_count,
            millimeters,
            nominal_feedrate,
            nominal_speed,
            acceleration,
            max_entry_speed,
            entry_speed: max_entry_speed.min(allowable_speed),
            nominal_length: nominal_speed <= allowable_speed,
            recalculate: true,
            active_extruder: self.active_extruder as u8,
            ..MotionBlock::default()
        };
        let entry_speed = block.entry_speed;
        calculate_trapezoid(&mut block, entry_speed, safe_exit_speed);

        buffer.write(block)?;
        lookahead::recalculate(&mut buffer, max_jerk);
        let queued = buffer.available();
        drop(buffer);

        self.previous_unit = unit;
        self.previous_nominal_feedrate = nominal_feedrate;

        tracing::debug!(
            "Planned block: {} events, {:.3}mm, v: {:.1}mm/s, entry: {:.1}steps/s, queued: {}",
            step_event_count,
            millimeters,
            nominal_feedrate,
            block.entry_speed,
            queued
        );
        Ok(true)
    }

    /// Blocks, calling the idle hook, until the motion buffer has a free slot.
    fn wait_for_space(&mut self) -> Result<(), MotionError> {
        loop {
            if self.stop.is_stop_requested() {
                return Err(MotionError::Aborted);
            }
            let full = self
                .motion_buffer
                .lock()
                .map_err(|_| MotionError::BufferPoisoned)?
                .is_full();
            if !full {
                return Ok(());
            }
            self.idle.idle();
        }
    }

    /// Requests a stop, drops every buffered block and forgets the junction state.
    /// Positions are unknown afterwards; call `set_position` and `resume`.
    pub fn emergency_stop(&mut self) -> Result<(), MotionError> {
        self.stop.request_stop();
        let dropped = {
            let mut buffer = self.motion_buffer.lock().map_err(|_| MotionError::BufferPoisoned)?;
            let dropped = buffer.available();
            buffer.clear();
            dropped
        };
        self.previous_unit = [0.0; 3];
        self.previous_nominal_feedrate = 0.0;
        tracing::warn!("Emergency stop, dropped {} motion blocks", dropped);
        Ok(())
    }

    pub fn resume(&mut self) {
        self.stop.reset();
    }

    pub fn set_position(&mut self, world: &WorldCoordinates) -> Result<(), MotionError> {
        let xyz = world.xyz();
        let axis_mm = self.kinematics.inverse_kinematics(&xyz)?;
        for i in 0..MACHINE_NUM_AXIS {
            self.axis_position.axis[i] = (axis_mm[i] * self.parameter.axis_steps_per_unit[i]).round() as i64;
        }
        self.extruder_position[self.active_extruder] = world.e;
        self.axis_position.extruder[self.active_extruder] =
            (world.e * self.parameter.extruder_steps_per_mm(self.active_extruder)).round() as i64;
        self.world_position = xyz;
        self.block_origin = xyz;
        self.previous_unit = [0.0; 3];
        self.previous_nominal_feedrate = 0.0;
        tracing::debug!("Planner position set to {:?}", world);
        Ok(())
    }

    /// Syncs the world position from known stepper positions, e.g. after homing.
    pub fn set_axis_position(&mut self, axis: &AxisCoordinates) -> Result<(), MotionError> {
        let mut axis_mm = [0.0; 3];
        for (i, value) in axis_mm.iter_mut().enumerate().take(MACHINE_NUM_AXIS) {
            *value = axis.axis[i] as f64 / self.parameter.axis_steps_per_unit[i];
        }
        let xyz = self.kinematics.forward_kinematics(&axis_mm)?;
        for extruder in 0..MACHINE_NUM_EXTRUDER {
            self.extruder_position[extruder] =
                axis.extruder[extruder] as f64 / self.parameter.extruder_steps_per_mm(extruder);
        }
        self.axis_position = *axis;
        self.world_position = xyz;
        self.block_origin = xyz;
        self.previous_unit = [0.0; 3];
        self.previous_nominal_feedrate = 0.0;
        tracing::debug!("Planner axis position set to {:?}", axis);
        Ok(())
    }

    /// Planned position; `e` is the filament fed by the active extruder so far.
    pub fn world_position(&self) -> WorldCoordinates {
        WorldCoordinates::from_xyz(self.world_position, self.extruder_position[self.active_extruder])
    }

    pub fn axis_position(&self) -> AxisCoordinates {
        self.axis_position
    }

    pub fn active_extruder(&self) -> usize {
        self.active_extruder
    }

    pub fn set_active_extruder(&mut self, extruder: usize) -> Result<(), MotionError> {
        if extruder >= MACHINE_NUM_EXTRUDER {
            return Err(MotionError::InvalidMove(format!(
                "extruder {extruder} does not exist, machine has {MACHINE_NUM_EXTRUDER}"
            )));
        }
        self.active_extruder = extruder;
        Ok(())
    }

    pub fn queue_length(&self) -> Result<usize, MotionError> {
        let buffer = self.motion_buffer.lock().map_err(|_| MotionError::BufferPoisoned)?;
        Ok(buffer.available())
    }

    pub fn motion_buffer(&self) -> &SharedMotionBuffer<N> {
        &self.motion_buffer
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn parameter(&self) -> &Parameter {
        &self.parameter
    }

    pub fn kinematics(&self) -> &dyn Kinematics {
        self.kinematics.as_ref()
    }
}

impl<const N: usize> std::fmt::Debug for MotionPlanner<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionPlanner")
            .field("kinematics", &self.kinematics.kinematics_type())
            .field("world_position", &self.world_position)
            .field("axis_position", &self.axis_position)
            .field("previous_nominal_feedrate", &self.previous_nominal_feedrate)
            .field("queue_length", &self.queue_length().ok())
            .finish()
    }
}
