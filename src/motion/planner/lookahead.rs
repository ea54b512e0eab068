// src/motion/planner/lookahead.rs
//! Entry speed revision over the buffered blocks.
//!
//! Index 0 is the oldest block still in the buffer. Its entry speed is frozen
//! because the block before it may already be running. The newest block keeps
//! the entry speed it was created with and always plans to stop at its safe
//! speed, so the machine can halt if no further move arrives.

use crate::motion::block::{MotionBlock, MotionBuffer};
use crate::motion::trapezoid::{calculate_trapezoid, reachable_speed};

pub(super) fn recalculate<const N: usize>(buffer: &mut MotionBuffer<N>, max_jerk: f64) {
    let count = buffer.available();
    if count >= 2 {
        reverse_pass(buffer, count);
        forward_pass(buffer, count);
    }
    recalculate_trapezoids(buffer, count, max_jerk);
}

/// Raises entry speeds as far as the following block allows braking.
fn reverse_pass<const N: usize>(buffer: &mut MotionBuffer<N>, count: usize) {
    for index in (1..count - 1).rev() {
        let Some(next_entry) = buffer.get(index + 1).map(entry_feedrate) else {
            continue;
        };
        if let Some(current) = buffer.get_mut(index) {
            reverse_kernel(current, next_entry);
        }
    }
}

fn reverse_kernel(current: &mut MotionBlock, next_entry_feedrate: f64) {
    if current.entry_speed == current.max_entry_speed {
        return;
    }
    let exit_speed = next_entry_feedrate * current.steps_per_mm();
    current.entry_speed = if !current.nominal_length && current.max_entry_speed > exit_speed {
        current
            .max_entry_speed
            .min(reachable_speed(exit_speed, current.acceleration, f64::from(current.step_event_count)))
    } else {
        current.max_entry_speed
    };
    current.recalculate = true;
}

/// Lowers entry speeds the previous block cannot accelerate up to.
fn forward_pass<const N: usize>(buffer: &mut MotionBuffer<N>, count: usize) {
    for index in 1..count {
        let Some(previous) = buffer.get(index - 1).copied() else {
            continue;
        };
        if let Some(current) = buffer.get_mut(index) {
            forward_kernel(&previous, current);
        }
    }
}

fn forward_kernel(previous: &MotionBlock, current: &mut MotionBlock) {
    if previous.nominal_length {
        return;
    }
    let reachable = reachable_speed(
        previous.entry_speed,
        previous.acceleration,
        f64::from(previous.step_event_count),
    ) / previous.steps_per_mm();
    let limit = reachable * current.steps_per_mm();
    if limit < current.entry_speed {
        current.entry_speed = limit;
        current.recalculate = true;
    }
}

fn recalculate_trapezoids<const N: usize>(buffer: &mut MotionBuffer<N>, count: usize, max_jerk: f64) {
    for index in 0..count {
        let next = buffer.get(index + 1).copied();
        let Some(current) = buffer.get_mut(index) else {
            break;
        };
        let exit_speed = match next {
            Some(next) if current.recalculate || next.recalculate => entry_feedrate(&next) * current.steps_per_mm(),
            Some(_) => continue,
            None if current.recalculate => current.nominal_feedrate.min(max_jerk / 2.0) * current.steps_per_mm(),
            None => continue,
        };
        let entry_speed = current.entry_speed;
        calculate_trapezoid(current, entry_speed, exit_speed);
        current.recalculate = false;
    }
    tracing::trace!("Recalculated trapezoids for {} blocks", count);
}

/// Entry speed as a path speed in mm/s, comparable across blocks.
fn entry_feedrate(block: &MotionBlock) -> f64 {
    let steps_per_mm = block.steps_per_mm();
    if steps_per_mm > 0.0 {
        block.entry_speed / steps_per_mm
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::block::MotionBlock;

    fn block(nominal_feedrate: f64, max_entry_feedrate: f64) -> MotionBlock {
        // 100 steps per mm, 10mm
        MotionBlock {
            step_event_count: 1_000,
            millimeters: 10.0,
            nominal_feedrate,
            nominal_speed: nominal_feedrate * 100.0,
            acceleration: 100_000.0,
            max_entry_speed: max_entry_feedrate * 100.0,
            entry_speed: 0.0,
            recalculate: true,
            ..MotionBlock::default()
        }
    }

    #[test]
    fn test_middle_block_entry_raised_to_junction_limit() {
        let mut buffer: MotionBuffer<8> = MotionBuffer::new();
        for _ in 0..3 {
            buffer.write(block(50.0, 10.0)).unwrap();
        }
        recalculate(&mut buffer, 20.0);

        // oldest block frozen, middle block raised, newest untouched
        assert_eq!(buffer.get(0).unwrap().entry_speed, 0.0);
        assert!((buffer.get(1).unwrap().entry_speed - 1_000.0).abs() < 1e-9);
        assert_eq!(buffer.get(2).unwrap().entry_speed, 0.0);
        // oldest exits at the middle block's entry
        assert!((buffer.get(0).unwrap().exit_speed - 1_000.0).abs() < 1e-9);
        assert!(buffer.iter().all(|b| !b.recalculate));
    }

    #[test]
    fn test_forward_pass_limits_by_acceleration() {
        let mut buffer: MotionBuffer<4> = MotionBuffer::new();
        let mut slow = block(50.0, 10.0);
        slow.acceleration = 1.0;
        slow.step_event_count = 2;
        slow.millimeters = 0.02;
        slow.nominal_speed = 5_000.0;
        buffer.write(slow).unwrap();
        let mut next = block(50.0, 10.0);
        next.entry_speed = 1_000.0;
        buffer.write(next).unwrap();
        recalculate(&mut buffer, 20.0);

        // sqrt(2 * 1 * 2) = 2 steps/s at 100 steps/mm is 0.02mm/s
        let expected = 2.0 / 100.0 * 100.0;
        assert!((buffer.get(1).unwrap().entry_speed - expected).abs() < 1e-9);
    }

    #[test]
    fn test_newest_block_ends_at_safe_speed() {
        let mut buffer: MotionBuffer<4> = MotionBuffer::new();
        buffer.write(block(50.0, 10.0)).unwrap();
        recalculate(&mut buffer, 20.0);
        assert!((buffer.get(0).unwrap().exit_speed - 1_000.0).abs() < 1e-9);
    }
}
