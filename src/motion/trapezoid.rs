// src/motion/trapezoid.rs
//! Constant-acceleration profile of a single block.

use crate::motion::block::MotionBlock;

/// Distance needed to go from `initial` to `target` speed under `acceleration`.
/// Negative acceleration gives the braking distance.
pub fn estimate_acceleration_distance(initial: f64, target: f64, acceleration: f64) -> f64 {
    if acceleration == 0.0 {
        return 0.0;
    }
    (target * target - initial * initial) / (2.0 * acceleration)
}

/// Speed reached after `distance` starting at `initial`.
pub fn reachable_speed(initial: f64, acceleration: f64, distance: f64) -> f64 {
    (2.0 * acceleration * distance + initial * initial).max(0.0).sqrt()
}

/// Point at which braking must start when accelerating from `initial` and
/// ending at `final_speed` within `distance`, with no plateau in between.
pub fn intersection_distance(initial: f64, final_speed: f64, acceleration: f64, distance: f64) -> f64 {
    if acceleration == 0.0 {
        return 0.0;
    }
    (2.0 * acceleration * distance - initial * initial + final_speed * final_speed) / (4.0 * acceleration)
}

/// Fills in the trapezoid of `block` for the given boundary speeds (steps/s).
/// When the nominal speed cannot be reached, the plateau collapses and the
/// cruise speed drops to the highest speed the block allows.
pub fn calculate_trapezoid(block: &mut MotionBlock, entry_speed: f64, exit_speed: f64) {
    let nominal = block.nominal_speed;
    let entry = entry_speed.clamp(0.0, nominal);
    let exit = exit_speed.clamp(0.0, nominal);
    let total = f64::from(block.step_event_count);
    let acceleration = block.acceleration;

    let mut accelerate_steps = estimate_acceleration_distance(entry, nominal, acceleration)
        .ceil()
        .clamp(0.0, total);
    let decelerate_steps = estimate_acceleration_distance(nominal, exit, -acceleration)
        .floor()
        .clamp(0.0, total);
    let mut plateau_steps = total - accelerate_steps - decelerate_steps;
    let mut cruise = nominal;

    if plateau_steps < 0.0 {
        accelerate_steps = intersection_distance(entry, exit, acceleration, total)
            .ceil()
            .clamp(0.0, total);
        plateau_steps = 0.0;
        cruise = reachable_speed(entry, acceleration, accelerate_steps)
            .min(nominal)
            .max(entry.max(exit));
    }

    block.entry_speed = entry;
    block.exit_speed = exit;
    block.cruise_speed = cruise;
    block.accelerate_until = accelerate_steps as u32;
    block.decelerate_after = (accelerate_steps + plateau_steps) as u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(step_event_count: u32, nominal_speed: f64, acceleration: f64) -> MotionBlock {
        MotionBlock {
            step_event_count,
            millimeters: f64::from(step_event_count) / 100.0,
            nominal_speed,
            acceleration,
            ..MotionBlock::default()
        }
    }

    #[test]
    fn test_closed_forms_agree() {
        let d = estimate_acceleration_distance(10.0, 30.0, 4.0);
        assert!((d - 100.0).abs() < 1e-9);
        assert!((reachable_speed(10.0, 4.0, d) - 30.0).abs() < 1e-9);
        // symmetric boundary speeds brake halfway
        assert!((intersection_distance(5.0, 5.0, 2.0, 80.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_trapezoid_has_plateau() {
        let mut b = block(10_000, 1_000.0, 10_000.0);
        calculate_trapezoid(&mut b, 0.0, 0.0);
        // 1000^2 / (2 * 10000) = 50 steps each way
        assert_eq!(b.accelerate_until, 50);
        assert_eq!(b.decelerate_after, 9_950);
        assert_eq!(b.cruise_speed, 1_000.0);
    }

    #[test]
    fn test_short_block_becomes_triangle() {
        let mut b = block(100, 10_000.0, 1_000.0);
        calculate_trapezoid(&mut b, 0.0, 0.0);
        assert_eq!(b.accelerate_until, 50);
        assert_eq!(b.decelerate_after, 50);
        let peak = (2.0f64 * 1_000.0 * 50.0).sqrt();
        assert!((b.cruise_speed - peak).abs() < 1e-9);
        assert!(b.cruise_speed < b.nominal_speed);
    }

    #[test]
    fn test_boundary_speeds_are_capped_at_nominal() {
        let mut b = block(1_000, 500.0, 1_000.0);
        calculate_trapezoid(&mut b, 800.0, 900.0);
        assert_eq!(b.entry_speed, 500.0);
        assert_eq!(b.exit_speed, 500.0);
        assert_eq!(b.accelerate_until, 0);
        assert_eq!(b.decelerate_after, 1_000);
    }
}
