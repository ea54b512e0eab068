// src/motion/junction.rs
//! Junction speed between two consecutive blocks, limited by maximum jerk.
//! All speeds in mm/s.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JerkControl {
    /// Assumes a full reversal at every junction, O(1) per block.
    #[default]
    Efficient,
    /// Uses the actual angle between the two moves.
    Vector,
}

/// Junction speed assuming the worst case direction change, where the jerk
/// is the sum of both speeds.
pub fn efficient_junction_speed(previous_speed: f64, speed: f64, max_jerk: f64) -> f64 {
    let half_jerk = max_jerk / 2.0;
    match (previous_speed > half_jerk, speed > half_jerk) {
        (true, true) => half_jerk,
        (true, false) => max_jerk - speed,
        (false, true) => max_jerk - previous_speed,
        (false, false) => previous_speed.min(speed),
    }
}

/// Junction speed from the angle between the two moves. Both blocks pass the
/// junction at speed `v`, so the velocity jump is `v * |u - u_prev|`.
pub fn vector_junction_speed(
    previous_unit: &[f64],
    unit: &[f64],
    previous_speed: f64,
    speed: f64,
    max_jerk: f64,
) -> f64 {
    let limit = previous_speed.min(speed);
    let difference = previous_unit
        .iter()
        .zip(unit)
        .map(|(a, b)| (b - a) * (b - a))
        .sum::<f64>()
        .sqrt();
    if difference * limit <= max_jerk {
        limit
    } else {
        max_jerk / difference
    }
}

pub fn calculate_unit_vector(delta: &[f64]) -> Vec<f64> {
    let distance = delta.iter().map(|v| v * v).sum::<f64>().sqrt();
    if distance > 0.0 {
        delta.iter().map(|v| v / distance).collect()
    } else {
        vec![0.0; delta.len()]
    }
}
