// src/motion/kinematics.rs
use serde::{Deserialize, Serialize};

use crate::motion::MotionError;

/// Different types of printer kinematics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KinematicsType {
    #[default]
    Cartesian,
    CoreXY,
    Delta,
}

/// Mapping between world XYZ (mm) and axis carriage positions (mm).
///
/// Implementations must be pure: the planner calls them once per segment and
/// assumes the result only depends on the input.
pub trait Kinematics: Send + Sync {
    /// World position to axis positions
    fn inverse_kinematics(&self, world: &[f64; 3]) -> Result<[f64; 3], MotionError>;

    /// Axis positions to world position
    fn forward_kinematics(&self, axis: &[f64; 3]) -> Result<[f64; 3], MotionError>;

    /// Linear kinematics map straight world moves onto straight axis moves,
    /// so they never need segmenting.
    fn is_linear(&self) -> bool;

    fn kinematics_type(&self) -> KinematicsType;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CartesianKinematics;

impl Kinematics for CartesianKinematics {
    fn inverse_kinematics(&self, world: &[f64; 3]) -> Result<[f64; 3], MotionError> {
        Ok(*world)
    }

    fn forward_kinematics(&self, axis: &[f64; 3]) -> Result<[f64; 3], MotionError> {
        Ok(*axis)
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn kinematics_type(&self) -> KinematicsType {
        KinematicsType::Cartesian
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoreXYKinematics;

impl Kinematics for CoreXYKinematics {
    fn inverse_kinematics(&self, world: &[f64; 3]) -> Result<[f64; 3], MotionError> {
        // A = X + Y, B = X - Y, Z direct
        Ok([world[0] + world[1], world[0] - world[1], world[2]])
    }

    fn forward_kinematics(&self, axis: &[f64; 3]) -> Result<[f64; 3], MotionError> {
        Ok([(axis[0] + axis[1]) / 2.0, (axis[0] - axis[1]) / 2.0, axis[2]])
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn kinematics_type(&self) -> KinematicsType {
        KinematicsType::CoreXY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaGeometry {
    #[serde(default = "default_diagonal_rod")]
    pub diagonal_rod: f64,
    /// Horizontal distance from the bed centre to each tower, effector offset included.
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_diagonal_rod() -> f64 { 250.0 }
fn default_radius() -> f64 { 124.0 }

impl Default for DeltaGeometry {
    fn default() -> Self {
        Self {
            diagonal_rod: default_diagonal_rod(),
            radius: default_radius(),
        }
    }
}

/// Linear delta with three vertical towers at 210, 330 and 90 degrees.
#[derive(Debug, Clone)]
pub struct DeltaKinematics {
    geometry: DeltaGeometry,
    towers: [[f64; 2]; 3],
}

impl DeltaKinematics {
    pub fn new(geometry: DeltaGeometry) -> Self {
        let towers = [210.0f64, 330.0, 90.0].map(|angle| {
            let radians = angle.to_radians();
            [geometry.radius * radians.cos(), geometry.radius * radians.sin()]
        });
        Self { geometry, towers }
    }

    pub fn geometry(&self) -> &DeltaGeometry {
        &self.geometry
    }
}

impl Kinematics for DeltaKinematics {
    fn inverse_kinematics(&self, world: &[f64; 3]) -> Result<[f64; 3], MotionError> {
        let rod_squared = self.geometry.diagonal_rod * self.geometry.diagonal_rod;
        let mut carriages = [0.0; 3];
        for (carriage, tower) in carriages.iter_mut().zip(&self.towers) {
            let dx = world[0] - tower[0];
            let dy = world[1] - tower[1];
            let vertical = rod_squared - dx * dx - dy * dy;
            if vertical < 0.0 {
                return Err(MotionError::Kinematics(format!(
                    "position ({:.3}, {:.3}) is out of reach of the delta arms",
                    world[0], world[1]
                )));
            }
            *carriage = world[2] + vertical.sqrt();
        }
        Ok(carriages)
    }

    fn forward_kinematics(&self, axis: &[f64; 3]) -> Result<[f64; 3], MotionError> {
        // Trilaterate the three spheres of rod length around the carriage joints
        // and keep the intersection below the carriages.
        let p: [[f64; 3]; 3] = std::array::from_fn(|i| [self.towers[i][0], self.towers[i][1], axis[i]]);
        let sub = |a: [f64; 3], b: [f64; 3]| [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
        let dot = |a: [f64; 3], b: [f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
        let scale = |a: [f64; 3], f: f64| [a[0] * f, a[1] * f, a[2] * f];
        let norm = |a: [f64; 3]| dot(a, a).sqrt();

        let p21 = sub(p[1], p[0]);
        let p31 = sub(p[2], p[0]);
        let d = norm(p21);
        if d == 0.0 {
            return Err(MotionError::Kinematics("degenerate delta geometry".to_string()));
        }
        let ex = scale(p21, 1.0 / d);
        let i = dot(ex, p31);
        let ey_raw = sub(p31, scale(ex, i));
        let ey_norm = norm(ey_raw);
        if ey_norm == 0.0 {
            return Err(MotionError::Kinematics("degenerate delta geometry".to_string()));
        }
        let ey = scale(ey_raw, 1.0 / ey_norm);
        let ez = [
            ex[1] * ey[2] - ex[2] * ey[1],
            ex[2] * ey[0] - ex[0] * ey[2],
            ex[0] * ey[1] - ex[1] * ey[0],
        ];
        let j = dot(ey, p31);

        let rod_squared = self.geometry.diagonal_rod * self.geometry.diagonal_rod;
        let x = d / 2.0;
        let y = (i * i + j * j) / (2.0 * j) - i * x / j;
        let z_squared = rod_squared - x * x - y * y;
        if z_squared < 0.0 {
            return Err(MotionError::Kinematics(format!(
                "carriage positions {axis:?} do not meet at a single effector position"
            )));
        }
        let z = z_squared.sqrt();

        let base = [
            p[0][0] + ex[0] * x + ey[0] * y,
            p[0][1] + ex[1] * x + ey[1] * y,
            p[0][2] + ex[2] * x + ey[2] * y,
        ];
        let above = [base[0] + ez[0] * z, base[1] + ez[1] * z, base[2] + ez[2] * z];
        let below = [base[0] - ez[0] * z, base[1] - ez[1] * z, base[2] - ez[2] * z];
        Ok(if above[2] < below[2] { above } else { below })
    }

    fn is_linear(&self) -> bool {
        false
    }

    fn kinematics_type(&self) -> KinematicsType {
        KinematicsType::Delta
    }
}

/// Factory for creating kinematics handlers
pub fn create_kinematics(kinematics_type: KinematicsType, delta: DeltaGeometry) -> Box<dyn Kinematics> {
    match kinematics_type {
        KinematicsType::Cartesian => Box::new(CartesianKinematics),
        KinematicsType::CoreXY => Box::new(CoreXYKinematics),
        KinematicsType::Delta => Box::new(DeltaKinematics::new(delta)),
    }
}
