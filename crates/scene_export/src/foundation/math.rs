//! Math utilities and types
//!
//! Provides the vector and matrix types used by the intermediate
//! representation, plus the single-axis rotation helpers the transform
//! compiler is validated against.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use nalgebra::{Matrix3, Matrix4, Unit, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// A principal axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// The X axis
    X,
    /// The Y axis
    Y,
    /// The Z axis
    Z,
}

impl Axis {
    /// Component index of this axis in a 3-vector
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Parse an uppercase axis letter
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'X' => Some(Self::X),
            'Y' => Some(Self::Y),
            'Z' => Some(Self::Z),
            _ => None,
        }
    }

    /// Unit vector along this axis
    pub fn unit(self) -> Unit<Vec3> {
        match self {
            Self::X => Vec3::x_axis(),
            Self::Y => Vec3::y_axis(),
            Self::Z => Vec3::z_axis(),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
        };
        f.write_str(letter)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Half-angle field-of-view conversion between two viewport axes
    ///
    /// Given the field of view along one axis and `aspect_ratio` (the ratio of
    /// that axis' extent to the other one), returns the field of view along
    /// the other axis.
    pub fn derive_fov(fov: f32, aspect_ratio: f32) -> f32 {
        2.0 * ((fov * 0.5).tan() / aspect_ratio).atan()
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a counter-clockwise (right-handed) rotation around the X axis
    fn rotation_x(angle: f32) -> Mat4;

    /// Create a counter-clockwise (right-handed) rotation around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Create a counter-clockwise (right-handed) rotation around the Z axis
    fn rotation_z(angle: f32) -> Mat4;

    /// Create a counter-clockwise rotation around `axis`
    fn rotation_about(axis: Axis, angle: f32) -> Mat4;

    /// Compose Euler angles (radians) in the given axis order
    ///
    /// The first axis of `order` is applied first, so order `[X, Y, Z]`
    /// yields `Rz * Ry * Rx`.
    fn euler(angles: &Vec3, order: &[Axis; 3]) -> Mat4;

    /// Compose translation, rotation matrix and scale as `T * R * S`
    fn from_trs(translation: &Vec3, rotation: &Mat4, scale: &Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_x(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::x_axis(), angle)
    }

    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn rotation_about(axis: Axis, angle: f32) -> Mat4 {
        match axis {
            Axis::X => Self::rotation_x(angle),
            Axis::Y => Self::rotation_y(angle),
            Axis::Z => Self::rotation_z(angle),
        }
    }

    fn euler(angles: &Vec3, order: &[Axis; 3]) -> Mat4 {
        order.iter().fold(Mat4::identity(), |acc, axis| {
            Self::rotation_about(*axis, angles[axis.index()]) * acc
        })
    }

    fn from_trs(translation: &Vec3, rotation: &Mat4, scale: &Vec3) -> Mat4 {
        Mat4::new_translation(translation) * rotation * Mat4::new_nonuniform_scaling(scale)
    }
}
