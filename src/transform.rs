use std::ops::Mul;

use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::volume::VolumeError;

/// A 4x4 homogeneous affine transform.
///
/// Transforms compose like matrices: in `a * b` the right-hand side is applied
/// to a point first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(Matrix4<f64>);

impl Transform {
    pub fn translation(offset: Vector3<f64>) -> Self {
        Self(Matrix4::new(
            1.0, 0.0, 0.0, offset.x, //
            0.0, 1.0, 0.0, offset.y, //
            0.0, 0.0, 1.0, offset.z, //
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// Right-handed rotation about the x axis
    pub fn rotation_x(rad: f64) -> Self {
        let (sin, cos) = rad.sin_cos();
        Self(Matrix4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, cos, -sin, 0.0, //
            0.0, sin, cos, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// Right-handed rotation about the y axis
    pub fn rotation_y(rad: f64) -> Self {
        let (sin, cos) = rad.sin_cos();
        Self(Matrix4::new(
            cos, 0.0, sin, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            -sin, 0.0, cos, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// Right-handed rotation about the z axis
    pub fn rotation_z(rad: f64) -> Self {
        let (sin, cos) = rad.sin_cos();
        Self(Matrix4::new(
            cos, -sin, 0.0, 0.0, //
            sin, cos, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// Rotation about x, then y, then z.
    pub fn rotation_xyz(rad: Vector3<f64>) -> Self {
        Self::rotation_z(rad.z) * Self::rotation_y(rad.y) * Self::rotation_x(rad.x)
    }

    /// `first ∘ second`: `second` is applied first.
    pub fn compose(first: Transform, second: Transform) -> Self {
        Self(first.0 * second.0)
    }

    /// Apply to a point (homogeneous coordinate 1).
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        let h = self.0 * point.to_homogeneous();
        Point3::new(h.x, h.y, h.z)
    }

    /// Apply to a direction (homogeneous coordinate 0), so translation has no
    /// effect.
    pub fn apply_direction(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        let h = self.0 * Vector4::new(vector.x, vector.y, vector.z, 0.0);
        Vector3::new(h.x, h.y, h.z)
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform::compose(self, rhs)
    }
}

/// Unit vector in the direction of `vector`.
///
/// # Errors
///
/// Returns [`VolumeError::DegenerateInput`] for a zero-length or non-finite
/// vector.
pub fn normalized(vector: Vector3<f64>) -> Result<Vector3<f64>, VolumeError> {
    let norm = vector.norm();
    if norm == 0.0 || !norm.is_finite() {
        return Err(VolumeError::DegenerateInput(
            "direction vector has zero length",
        ));
    }
    Ok(vector / norm)
}

/// Length of the space diagonal of a `size_x * size_y * size_z` box.
pub fn diagonal_length(size_x: usize, size_y: usize, size_z: usize) -> f64 {
    let (x, y, z) = (size_x as f64, size_y as f64, size_z as f64);
    (x * x + y * y + z * z).sqrt()
}
