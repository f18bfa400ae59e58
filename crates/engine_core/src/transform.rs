//! Transform component and utilities for spatial positioning.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Quat, Vec3};

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a new transform with position and rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Orientation whose local +Z points along `forward`, with local +Y as
    /// close to `up` as the two allow. Falls back to identity rotation when
    /// `forward` is degenerate.
    pub fn looking_along(position: Vec3, forward: Vec3, up: Vec3) -> Self {
        let z = forward.normalize_or_zero();
        if z == Vec3::ZERO {
            return Self::from_position(position);
        }
        let mut x = up.cross(z);
        if x.length_squared() < 1e-8 {
            // up parallel to forward; pick any perpendicular
            x = z.any_orthonormal_vector();
        }
        let x = x.normalize();
        let y = z.cross(x);
        let rotation = Quat::from_mat3(&Mat3::from_cols(x, y, z));
        Self::from_position_rotation(position, rotation)
    }

    /// Create the model matrix for this transform.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the right direction (positive X).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction (positive Y).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Map a point from local space into world space (scale ignored).
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Map a world-space point into local space (scale ignored).
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }

    /// Rotate around an arbitrary world axis through the transform origin.
    pub fn rotate_axis(&mut self, axis: Vec3, angle: f32) {
        let axis = axis.normalize_or_zero();
        if axis != Vec3::ZERO {
            self.rotation = (Quat::from_axis_angle(axis, angle) * self.rotation).normalize();
        }
    }
}

/// Flat bone matrix handed to an external skinner.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransformRaw {
    pub model: [[f32; 4]; 4],
}

impl From<&Transform> for TransformRaw {
    fn from(transform: &Transform) -> Self {
        Self {
            model: transform.to_matrix().to_cols_array_2d(),
        }
    }
}

impl From<Transform> for TransformRaw {
    fn from(transform: Transform) -> Self {
        Self::from(&transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looking_along_points_local_z_forward() {
        let t = Transform::looking_along(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::Y);
        let z = t.rotation * Vec3::Z;
        assert!((z - Vec3::X).length() < 1e-5);
        let y = t.rotation * Vec3::Y;
        assert!((y - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn looking_along_handles_parallel_up() {
        let t = Transform::looking_along(Vec3::ZERO, Vec3::Y, Vec3::Y);
        assert!(t.is_finite());
        assert!(((t.rotation * Vec3::Z) - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn point_transform_inverts() {
        let t = Transform::from_position_rotation(
            Vec3::new(3.0, -2.0, 5.0),
            Quat::from_rotation_y(0.7),
        );
        let p = Vec3::new(1.0, 2.0, 3.0);
        let back = t.inverse_transform_point(t.transform_point(p));
        assert!((back - p).length() < 1e-5);
    }

    #[test]
    fn non_finite_detected() {
        let t = Transform::from_position(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(!t.is_finite());
        assert!(Transform::default().is_finite());
    }
}
