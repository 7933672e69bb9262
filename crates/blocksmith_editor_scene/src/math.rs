// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transform snapshots, rays and bounds.
//!
//! Rotations are euler angles in radians applied in XYZ order, matching the
//! convention of the rendering engine the editor drives.

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Smallest scale any component may reach through interactive scaling
pub const MIN_SCALE: f32 = 0.1;

/// Per-component tolerance below which two transforms count as unchanged
pub const TRANSFORM_EPSILON: f32 = 1e-6;

/// Position / rotation / scale triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position (x, y, z)
    pub position: Vec3,
    /// Rotation in euler angles (radians, XYZ order)
    pub rotation: Vec3,
    /// Scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    /// Identity rotation and scale at the given position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Rotation as a quaternion
    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Compose into an affine matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }

    /// Decompose an affine matrix. Shear, if any, is discarded.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
        Self {
            position,
            rotation: Vec3::new(x, y, z),
            scale,
        }
    }

    /// True if any position, rotation or scale component differs by more than `epsilon`
    pub fn differs_from(&self, other: &Transform, epsilon: f32) -> bool {
        !self.position.abs_diff_eq(other.position, epsilon)
            || !self.rotation.abs_diff_eq(other.rotation, epsilon)
            || !self.scale.abs_diff_eq(other.scale, epsilon)
    }

    /// Component-wise near equality
    pub fn approx_eq(&self, other: &Transform, epsilon: f32) -> bool {
        !self.differs_from(other, epsilon)
    }

    /// Near equality of the composed matrices.
    ///
    /// Two euler triples can describe the same orientation, so this is the
    /// comparison to use after a transform went through a matrix decomposition.
    pub fn approx_eq_composed(&self, other: &Transform, epsilon: f32) -> bool {
        self.to_matrix().abs_diff_eq(other.to_matrix(), epsilon)
    }

    /// Copy with every scale component raised to at least `floor`
    pub fn with_scale_floor(mut self, floor: f32) -> Self {
        self.scale = self.scale.max(Vec3::splat(floor));
        self
    }
}

/// A half-line in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray, normalizing the direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at parameter `t`
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Intersect with the horizontal plane `y = height`.
    ///
    /// Returns `None` when the ray is parallel to the plane or points away from it.
    pub fn intersect_horizontal_plane(&self, height: f32) -> Option<Vec3> {
        if self.direction.y.abs() < 1e-8 {
            return None;
        }
        let t = (height - self.origin.y) / self.direction.y;
        (t >= 0.0).then(|| self.at(t))
    }

    /// Intersect with the unit cube `[-0.5, 0.5]^3` placed by `world`.
    ///
    /// Returns the ray parameter of the nearest hit in front of the origin.
    pub fn intersect_unit_cube(&self, world: &Mat4) -> Option<f32> {
        let inverse = world.inverse();
        let origin = inverse.transform_point3(self.origin);
        let direction = inverse.transform_vector3(self.direction);

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < 1e-12 {
                if !(-0.5..=0.5).contains(&o) {
                    return None;
                }
                continue;
            }
            let t1 = (-0.5 - o) / d;
            let t2 = (0.5 - o) / d;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            None
        } else if t_min >= 0.0 {
            Some(t_min)
        } else {
            Some(t_max)
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Bounds of the unit cube placed by `world`
    pub fn from_unit_cube(world: &Mat4) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for corner in 0..8 {
            let local = Vec3::new(
                if corner & 1 == 0 { -0.5 } else { 0.5 },
                if corner & 2 == 0 { -0.5 } else { 0.5 },
                if corner & 4 == 0 { -0.5 } else { 0.5 },
            );
            let p = world.transform_point3(local);
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    /// Smallest box enclosing both
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_round_trip() {
        let t = Transform {
            position: Vec3::new(1.0, 2.0, -3.0),
            rotation: Vec3::new(0.3, -0.2, 0.9),
            scale: Vec3::new(1.0, 2.0, 0.5),
        };
        let back = Transform::from_matrix(&t.to_matrix());
        assert!(back.approx_eq(&t, 1e-5));
    }

    #[test]
    fn test_differs_from_uses_epsilon() {
        let a = Transform::IDENTITY;
        let mut b = a;
        b.position.x += 5e-7;
        assert!(!a.differs_from(&b, TRANSFORM_EPSILON));
        b.scale.z += 1e-3;
        assert!(a.differs_from(&b, TRANSFORM_EPSILON));
    }

    #[test]
    fn test_ground_plane_intersection() {
        let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(1.0, -1.0, 0.0));
        let hit = ray.intersect_horizontal_plane(0.0).unwrap();
        assert!(hit.abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-4));

        let upward = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        assert!(upward.intersect_horizontal_plane(0.0).is_none());
    }

    #[test]
    fn test_unit_cube_hit() {
        let world = Transform::from_position(Vec3::new(0.0, 0.0, -5.0)).to_matrix();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let t = ray.intersect_unit_cube(&world).unwrap();
        assert!((t - 4.5).abs() < 1e-5);

        let miss = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Z);
        assert!(miss.intersect_unit_cube(&world).is_none());
    }

    #[test]
    fn test_scale_floor() {
        let t = Transform {
            scale: Vec3::new(0.01, 2.0, -1.0),
            ..Transform::IDENTITY
        }
        .with_scale_floor(MIN_SCALE);
        assert_eq!(t.scale, Vec3::new(MIN_SCALE, 2.0, MIN_SCALE));
    }
}
