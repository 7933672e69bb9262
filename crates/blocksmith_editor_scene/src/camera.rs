// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera capability consumed by the interaction core.
//!
//! The rendering engine owns the real camera. The editor only needs to cast
//! rays through the screen, project points onto it, and know how the camera
//! is oriented so that pointer motion can be mapped onto world directions.

use crate::math::Ray;
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Screen/world projection capability.
///
/// Screen positions are normalized device coordinates: x and y in `[-1, 1]`,
/// y pointing up.
pub trait Viewport {
    /// World-space ray through a screen position
    fn screen_ray(&self, ndc: Vec2) -> Ray;

    /// Project a world point to `(ndc.x, ndc.y, depth)`.
    ///
    /// Depth is below 1 only for points in front of the camera and inside the
    /// far plane.
    fn project(&self, world: Vec3) -> Vec3;

    /// World orientation of the camera
    fn camera_rotation(&self) -> Quat;

    /// Camera right vector in world space
    fn camera_right(&self) -> Vec3 {
        self.camera_rotation() * Vec3::X
    }

    /// Camera up vector in world space
    fn camera_up(&self) -> Vec3 {
        self.camera_rotation() * Vec3::Y
    }
}

/// Orbiting perspective camera
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Camera position
    pub position: Vec3,
    /// Camera target (look-at point)
    pub target: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Viewport width / height
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
    /// Orbit distance from target
    pub distance: f32,
    /// Orbit yaw angle in radians
    pub yaw: f32,
    /// Orbit pitch angle in radians
    pub pitch: f32,
    /// Rotation speed
    pub rotate_speed: f32,
    /// Zoom speed
    pub zoom_speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            fov: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            distance: 10.0,
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: std::f32::consts::FRAC_PI_6,
            rotate_speed: 0.01,
            zoom_speed: 1.0,
        };
        camera.update_position();
        camera
    }
}

impl OrbitCamera {
    /// Create a camera with default orbit parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera looking at `target` from the given yaw/pitch/distance
    pub fn looking_at(target: Vec3, yaw: f32, pitch: f32, distance: f32) -> Self {
        let mut camera = Self {
            target,
            yaw,
            pitch,
            distance,
            ..Self::default()
        };
        camera.update_position();
        camera
    }

    /// Orbit the camera around the target
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        self.yaw += delta_x * self.rotate_speed;
        self.pitch += delta_y * self.rotate_speed;

        // Clamp pitch to avoid gimbal lock
        self.pitch = self.pitch.clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );

        self.update_position();
    }

    /// Pan the camera (move target)
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let pan_speed = self.distance * 0.001;
        let offset = self.camera_right() * (-delta_x * pan_speed) + self.camera_up() * (delta_y * pan_speed);
        self.target += offset;
        self.update_position();
    }

    /// Zoom the camera (change distance)
    pub fn zoom(&mut self, delta: f32) {
        self.distance *= 1.0 - delta * self.zoom_speed * 0.1;
        self.distance = self.distance.clamp(0.1, 10000.0);
        self.update_position();
    }

    /// Update camera position from orbit parameters
    fn update_position(&mut self) {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.position = self.target + Vec3::new(x, y, z);
    }

    /// View matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// Projection matrix (depth mapped to `[0, 1]`)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect.max(1e-3), self.near, self.far)
    }

    fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Viewport for OrbitCamera {
    fn screen_ray(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(near, far - near)
    }

    fn project(&self, world: Vec3) -> Vec3 {
        let clip = self.view_projection() * Vec4::new(world.x, world.y, world.z, 1.0);
        if clip.w <= f32::EPSILON {
            // Behind the camera
            return Vec3::new(0.0, 0.0, 2.0);
        }
        clip.truncate() / clip.w
    }

    fn camera_rotation(&self) -> Quat {
        let (_, rotation, _) = self.view_matrix().inverse().to_scale_rotation_translation();
        rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_ray_hits_target() {
        let camera = OrbitCamera::looking_at(Vec3::ZERO, 0.0, 0.6, 12.0);
        let ray = camera.screen_ray(Vec2::ZERO);
        let hit = ray.intersect_horizontal_plane(0.0).unwrap();
        assert!(hit.abs_diff_eq(Vec3::ZERO, 1e-3));
    }

    #[test]
    fn test_projection_depth() {
        let camera = OrbitCamera::looking_at(Vec3::ZERO, 0.0, 0.3, 10.0);
        let front = camera.project(Vec3::ZERO);
        assert!(front.z < 1.0);
        assert!(front.truncate().abs_diff_eq(Vec2::ZERO, 1e-4));

        let behind = camera.project(camera.position * 2.0);
        assert!(behind.z >= 1.0);
    }

    #[test]
    fn test_camera_axes_are_orthonormal() {
        let camera = OrbitCamera::looking_at(Vec3::ZERO, 0.7, 0.4, 8.0);
        let right = camera.camera_right();
        let up = camera.camera_up();
        assert!((right.length() - 1.0).abs() < 1e-4);
        assert!(right.dot(up).abs() < 1e-4);
        // Right stays horizontal for an orbit camera
        assert!(right.y.abs() < 1e-4);
        assert!(up.y > 0.0);
    }
}
