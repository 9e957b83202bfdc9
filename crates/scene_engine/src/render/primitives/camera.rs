//! # Cameras
//!
//! The visibility pass needs four things from a camera: its world position,
//! view and projection matrices, and a frustum consistent with that
//! projection. [`ViewCamera`] captures exactly that.
//!
//! ## Coordinate System
//! Right-handed world space, Y up. View space looks down +Z and depth maps
//! to [0, 1], matching [`Mat4Ext::perspective`] and [`Mat4Ext::look_at`].

use crate::foundation::math::{constants, utils, Mat4, Mat4Ext, Vec3};
use crate::spatial::{construct_frustum, Frustum};

/// Camera collaborator used by the frame driver
pub trait ViewCamera {
    /// Eye position in world space
    fn position(&self) -> Vec3;

    /// World-to-view transform
    fn view_matrix(&self) -> Mat4;

    /// View-to-clip transform
    fn projection_matrix(&self) -> Mat4;

    /// Frustum matching the view and projection
    fn frustum(&self) -> Frustum;
}

/// Look-at perspective camera
///
/// Matrices are computed on demand from position, target and up.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Width over height of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use scene_engine::foundation::math::Vec3;
    /// use scene_engine::render::primitives::Camera;
    ///
    /// let camera = Camera::perspective(Vec3::new(0.0, 2.0, -5.0), 75.0, 16.0 / 9.0, 0.1, 100.0);
    /// assert_eq!(camera.target, Vec3::zeros());
    /// ```
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::y(),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Move the camera, keeping its target
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Aim at `target` with a custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Update the aspect ratio after a viewport resize
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Projection times view
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl ViewCamera for Camera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    fn frustum(&self) -> Frustum {
        construct_frustum(self.fov, self.far, self.near, self.position, self.target, self.up, self.aspect)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 3.0, -3.0),
            target: Vec3::zeros(),
            up: Vec3::y(),
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

const DEFAULT_NEAR_PLANE: f32 = 1.0;
const DEFAULT_FAR_PLANE: f32 = 500.0;
const DEFAULT_FOV: f32 = constants::PI / 3.0;
const PITCH_LIMIT: f32 = 0.1;

/// Free-flying camera oriented by yaw and pitch angles
///
/// Pitch is measured from +Y, so `HALF_PI` looks at the horizon. Yaw is
/// measured in the XZ plane from +X towards +Z.
#[derive(Debug, Clone)]
pub struct SphericalCamera {
    /// Camera position in world space
    pub position: Vec3,
    /// Heading in radians
    pub yaw: f32,
    /// Angle from straight up in radians
    pub pitch: f32,
    /// Distance to near clipping plane
    pub near_plane: f32,
    /// Distance to far clipping plane
    pub far_plane: f32,
    /// Vertical field of view in radians
    pub field_of_view: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
}

impl SphericalCamera {
    /// Camera with explicit orientation and clip planes
    pub fn new(position: Vec3, yaw: f32, pitch: f32, near_plane: f32, far_plane: f32, field_of_view: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
            near_plane,
            far_plane,
            field_of_view,
            aspect: 1.0,
        }
    }

    /// Set the viewport aspect ratio
    pub fn with_aspect_ratio(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.sin(),
            self.pitch.cos(),
            self.yaw.sin() * self.pitch.sin(),
        )
    }

    /// Unit vector to the camera's right, level with the horizon
    pub fn side(&self) -> Vec3 {
        Vec3::y().cross(&self.forward()).normalize()
    }

    /// Turn to face `target`. Does nothing if `target` is the eye position.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(direction) = (target - self.position).try_normalize(f32::EPSILON) else {
            log::warn!("SphericalCamera::look_at called with target at the eye position");
            return;
        };
        self.yaw = direction.z.atan2(direction.x);
        self.pitch = direction.y.clamp(-1.0, 1.0).acos();
    }

    /// Apply a yaw/pitch delta, wrapping yaw and keeping pitch off the poles
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw = (self.yaw + delta_yaw) % (2.0 * constants::PI);
        self.pitch = (self.pitch + delta_pitch).clamp(PITCH_LIMIT, constants::PI - PITCH_LIMIT);
    }

    /// Move along the view direction and sideways
    pub fn translate_local(&mut self, forward: f32, sideways: f32) {
        self.position += self.forward() * forward + self.side() * sideways;
    }
}

impl Default for SphericalCamera {
    fn default() -> Self {
        Self::new(
            Vec3::zeros(),
            0.0,
            constants::HALF_PI,
            DEFAULT_NEAR_PLANE,
            DEFAULT_FAR_PLANE,
            DEFAULT_FOV,
        )
    }
}

impl ViewCamera for SphericalCamera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.position + self.forward(), Vec3::y())
    }

    fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.field_of_view, self.aspect, self.near_plane, self.far_plane)
    }

    fn frustum(&self) -> Frustum {
        construct_frustum(
            self.field_of_view,
            self.far_plane,
            self.near_plane,
            self.position,
            self.position + self.forward(),
            Vec3::y(),
            self.aspect,
        )
    }
}
