//! View frustum construction and conservative box rejection

use super::bounds::Bounds;
use crate::foundation::math::Vec3;

/// Plane stored as a unit normal and its offset from the origin along it.
///
/// Points with `normal · p >= distance` lie on the inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing into the kept half-space
    pub normal: Vec3,
    /// `normal · p` for any point `p` on the plane
    pub distance: f32,
}

impl Plane {
    /// Plane through `point` facing along `normal`
    pub fn from_normal_and_point(normal: Vec3, point: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: normal.dot(&point),
        }
    }

    /// Plane through three points; the normal is `(p3 - p1) × (p2 - p1)`
    pub fn from_points(p1: Vec3, p2: Vec3, p3: Vec3) -> Self {
        let normal = (p3 - p1).cross(&(p2 - p1)).normalize();
        Self {
            normal,
            distance: normal.dot(&p1),
        }
    }

    /// Signed distance from the plane, positive on the inside
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) - self.distance
    }
}

/// Index of each plane in [`Frustum::planes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumPlane {
    /// Near clipping plane
    Near = 0,
    /// Far clipping plane
    Far = 1,
    /// Top side
    Top = 2,
    /// Bottom side
    Bottom = 3,
    /// Left side
    Left = 4,
    /// Right side
    Right = 5,
}

/// Six-plane view frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Near, far, top, bottom, left, right
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Access a single plane
    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    /// Conservative rejection test.
    ///
    /// Returns `true` only when all eight corners of `bounds` are strictly
    /// outside one of the planes. Boxes that straddle plane intersections
    /// outside the frustum may still be reported visible; boxes inside are
    /// never rejected. Empty boxes are always outside.
    pub fn is_outside(&self, bounds: &Bounds) -> bool {
        if bounds.is_empty() {
            return true;
        }

        let corners = bounds.corners();
        self.planes.iter().any(|plane| {
            corners
                .iter()
                .all(|corner| plane.signed_distance(*corner) < 0.0)
        })
    }

    /// Whether a point lies inside all six planes
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.signed_distance(point) >= 0.0)
    }
}

/// Build the view frustum of a perspective camera.
///
/// `field_of_view` is the full vertical angle in radians and `aspect_ratio`
/// is width over height.
pub fn construct_frustum(
    field_of_view: f32,
    far_plane: f32,
    near_plane: f32,
    eye: Vec3,
    target: Vec3,
    up: Vec3,
    aspect_ratio: f32,
) -> Frustum {
    let forward = target - eye;
    let left = up.cross(&forward);
    let up = forward.cross(&left);

    let forward = forward.normalize();
    let left = left.normalize();
    let up = up.normalize();

    let near_center = eye + forward * near_plane;
    let far_center = eye + forward * far_plane;

    let a = 2.0 * (field_of_view * 0.5).tan();
    let near_height = near_plane * a;
    let far_height = far_plane * a;
    let near_width = aspect_ratio * near_height;
    let far_width = aspect_ratio * far_height;

    let far_top_left = far_center + left * (0.5 * far_width) + up * (0.5 * far_height);
    let far_bottom_left = far_top_left - up * far_height;
    let far_top_right = far_top_left - left * far_width;
    let far_bottom_right = far_top_right - up * far_height;

    let near_top_left = near_center + left * (0.5 * near_width) + up * (0.5 * near_height);
    let near_bottom_left = near_top_left - up * near_height;
    let near_bottom_right = near_bottom_left - left * near_width;

    Frustum::new([
        Plane::from_normal_and_point(forward, near_center),
        Plane::from_normal_and_point(-forward, far_center),
        Plane::from_points(far_top_left, near_top_left, far_top_right),
        Plane::from_points(far_bottom_left, far_bottom_right, near_bottom_left),
        Plane::from_points(far_bottom_left, near_bottom_left, far_top_left),
        Plane::from_points(far_bottom_right, far_top_right, near_bottom_right),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants;
    use approx::assert_relative_eq;

    fn forward_z_frustum() -> Frustum {
        construct_frustum(
            constants::HALF_PI,
            100.0,
            1.0,
            Vec3::zeros(),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::y(),
            1.0,
        )
    }

    fn cube_at(center: Vec3) -> Bounds {
        Bounds::from_center_extents(center, Vec3::repeat(0.5))
    }

    #[test]
    fn test_planes_face_inward() {
        let frustum = forward_z_frustum();
        let inside = Vec3::new(0.0, 0.0, 10.0);
        for plane in &frustum.planes {
            assert_relative_eq!(plane.normal.norm(), 1.0, epsilon = 1e-5);
            assert!(plane.signed_distance(inside) > 0.0);
        }
        assert!(frustum.contains_point(inside));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_near_and_far_planes() {
        let frustum = forward_z_frustum();
        let near = frustum.plane(FrustumPlane::Near);
        let far = frustum.plane(FrustumPlane::Far);
        assert_relative_eq!(near.normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(near.distance, 1.0, epsilon = 1e-6);
        assert_relative_eq!(far.normal, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(far.distance, -100.0, epsilon = 1e-4);
    }

    #[test]
    fn test_box_in_front_visible_box_behind_culled() {
        let frustum = forward_z_frustum();
        assert!(!frustum.is_outside(&cube_at(Vec3::new(0.0, 0.0, 5.0))));
        assert!(frustum.is_outside(&cube_at(Vec3::new(0.0, 0.0, -5.0))));
    }

    #[test]
    fn test_side_and_far_rejection() {
        let frustum = forward_z_frustum();
        // 90 degree fov: at z = 5 the half width is 5
        assert!(frustum.is_outside(&cube_at(Vec3::new(8.0, 0.0, 5.0))));
        assert!(frustum.is_outside(&cube_at(Vec3::new(-8.0, 0.0, 5.0))));
        assert!(frustum.is_outside(&cube_at(Vec3::new(0.0, 8.0, 5.0))));
        assert!(frustum.is_outside(&cube_at(Vec3::new(0.0, -8.0, 5.0))));
        assert!(frustum.is_outside(&cube_at(Vec3::new(0.0, 0.0, 150.0))));
    }

    #[test]
    fn test_straddling_box_is_kept() {
        let frustum = forward_z_frustum();
        let big = Bounds::new(Vec3::new(-50.0, -50.0, -50.0), Vec3::new(50.0, 50.0, 50.0));
        assert!(!frustum.is_outside(&big));

        // Partly past the right edge
        assert!(!frustum.is_outside(&cube_at(Vec3::new(5.0, 0.0, 5.0))));
    }

    #[test]
    fn test_inside_boxes_never_rejected() {
        let frustum = forward_z_frustum();
        for z in [2.0_f32, 10.0, 40.0, 90.0] {
            for x in [-0.5_f32, 0.0, 0.5] {
                for y in [-0.5_f32, 0.0, 0.5] {
                    let center = Vec3::new(x * z, y * z, z);
                    let b = Bounds::from_center_extents(center, Vec3::repeat(0.25));
                    if b.corners().iter().all(|c| frustum.contains_point(*c)) {
                        assert!(!frustum.is_outside(&b), "rejected box at {:?}", center);
                    }
                }
            }
        }
    }

    #[test]
    fn test_empty_bounds_outside() {
        let frustum = forward_z_frustum();
        assert!(frustum.is_outside(&Bounds::empty()));
    }

    #[test]
    fn test_wide_aspect_ratio() {
        let frustum = construct_frustum(
            constants::HALF_PI,
            100.0,
            1.0,
            Vec3::zeros(),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::y(),
            2.0,
        );
        // Horizontal half width at z = 5 is 10, vertical stays 5
        assert!(!frustum.is_outside(&cube_at(Vec3::new(8.0, 0.0, 5.0))));
        assert!(frustum.is_outside(&cube_at(Vec3::new(0.0, 8.0, 5.0))));
    }
}
