//! Axis-aligned bounding boxes

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use serde::{Deserialize, Serialize};

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
}

impl Axis {
    /// Component index of this axis
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Axis-aligned bounding box.
///
/// The empty box has `lower = +inf` and `upper = -inf` on every axis and is
/// the identity for [`Bounds::union`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub lower: Vec3,
    /// Maximum corner
    pub upper: Vec3,
}

impl Bounds {
    /// Create bounds from two corners
    pub fn new(lower: Vec3, upper: Vec3) -> Self {
        Self { lower, upper }
    }

    /// The empty box
    pub fn empty() -> Self {
        Self {
            lower: Vec3::repeat(f32::INFINITY),
            upper: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// A box covering all of space
    pub fn infinite() -> Self {
        Self {
            lower: Vec3::repeat(f32::NEG_INFINITY),
            upper: Vec3::repeat(f32::INFINITY),
        }
    }

    /// Create a box centered at a point with the given half extents
    pub fn from_center_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            lower: center - half_extents,
            upper: center + half_extents,
        }
    }

    /// Whether the box contains no points
    pub fn is_empty(&self) -> bool {
        self.lower.x > self.upper.x || self.lower.y > self.upper.y || self.lower.z > self.upper.z
    }

    /// Componentwise min of lowers and max of uppers
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            lower: self.lower.inf(&other.lower),
            upper: self.upper.sup(&other.upper),
        }
    }

    /// Grow the box to include `point`
    pub fn include_point(&mut self, point: Vec3) {
        self.lower = self.lower.inf(&point);
        self.upper = self.upper.sup(&point);
    }

    /// Center of the box
    pub fn center(&self) -> Vec3 {
        (self.lower + self.upper) * 0.5
    }

    /// Full width of the box along each axis
    pub fn size(&self) -> Vec3 {
        self.upper - self.lower
    }

    /// Axis of greatest extent; exact ties go to X, then Y, then Z
    pub fn major_axis(&self) -> Axis {
        let size = self.size();
        let max_width = size.x.max(size.y).max(size.z);

        if size.x == max_width {
            Axis::X
        } else if size.y == max_width {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        let (l, u) = (self.lower, self.upper);
        [
            Vec3::new(l.x, l.y, l.z),
            Vec3::new(l.x, l.y, u.z),
            Vec3::new(l.x, u.y, l.z),
            Vec3::new(l.x, u.y, u.z),
            Vec3::new(u.x, l.y, l.z),
            Vec3::new(u.x, l.y, u.z),
            Vec3::new(u.x, u.y, l.z),
            Vec3::new(u.x, u.y, u.z),
        ]
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.lower.x && point.x <= self.upper.x &&
        point.y >= self.lower.y && point.y <= self.upper.y &&
        point.z >= self.lower.z && point.z <= self.upper.z
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

/// Transform all eight corners of `bounds` by `matrix` (as points, w = 1) and
/// return the axis-aligned box enclosing them. An empty box stays empty.
pub fn transform_bounds(matrix: &Mat4, bounds: &Bounds) -> Bounds {
    if bounds.is_empty() {
        return Bounds::empty();
    }
    let mut result = Bounds::empty();
    for corner in bounds.corners() {
        result.include_point(matrix.transform_point_affine(corner));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants;
    use approx::assert_relative_eq;

    fn unit_box() -> Bounds {
        Bounds::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0))
    }

    #[test]
    fn test_empty_is_union_identity() {
        let b = unit_box();
        assert_eq!(Bounds::empty().union(&b), b);
        assert_eq!(b.union(&Bounds::empty()), b);
        assert!(Bounds::empty().is_empty());
        assert!(!b.is_empty());
    }

    #[test]
    fn test_union() {
        let a = Bounds::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let b = Bounds::new(Vec3::new(-1.0, 0.5, 2.0), Vec3::new(0.5, 3.0, 4.0));
        let u = a.union(&b);
        assert_eq!(u.lower, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(u.upper, Vec3::new(1.0, 3.0, 4.0));
    }

    #[test]
    fn test_major_axis_tie_break() {
        let cube = Bounds::new(Vec3::zeros(), Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(cube.major_axis(), Axis::X);

        let yz = Bounds::new(Vec3::zeros(), Vec3::new(1.0, 2.0, 2.0));
        assert_eq!(yz.major_axis(), Axis::Y);

        let z = Bounds::new(Vec3::zeros(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(z.major_axis(), Axis::Z);
    }

    #[test]
    fn test_transform_identity_is_noop() {
        let b = unit_box();
        let t = transform_bounds(&Mat4::identity(), &b);
        assert_relative_eq!(t.lower, b.lower);
        assert_relative_eq!(t.upper, b.upper);
    }

    #[test]
    fn test_transform_empty_stays_empty() {
        let t = transform_bounds(&Mat4::translation(Vec3::new(1.0, 2.0, 3.0)), &Bounds::empty());
        assert!(t.is_empty());
        assert_eq!(t, Bounds::empty());
    }

    #[test]
    fn test_transform_translation_and_rotation() {
        let b = unit_box();
        let t = transform_bounds(&Mat4::translation(Vec3::new(10.0, 0.0, 0.0)), &b);
        assert_relative_eq!(t.lower, Vec3::new(9.0, -2.0, -3.0));
        assert_relative_eq!(t.upper, Vec3::new(11.0, 2.0, 3.0));

        // Quarter turn about Y swaps the X and Z extents
        let r = transform_bounds(&Mat4::rotation_y(constants::HALF_PI), &b);
        assert_relative_eq!(r.lower, Vec3::new(-3.0, -2.0, -1.0), epsilon = 1e-5);
        assert_relative_eq!(r.upper, Vec3::new(3.0, 2.0, 1.0), epsilon = 1e-5);
    }
}
