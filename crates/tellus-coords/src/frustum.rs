//! View-frustum culling in double-precision model space.
//!
//! Terrain tiles are culled against the frustum of the current
//! modelview-projection matrix before any level-of-detail decision is made,
//! so tiles behind the camera or off screen never subdivide.

use crate::BoundingBox;
use glam::{DMat4, DVec3, DVec4};

/// Result of testing a bounding volume against the frustum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// The volume is entirely inside the frustum.
    Inside,
    /// The volume is entirely outside the frustum.
    Outside,
    /// The volume straddles one or more frustum planes.
    Intersecting,
}

/// A plane in Hessian normal form.
/// The plane equation is: `normal.dot(point) + distance >= 0` means "inside".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: DVec3,
    pub distance: f64,
}

impl Plane {
    /// Create a plane from a unit normal and distance.
    #[must_use]
    pub const fn new(normal: DVec3, distance: f64) -> Self {
        Self { normal, distance }
    }

    /// Build a plane from raw `(a, b, c, d)` coefficients, scaling them so
    /// the normal has unit length.
    #[must_use]
    pub fn from_coefficients(coefficients: DVec4) -> Self {
        let normal = coefficients.truncate();
        let inv_len = normal.length().recip();
        Self {
            normal: normal * inv_len,
            distance: coefficients.w * inv_len,
        }
    }

    /// Distance from `point` to the plane, positive on the inside.
    #[must_use]
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) + self.distance
    }

    /// Whether `point` lies on the inside (non-negative) half-space.
    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.signed_distance(point) >= 0.0
    }
}

/// A view frustum bounded by six planes whose normals point inward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    /// Ordered: left, right, bottom, top, near, far.
    planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six inward-facing planes.
    #[must_use]
    pub const fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract the frustum of a modelview-projection matrix.
    ///
    /// Each clip plane is a sum or difference of two matrix rows, normalized
    /// so plane distances are in model units. The matrix is assumed to map
    /// to OpenGL clip space (depth in `[-1, 1]`).
    #[must_use]
    pub fn from_matrix(matrix: &DMat4) -> Self {
        let r0 = matrix.row(0);
        let r1 = matrix.row(1);
        let r2 = matrix.row(2);
        let r3 = matrix.row(3);

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0), // left
                Plane::from_coefficients(r3 - r0), // right
                Plane::from_coefficients(r3 + r1), // bottom
                Plane::from_coefficients(r3 - r1), // top
                Plane::from_coefficients(r3 + r2), // near
                Plane::from_coefficients(r3 - r2), // far
            ],
        }
    }

    #[must_use]
    pub fn left(&self) -> &Plane {
        &self.planes[0]
    }

    #[must_use]
    pub fn right(&self) -> &Plane {
        &self.planes[1]
    }

    #[must_use]
    pub fn bottom(&self) -> &Plane {
        &self.planes[2]
    }

    #[must_use]
    pub fn top(&self) -> &Plane {
        &self.planes[3]
    }

    #[must_use]
    pub fn near(&self) -> &Plane {
        &self.planes[4]
    }

    #[must_use]
    pub fn far(&self) -> &Plane {
        &self.planes[5]
    }

    /// Whether a point is inside all six frustum planes.
    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.planes.iter().all(|plane| plane.contains_point(point))
    }

    /// Test an axis-aligned box against the frustum using the
    /// "p-vertex / n-vertex" method. For each plane, the box vertex most in
    /// the direction of the plane normal (p-vertex) and the vertex most
    /// against it (n-vertex) are classified:
    /// - p-vertex outside means the whole box is outside that plane.
    /// - n-vertex outside means the box straddles that plane.
    #[must_use]
    pub fn intersects_box(&self, bounds: &BoundingBox) -> Intersection {
        let mut all_inside = true;

        for plane in &self.planes {
            let p_vertex = DVec3::new(
                if plane.normal.x >= 0.0 { bounds.max.x } else { bounds.min.x },
                if plane.normal.y >= 0.0 { bounds.max.y } else { bounds.min.y },
                if plane.normal.z >= 0.0 { bounds.max.z } else { bounds.min.z },
            );

            if !plane.contains_point(p_vertex) {
                return Intersection::Outside;
            }

            let n_vertex = DVec3::new(
                if plane.normal.x >= 0.0 { bounds.min.x } else { bounds.max.x },
                if plane.normal.y >= 0.0 { bounds.min.y } else { bounds.max.y },
                if plane.normal.z >= 0.0 { bounds.min.z } else { bounds.max.z },
            );

            if !plane.contains_point(n_vertex) {
                all_inside = false;
            }
        }

        if all_inside {
            Intersection::Inside
        } else {
            Intersection::Intersecting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Perspective camera at the origin looking down -Z, 90 degree FOV.
    fn make_frustum() -> Frustum {
        let projection =
            DMat4::perspective_rh_gl(90.0_f64.to_radians(), 1.0, 1.0, 1000.0);
        Frustum::from_matrix(&projection)
    }

    #[test]
    fn test_plane_normals_are_unit_length() {
        let frustum = make_frustum();
        for plane in [
            frustum.left(),
            frustum.right(),
            frustum.bottom(),
            frustum.top(),
            frustum.near(),
            frustum.far(),
        ] {
            assert!((plane.normal.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_point_on_axis_is_inside() {
        let frustum = make_frustum();
        assert!(frustum.contains_point(DVec3::new(0.0, 0.0, -500.0)));
    }

    #[test]
    fn test_point_behind_camera_is_outside() {
        let frustum = make_frustum();
        assert!(!frustum.contains_point(DVec3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn test_point_beyond_far_plane_is_outside() {
        let frustum = make_frustum();
        assert!(!frustum.contains_point(DVec3::new(0.0, 0.0, -2000.0)));
    }

    #[test]
    fn test_point_outside_side_planes() {
        let frustum = make_frustum();
        // At z = -100 a 90 degree FOV spans x in [-100, 100]
        assert!(frustum.contains_point(DVec3::new(99.0, 0.0, -100.0)));
        assert!(!frustum.contains_point(DVec3::new(101.0, 0.0, -100.0)));
        assert!(!frustum.contains_point(DVec3::new(0.0, -101.0, -100.0)));
    }

    #[test]
    fn test_box_fully_inside() {
        let frustum = make_frustum();
        let bounds = BoundingBox::new(
            DVec3::new(-10.0, -10.0, -600.0),
            DVec3::new(10.0, 10.0, -400.0),
        );
        assert_eq!(frustum.intersects_box(&bounds), Intersection::Inside);
    }

    #[test]
    fn test_box_fully_outside() {
        let frustum = make_frustum();
        let bounds = BoundingBox::new(
            DVec3::new(-10.0, -10.0, 100.0),
            DVec3::new(10.0, 10.0, 200.0),
        );
        assert_eq!(frustum.intersects_box(&bounds), Intersection::Outside);
    }

    #[test]
    fn test_box_straddling_near_plane() {
        let frustum = make_frustum();
        let bounds = BoundingBox::new(
            DVec3::new(-10.0, -10.0, -50.0),
            DVec3::new(10.0, 10.0, 50.0),
        );
        assert_eq!(frustum.intersects_box(&bounds), Intersection::Intersecting);
    }

    #[test]
    fn test_signed_distance_sign_convention() {
        let plane = Plane::new(DVec3::X, 0.0);
        assert!(plane.signed_distance(DVec3::new(5.0, 0.0, 0.0)) > 0.0);
        assert!(plane.signed_distance(DVec3::new(-5.0, 0.0, 0.0)) < 0.0);
        assert!(plane.contains_point(DVec3::ZERO));
    }

    #[test]
    fn test_from_coefficients_normalizes() {
        let plane = Plane::from_coefficients(DVec4::new(0.0, 3.0, 0.0, 6.0));
        assert_eq!(plane.normal, DVec3::Y);
        assert_eq!(plane.distance, 2.0);
    }
}
