//! Axis-aligned bounding volumes in Cartesian space.

use glam::DVec3;

/// An axis-aligned bounding box in model coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Corner with the smallest coordinate on every axis.
    pub min: DVec3,
    /// Corner with the largest coordinate on every axis.
    pub max: DVec3,
}

impl BoundingBox {
    /// Create a bounding box from its extreme corners.
    ///
    /// # Panics
    ///
    /// Panics if any component of `min` exceeds the corresponding component
    /// of `max`.
    #[must_use]
    pub fn new(min: DVec3, max: DVec3) -> Self {
        assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "bounding box min must not exceed max"
        );
        Self { min, max }
    }

    /// The tightest box enclosing every point in `points`.
    ///
    /// # Panics
    ///
    /// Panics if `points` is empty.
    #[must_use]
    pub fn from_points(points: &[DVec3]) -> Self {
        assert!(!points.is_empty(), "bounding box requires at least one point");
        let mut min = points[0];
        let mut max = points[0];
        for p in &points[1..] {
            min = min.min(*p);
            max = max.max(*p);
        }
        Self { min, max }
    }

    /// The box's center point.
    #[must_use]
    pub fn center(&self) -> DVec3 {
        0.5 * (self.min + self.max)
    }

    /// Half the diagonal length, the radius of the enclosing sphere.
    #[must_use]
    pub fn radius(&self) -> f64 {
        0.5 * self.min.distance(self.max)
    }

    /// Grow the box to cover `point`.
    pub fn expand_to_include(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Whether `point` lies inside the box, faces inclusive.
    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}
