//! Rectangular geographic regions.

use crate::Location;

/// A rectangular region in geographic coordinates, all bounds in degrees.
///
/// The invariant `min <= max` on each axis is expected but not enforced;
/// degenerate sectors (zero or negative span) are representable and degrade
/// gracefully in the predicates below.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sector {
    /// Southern bound in degrees.
    pub min_latitude: f64,
    /// Northern bound in degrees.
    pub max_latitude: f64,
    /// Western bound in degrees.
    pub min_longitude: f64,
    /// Eastern bound in degrees.
    pub max_longitude: f64,
}

impl Sector {
    /// The sector spanning the full globe.
    pub const FULL_SPHERE: Sector = Sector {
        min_latitude: -90.0,
        max_latitude: 90.0,
        min_longitude: -180.0,
        max_longitude: 180.0,
    };

    /// Create a sector from its bounds in degrees.
    #[must_use]
    pub const fn new(
        min_latitude: f64,
        max_latitude: f64,
        min_longitude: f64,
        max_longitude: f64,
    ) -> Self {
        Self {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }

    /// Latitudinal span in degrees.
    #[must_use]
    pub fn delta_latitude(&self) -> f64 {
        self.max_latitude - self.min_latitude
    }

    /// Longitudinal span in degrees.
    #[must_use]
    pub fn delta_longitude(&self) -> f64 {
        self.max_longitude - self.min_longitude
    }

    /// Latitude midway between the south and north bounds.
    #[must_use]
    pub fn centroid_latitude(&self) -> f64 {
        0.5 * (self.min_latitude + self.max_latitude)
    }

    /// Longitude midway between the west and east bounds.
    #[must_use]
    pub fn centroid_longitude(&self) -> f64 {
        0.5 * (self.min_longitude + self.max_longitude)
    }

    /// The sector's center point.
    #[must_use]
    pub fn centroid(&self) -> Location {
        Location::new(self.centroid_latitude(), self.centroid_longitude())
    }

    /// Whether the given location lies within this sector, bounds inclusive.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }

    /// Whether this sector and another have any point in common.
    ///
    /// Sectors that merely touch along an edge count as intersecting. Use
    /// [`Sector::overlaps`] when shared interior is required.
    #[must_use]
    pub fn intersects(&self, other: &Sector) -> bool {
        self.min_longitude <= other.max_longitude
            && self.max_longitude >= other.min_longitude
            && self.min_latitude <= other.max_latitude
            && self.max_latitude >= other.min_latitude
    }

    /// Whether this sector and another share interior area.
    #[must_use]
    pub fn overlaps(&self, other: &Sector) -> bool {
        self.min_longitude < other.max_longitude
            && self.max_longitude > other.min_longitude
            && self.min_latitude < other.max_latitude
            && self.max_latitude > other.min_latitude
    }

    /// The largest sector contained in both this sector and another.
    ///
    /// Disjoint inputs produce a degenerate sector (negative span).
    #[must_use]
    pub fn intersection(&self, other: &Sector) -> Sector {
        Sector {
            min_latitude: self.min_latitude.max(other.min_latitude),
            max_latitude: self.max_latitude.min(other.max_latitude),
            min_longitude: self.min_longitude.max(other.min_longitude),
            max_longitude: self.max_longitude.min(other.max_longitude),
        }
    }

    /// The smallest sector containing both this sector and another.
    #[must_use]
    pub fn union(&self, other: &Sector) -> Sector {
        Sector {
            min_latitude: self.min_latitude.min(other.min_latitude),
            max_latitude: self.max_latitude.max(other.max_latitude),
            min_longitude: self.min_longitude.min(other.min_longitude),
            max_longitude: self.max_longitude.max(other.max_longitude),
        }
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}] x [{}, {}]",
            self.min_latitude, self.max_latitude, self.min_longitude, self.max_longitude
        )
    }
}
