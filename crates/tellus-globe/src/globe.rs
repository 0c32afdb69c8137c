//! The globe model tying ellipsoid constants, projection, and elevations
//! together.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::DVec3;
use tellus_coords::{Position, Sector};
use tellus_projections::GeographicProjection;

use crate::elevations::ElevationSource;

static NEXT_GLOBE_ID: AtomicU64 = AtomicU64::new(1);

/// An ellipsoidal planet model flattened onto a map projection.
///
/// Model coordinates produced by a globe are projected coordinates: x east,
/// y north, z up, in meters.
pub struct Globe {
    /// Semi-major axis in meters.
    pub equatorial_radius: f64,
    /// Semi-minor axis in meters.
    pub polar_radius: f64,
    /// Square of the ellipsoid's first eccentricity.
    pub eccentricity_squared: f64,
    /// The projection mapping geographic coordinates to model space.
    pub projection: GeographicProjection,
    elevation_source: Option<Box<dyn ElevationSource>>,
    id: u64,
}

/// Identifies the state of a globe at a point in time.
///
/// Keys from the same globe compare equal until its projection changes or
/// its elevation source reports new data. Cached terrain keyed by state key
/// is regenerated when the key changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlobeStateKey {
    pub globe_id: u64,
    pub projection: &'static str,
    pub elevation_timestamp: u64,
}

impl Globe {
    /// Create a globe from ellipsoid constants.
    ///
    /// # Panics
    ///
    /// Panics if either radius is not strictly positive.
    #[must_use]
    pub fn new(
        equatorial_radius: f64,
        polar_radius: f64,
        eccentricity_squared: f64,
        projection: GeographicProjection,
        elevation_source: Option<Box<dyn ElevationSource>>,
    ) -> Self {
        assert!(equatorial_radius > 0.0, "equatorial radius must be positive");
        assert!(polar_radius > 0.0, "polar radius must be positive");

        Self {
            equatorial_radius,
            polar_radius,
            eccentricity_squared,
            projection,
            elevation_source,
            id: NEXT_GLOBE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// A WGS84 globe with zero elevations everywhere.
    #[must_use]
    pub fn wgs84(projection: GeographicProjection) -> Self {
        Self::new(
            6_378_137.0,
            6_356_752.3,
            0.006_694_379_990_13,
            projection,
            Some(Box::new(crate::ZeroElevationSource)),
        )
    }

    /// The process-unique identifier assigned at construction.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The current state key. See [`GlobeStateKey`].
    #[must_use]
    pub fn state_key(&self) -> GlobeStateKey {
        GlobeStateKey {
            globe_id: self.id,
            projection: self.projection.state_key(),
            elevation_timestamp: self.elevation_timestamp(),
        }
    }

    /// The geographic region the projection can represent, or `None` when
    /// the whole globe is representable.
    #[must_use]
    pub fn projection_limits(&self) -> Option<Sector> {
        self.projection.projection_limits()
    }

    /// Map a geographic position to Cartesian model coordinates.
    #[must_use]
    pub fn geographic_to_cartesian(&self, latitude: f64, longitude: f64, elevation: f64) -> DVec3 {
        self.projection.geographic_to_cartesian(
            self.equatorial_radius,
            self.eccentricity_squared,
            latitude,
            longitude,
            elevation,
        )
    }

    /// Map a Cartesian model point back to a geographic position.
    #[must_use]
    pub fn cartesian_to_geographic(&self, point: DVec3) -> Position {
        self.projection
            .cartesian_to_geographic(self.equatorial_radius, self.eccentricity_squared, point)
    }

    /// Map a regular geographic grid to model points relative to
    /// `reference_center`. See
    /// [`GeographicProjection::geographic_to_cartesian_grid`] for the grid
    /// layout and buffer contracts.
    pub fn compute_points_for_grid(
        &self,
        sector: &Sector,
        num_lat: usize,
        num_lon: usize,
        elevations: &[f64],
        reference_center: DVec3,
        out: &mut [DVec3],
    ) {
        self.projection.geographic_to_cartesian_grid(
            self.equatorial_radius,
            self.eccentricity_squared,
            sector,
            num_lat,
            num_lon,
            elevations,
            reference_center,
            out,
        );
    }

    /// Whether this globe has an elevation source attached.
    #[must_use]
    pub fn has_elevations(&self) -> bool {
        self.elevation_source.is_some()
    }

    /// Replace the elevation source. Pass `None` to remove it.
    pub fn set_elevation_source(&mut self, source: Option<Box<dyn ElevationSource>>) {
        self.elevation_source = source;
    }

    /// The elevation source's timestamp, or 0 without a source.
    #[must_use]
    pub fn elevation_timestamp(&self) -> u64 {
        self.elevation_source.as_deref().map_or(0, ElevationSource::timestamp)
    }

    /// The elevation extremes for `sector`, or `None` when unknown.
    #[must_use]
    pub fn min_and_max_elevations_for_sector(&self, sector: &Sector) -> Option<(f64, f64)> {
        self.elevation_source
            .as_deref()
            .and_then(|source| source.min_and_max_elevations_for_sector(sector))
    }

    /// Fill `out` with grid elevations for `sector`. Returns `false` when no
    /// data is available.
    pub fn elevations_for_grid(
        &self,
        sector: &Sector,
        num_lat: usize,
        num_lon: usize,
        out: &mut [f64],
    ) -> bool {
        self.elevation_source
            .as_deref()
            .is_some_and(|source| source.elevations_for_grid(sector, num_lat, num_lon, out))
    }
}

impl fmt::Debug for Globe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Globe")
            .field("id", &self.id)
            .field("equatorial_radius", &self.equatorial_radius)
            .field("polar_radius", &self.polar_radius)
            .field("eccentricity_squared", &self.eccentricity_squared)
            .field("projection", &self.projection)
            .field("has_elevations", &self.has_elevations())
            .finish()
    }
}
