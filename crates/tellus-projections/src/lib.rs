//! Geographic projections mapping latitude and longitude onto flat
//! Cartesian model space.
//!
//! Each projection converts geographic coordinates to model coordinates and
//! back for a globe of a given equatorial radius and eccentricity. The
//! projected space is metric: a tile's screen footprint can be measured
//! directly in model units, which is what drives terrain level-of-detail
//! selection.

mod equirectangular;
mod mercator;
mod polar;

use glam::DVec3;
use tellus_coords::{Position, Sector};

/// The closed set of supported map projections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GeographicProjection {
    /// Equidistant cylindrical, also known as Plate Carree. Spherical.
    #[default]
    Equirectangular,
    /// Ellipsoidal Mercator, latitude limited to 78 degrees each side.
    Mercator,
    /// Azimuthal equidistant centered on the north pole. Spherical.
    PolarNorth,
    /// Azimuthal equidistant centered on the south pole. Spherical.
    PolarSouth,
}

impl GeographicProjection {
    /// Look up a projection by its configuration name.
    ///
    /// Names are matched case-insensitively: `"equirectangular"`,
    /// `"mercator"`, `"polar-north"`, `"polar-south"`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("equirectangular") {
            Some(Self::Equirectangular)
        } else if name.eq_ignore_ascii_case("mercator") {
            Some(Self::Mercator)
        } else if name.eq_ignore_ascii_case("polar-north") {
            Some(Self::PolarNorth)
        } else if name.eq_ignore_ascii_case("polar-south") {
            Some(Self::PolarSouth)
        } else {
            None
        }
    }

    /// A string identifying this projection in globe state keys. Cached
    /// terrain is invalidated when the key changes.
    #[must_use]
    pub fn state_key(&self) -> &'static str {
        match self {
            Self::Equirectangular => "projection equirectangular",
            Self::Mercator => "projection mercator",
            Self::PolarNorth => "projection polar north",
            Self::PolarSouth => "projection polar south",
        }
    }

    /// The geographic region this projection can represent, or `None` when
    /// the whole globe is representable.
    ///
    /// Terrain tiles entirely outside the limits are skipped during tile
    /// selection.
    #[must_use]
    pub fn projection_limits(&self) -> Option<Sector> {
        match self {
            Self::Mercator => Some(Sector::new(-78.0, 78.0, -180.0, 180.0)),
            _ => None,
        }
    }

    /// Whether the projected space wraps continuously in longitude.
    #[must_use]
    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Equirectangular | Self::Mercator)
    }

    /// Map a geographic position to Cartesian model coordinates.
    ///
    /// `latitude` and `longitude` are in degrees, `elevation` in meters.
    /// Latitudes outside a projection's limits are clamped silently.
    #[must_use]
    pub fn geographic_to_cartesian(
        &self,
        equatorial_radius: f64,
        eccentricity_squared: f64,
        latitude: f64,
        longitude: f64,
        elevation: f64,
    ) -> DVec3 {
        match self {
            Self::Equirectangular => {
                equirectangular::to_cartesian(equatorial_radius, latitude, longitude, elevation)
            }
            Self::Mercator => mercator::to_cartesian(
                equatorial_radius,
                eccentricity_squared,
                latitude,
                longitude,
                elevation,
            ),
            Self::PolarNorth => {
                polar::to_cartesian(equatorial_radius, true, latitude, longitude, elevation)
            }
            Self::PolarSouth => {
                polar::to_cartesian(equatorial_radius, false, latitude, longitude, elevation)
            }
        }
    }

    /// Map a regular geographic grid spanning `sector` to Cartesian model
    /// coordinates, one point per grid vertex.
    ///
    /// `num_lat` and `num_lon` are cell counts; the grid has
    /// `(num_lat + 1) * (num_lon + 1)` vertices emitted row-major from the
    /// sector's south-west corner. The final row and column land exactly on
    /// the sector's north and east edges. Each vertex takes its elevation
    /// from `elevations` in the same order and is offset by
    /// `-reference_center`.
    ///
    /// # Panics
    ///
    /// Panics if `elevations` or `out` holds fewer than
    /// `(num_lat + 1) * (num_lon + 1)` entries.
    #[allow(clippy::too_many_arguments)]
    pub fn geographic_to_cartesian_grid(
        &self,
        equatorial_radius: f64,
        eccentricity_squared: f64,
        sector: &Sector,
        num_lat: usize,
        num_lon: usize,
        elevations: &[f64],
        reference_center: DVec3,
        out: &mut [DVec3],
    ) {
        let num_points = (num_lat + 1) * (num_lon + 1);
        assert!(
            elevations.len() >= num_points,
            "elevation buffer holds {} samples, grid needs {num_points}",
            elevations.len()
        );
        assert!(
            out.len() >= num_points,
            "output buffer holds {} points, grid needs {num_points}",
            out.len()
        );

        match self {
            Self::Equirectangular => equirectangular::to_cartesian_grid(
                equatorial_radius,
                sector,
                num_lat,
                num_lon,
                elevations,
                reference_center,
                out,
            ),
            Self::Mercator => mercator::to_cartesian_grid(
                equatorial_radius,
                eccentricity_squared,
                sector,
                num_lat,
                num_lon,
                elevations,
                reference_center,
                out,
            ),
            Self::PolarNorth => polar::to_cartesian_grid(
                equatorial_radius,
                true,
                sector,
                num_lat,
                num_lon,
                elevations,
                reference_center,
                out,
            ),
            Self::PolarSouth => polar::to_cartesian_grid(
                equatorial_radius,
                false,
                sector,
                num_lat,
                num_lon,
                elevations,
                reference_center,
                out,
            ),
        }
    }

    /// Map a Cartesian model point back to a geographic position.
    #[must_use]
    pub fn cartesian_to_geographic(
        &self,
        equatorial_radius: f64,
        eccentricity_squared: f64,
        point: DVec3,
    ) -> Position {
        match self {
            Self::Equirectangular => equirectangular::to_geographic(equatorial_radius, point),
            Self::Mercator => {
                mercator::to_geographic(equatorial_radius, eccentricity_squared, point)
            }
            Self::PolarNorth => polar::to_geographic(equatorial_radius, true, point),
            Self::PolarSouth => polar::to_geographic(equatorial_radius, false, point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS: f64 = 6_378_137.0;
    const ECC2: f64 = 0.006_694_379_990_13;

    #[test]
    fn test_from_name_accepts_known_projections() {
        assert_eq!(
            GeographicProjection::from_name("equirectangular"),
            Some(GeographicProjection::Equirectangular)
        );
        assert_eq!(
            GeographicProjection::from_name("Mercator"),
            Some(GeographicProjection::Mercator)
        );
        assert_eq!(
            GeographicProjection::from_name(" polar-north "),
            Some(GeographicProjection::PolarNorth)
        );
        assert_eq!(
            GeographicProjection::from_name("POLAR-SOUTH"),
            Some(GeographicProjection::PolarSouth)
        );
        assert_eq!(GeographicProjection::from_name("orthographic"), None);
    }

    #[test]
    fn test_state_keys_are_distinct() {
        let keys = [
            GeographicProjection::Equirectangular.state_key(),
            GeographicProjection::Mercator.state_key(),
            GeographicProjection::PolarNorth.state_key(),
            GeographicProjection::PolarSouth.state_key(),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_only_mercator_has_limits() {
        assert!(GeographicProjection::Equirectangular.projection_limits().is_none());
        assert!(GeographicProjection::PolarNorth.projection_limits().is_none());
        assert!(GeographicProjection::PolarSouth.projection_limits().is_none());
        let limits = GeographicProjection::Mercator
            .projection_limits()
            .unwrap();
        assert_eq!(limits.min_latitude, -78.0);
        assert_eq!(limits.max_latitude, 78.0);
    }

    #[test]
    fn test_continuity() {
        assert!(GeographicProjection::Equirectangular.is_continuous());
        assert!(GeographicProjection::Mercator.is_continuous());
        assert!(!GeographicProjection::PolarNorth.is_continuous());
        assert!(!GeographicProjection::PolarSouth.is_continuous());
    }

    #[test]
    fn test_grid_emits_row_major_vertices_from_south_west() {
        let sector = Sector::new(0.0, 10.0, 0.0, 10.0);
        let elevations = vec![0.0; 9];
        let mut out = vec![DVec3::ZERO; 9];
        GeographicProjection::Equirectangular.geographic_to_cartesian_grid(
            RADIUS,
            ECC2,
            &sector,
            2,
            2,
            &elevations,
            DVec3::ZERO,
            &mut out,
        );

        // First vertex is the south-west corner, last the north-east corner
        let sw =
            GeographicProjection::Equirectangular.geographic_to_cartesian(RADIUS, ECC2, 0.0, 0.0, 0.0);
        let ne = GeographicProjection::Equirectangular
            .geographic_to_cartesian(RADIUS, ECC2, 10.0, 10.0, 0.0);
        assert!((out[0] - sw).length() < 1e-6);
        assert!((out[8] - ne).length() < 1e-6);
        // Rows share y, columns share x
        assert_eq!(out[0].y, out[2].y);
        assert_eq!(out[0].x, out[6].x);
    }

    #[test]
    fn test_grid_subtracts_reference_center() {
        let sector = Sector::new(0.0, 1.0, 0.0, 1.0);
        let elevations = vec![100.0; 4];
        let center = DVec3::new(1000.0, 2000.0, 50.0);
        let mut out = vec![DVec3::ZERO; 4];
        GeographicProjection::Equirectangular.geographic_to_cartesian_grid(
            RADIUS,
            ECC2,
            &sector,
            1,
            1,
            &elevations,
            center,
            &mut out,
        );
        let absolute =
            GeographicProjection::Equirectangular.geographic_to_cartesian(RADIUS, ECC2, 0.0, 0.0, 100.0);
        assert!((out[0] - (absolute - center)).length() < 1e-9);
    }

    #[test]
    fn test_zero_cell_grid_emits_single_max_edge_vertex() {
        let sector = Sector::new(0.0, 10.0, 0.0, 20.0);
        let elevations = [0.0];
        let mut out = [DVec3::ZERO];
        GeographicProjection::Equirectangular.geographic_to_cartesian_grid(
            RADIUS,
            ECC2,
            &sector,
            0,
            0,
            &elevations,
            DVec3::ZERO,
            &mut out,
        );
        let ne = GeographicProjection::Equirectangular
            .geographic_to_cartesian(RADIUS, ECC2, 10.0, 20.0, 0.0);
        assert!((out[0] - ne).length() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "elevation buffer")]
    fn test_grid_panics_on_short_elevations() {
        let sector = Sector::new(0.0, 1.0, 0.0, 1.0);
        let elevations = [0.0; 3];
        let mut out = [DVec3::ZERO; 4];
        GeographicProjection::Equirectangular.geographic_to_cartesian_grid(
            RADIUS,
            ECC2,
            &sector,
            1,
            1,
            &elevations,
            DVec3::ZERO,
            &mut out,
        );
    }

    #[test]
    #[should_panic(expected = "output buffer")]
    fn test_grid_panics_on_short_output() {
        let sector = Sector::new(0.0, 1.0, 0.0, 1.0);
        let elevations = [0.0; 4];
        let mut out = [DVec3::ZERO; 2];
        GeographicProjection::Equirectangular.geographic_to_cartesian_grid(
            RADIUS,
            ECC2,
            &sector,
            1,
            1,
            &elevations,
            DVec3::ZERO,
            &mut out,
        );
    }
}
