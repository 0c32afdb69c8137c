//! Ellipsoidal Mercator projection.
//!
//! Formulas follow Snyder, "Map Projections: A Working Manual", USGS
//! Professional Paper 1395, pages 44-45. Latitude is clamped to the
//! projection limits of 78 degrees each side; y diverges toward the poles.

use glam::DVec3;
use tellus_coords::{Position, Sector};

const MAX_LATITUDE: f64 = 78.0;

/// y for a latitude already clamped to the projection limits, in radians.
fn y_for_latitude(equatorial_radius: f64, eccentricity: f64, lat_radians: f64) -> f64 {
    let sin_lat = lat_radians.sin();
    let s = ((1.0 + sin_lat) / (1.0 - sin_lat))
        * ((1.0 - eccentricity * sin_lat) / (1.0 + eccentricity * sin_lat)).powf(eccentricity);
    0.5 * equatorial_radius * s.ln()
}

pub(crate) fn to_cartesian(
    equatorial_radius: f64,
    eccentricity_squared: f64,
    latitude: f64,
    longitude: f64,
    elevation: f64,
) -> DVec3 {
    let latitude = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let eccentricity = eccentricity_squared.sqrt();

    DVec3::new(
        equatorial_radius * longitude.to_radians(),
        y_for_latitude(equatorial_radius, eccentricity, latitude.to_radians()),
        elevation,
    )
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn to_cartesian_grid(
    equatorial_radius: f64,
    eccentricity_squared: f64,
    sector: &Sector,
    num_lat: usize,
    num_lon: usize,
    elevations: &[f64],
    reference_center: DVec3,
    out: &mut [DVec3],
) {
    let eccentricity = eccentricity_squared.sqrt();
    let delta_lat = sector.delta_latitude() / num_lat.max(1) as f64;
    let delta_lon = sector.delta_longitude() / num_lon.max(1) as f64;

    let mut pos = 0;
    for j in 0..=num_lat {
        let lat = if j == num_lat {
            sector.max_latitude
        } else {
            sector.min_latitude + delta_lat * j as f64
        };
        // Rows beyond the projection limits collapse onto the limit edge.
        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let y = y_for_latitude(equatorial_radius, eccentricity, lat.to_radians())
            - reference_center.y;

        for i in 0..=num_lon {
            let lon = if i == num_lon {
                sector.max_longitude
            } else {
                sector.min_longitude + delta_lon * i as f64
            };
            out[pos] = DVec3::new(
                equatorial_radius * lon.to_radians() - reference_center.x,
                y,
                elevations[pos] - reference_center.z,
            );
            pos += 1;
        }
    }
}

pub(crate) fn to_geographic(
    equatorial_radius: f64,
    eccentricity_squared: f64,
    point: DVec3,
) -> Position {
    // Snyder's series for the inverse, pages 45 and 19. The conformal
    // latitude chi is recovered from y, then corrected for the ellipsoid.
    let ecc2 = eccentricity_squared;
    let ecc4 = ecc2 * ecc2;
    let ecc6 = ecc4 * ecc2;
    let ecc8 = ecc6 * ecc2;

    let t = (-point.y / equatorial_radius).exp();
    let chi = std::f64::consts::FRAC_PI_2 - 2.0 * t.atan();

    let b = ecc2 / 2.0 + 5.0 * ecc4 / 24.0 + ecc6 / 12.0 + 13.0 * ecc8 / 360.0;
    let c = 7.0 * ecc4 / 48.0 + 29.0 * ecc6 / 240.0 + 811.0 * ecc8 / 11520.0;
    let d = 7.0 * ecc6 / 120.0 + 81.0 * ecc8 / 1120.0;
    let e = 4279.0 * ecc8 / 161280.0;

    let ap = chi - c + e;
    let bp = b - 3.0 * d;
    let cp = 2.0 * c - 8.0 * e;
    let dp = 4.0 * d;
    let ep = 8.0 * e;
    let s2 = (2.0 * chi).sin();
    let lat = ap + s2 * (bp + s2 * (cp + s2 * (dp + ep * s2)));

    Position::new(
        lat.to_degrees(),
        (point.x / equatorial_radius).to_degrees(),
        point.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS: f64 = 6_378_137.0;
    const ECC2: f64 = 0.006_694_379_990_13;

    #[test]
    fn test_equator_maps_to_y_zero() {
        let p = to_cartesian(RADIUS, ECC2, 0.0, 0.0, 0.0);
        assert!(p.y.abs() < 1e-9);
        assert!(p.x.abs() < 1e-9);
    }

    #[test]
    fn test_latitudes_beyond_limits_clamp_silently() {
        let at_limit = to_cartesian(RADIUS, ECC2, 78.0, 10.0, 0.0);
        let beyond = to_cartesian(RADIUS, ECC2, 90.0, 10.0, 0.0);
        assert_eq!(at_limit.y, beyond.y);
        let below = to_cartesian(RADIUS, ECC2, -90.0, 10.0, 0.0);
        assert_eq!(below.y, -at_limit.y);
    }

    #[test]
    fn test_round_trip_within_series_accuracy() {
        for (lat, lon) in [(0.0, 0.0), (45.0, -120.0), (-30.0, 77.5), (77.9, 179.0)] {
            let p = to_cartesian(RADIUS, ECC2, lat, lon, 10.0);
            let g = to_geographic(RADIUS, ECC2, p);
            assert!(
                (g.latitude - lat).abs() < 1e-6,
                "latitude {lat} round-tripped to {}",
                g.latitude
            );
            assert!((g.longitude - lon).abs() < 1e-9);
            assert_eq!(g.altitude, 10.0);
        }
    }

    #[test]
    fn test_spherical_inverse_matches_closed_form() {
        // With zero eccentricity the series reduces to the spherical
        // inverse: lat = pi/2 - 2 atan(exp(-y/R))
        let y = 5_000_000.0;
        let g = to_geographic(RADIUS, 0.0, DVec3::new(0.0, y, 0.0));
        let expected =
            (std::f64::consts::FRAC_PI_2 - 2.0 * (-y / RADIUS).exp().atan()).to_degrees();
        assert!((g.latitude - expected).abs() < 1e-12);
    }

    #[test]
    fn test_grid_rows_clamp_to_limits() {
        let sector = Sector::new(70.0, 90.0, 0.0, 10.0);
        let elevations = vec![0.0; 9];
        let mut out = vec![DVec3::ZERO; 9];
        to_cartesian_grid(RADIUS, ECC2, &sector, 2, 2, &elevations, DVec3::ZERO, &mut out);
        let limit_y = to_cartesian(RADIUS, ECC2, 78.0, 0.0, 0.0).y;
        // Rows at 80 and 90 degrees both collapse onto the 78 degree edge
        assert_eq!(out[3].y, limit_y);
        assert_eq!(out[6].y, limit_y);
    }
}
