//! Azimuthal equidistant projection in its polar aspect.
//!
//! Formulas follow Snyder, "Map Projections: A Working Manual", USGS
//! Professional Paper 1395, pages 195-196, on a sphere. Distance from the
//! projection center is linear in arc length, so the opposite pole maps to
//! a circle of radius pi times the globe radius.

use glam::DVec3;
use tellus_coords::{Position, Sector};

/// North-south factor: -1 for the north aspect, +1 for the south aspect.
fn pole_factor(north: bool) -> f64 {
    if north { -1.0 } else { 1.0 }
}

pub(crate) fn to_cartesian(
    equatorial_radius: f64,
    north: bool,
    latitude: f64,
    longitude: f64,
    elevation: f64,
) -> DVec3 {
    // The projection center itself, where longitude is meaningless.
    if (north && latitude == 90.0) || (!north && latitude == -90.0) {
        return DVec3::new(0.0, 0.0, elevation);
    }

    let k = pole_factor(north);
    let a = equatorial_radius * (std::f64::consts::FRAC_PI_2 + latitude.to_radians() * k);
    let lon = longitude.to_radians();

    DVec3::new(a * lon.sin(), a * lon.cos() * k, elevation)
}

pub(crate) fn to_cartesian_grid(
    equatorial_radius: f64,
    north: bool,
    sector: &Sector,
    num_lat: usize,
    num_lon: usize,
    elevations: &[f64],
    reference_center: DVec3,
    out: &mut [DVec3],
) {
    let k = pole_factor(north);
    let delta_lat = sector.delta_latitude() / num_lat.max(1) as f64;
    let delta_lon = sector.delta_longitude() / num_lon.max(1) as f64;

    // Longitude trig is shared by every row.
    let mut lon_trig = Vec::with_capacity(num_lon + 1);
    for i in 0..=num_lon {
        let lon = if i == num_lon {
            sector.max_longitude
        } else {
            sector.min_longitude + delta_lon * i as f64
        };
        let lon = lon.to_radians();
        lon_trig.push((lon.sin(), lon.cos()));
    }

    let mut pos = 0;
    for j in 0..=num_lat {
        let lat = if j == num_lat {
            sector.max_latitude
        } else {
            sector.min_latitude + delta_lat * j as f64
        };
        let a = if (north && lat == 90.0) || (!north && lat == -90.0) {
            0.0
        } else {
            equatorial_radius * (std::f64::consts::FRAC_PI_2 + lat.to_radians() * k)
        };

        for &(sin_lon, cos_lon) in &lon_trig {
            out[pos] = DVec3::new(
                a * sin_lon - reference_center.x,
                a * cos_lon * k - reference_center.y,
                elevations[pos] - reference_center.z,
            );
            pos += 1;
        }
    }
}

pub(crate) fn to_geographic(equatorial_radius: f64, north: bool, point: DVec3) -> Position {
    let rho = point.x.hypot(point.y);

    if rho < 1.0e-4 {
        let pole = if north { 90.0 } else { -90.0 };
        return Position::new(pole, 0.0, point.z);
    }

    // Points beyond the projection's radius map to its edge.
    let c = (rho / equatorial_radius).min(std::f64::consts::PI);
    let c_degrees = c.to_degrees();

    let (latitude, longitude) = if north {
        (90.0 - c_degrees, point.x.atan2(-point.y).to_degrees())
    } else {
        (c_degrees - 90.0, point.x.atan2(point.y).to_degrees())
    };

    Position::new(latitude, longitude, point.z)
}
