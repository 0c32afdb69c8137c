//! Equidistant cylindrical projection. Both axes are linear in angle, so the
//! inverse is exact.

use glam::DVec3;
use tellus_coords::{Position, Sector};

pub(crate) fn to_cartesian(
    equatorial_radius: f64,
    latitude: f64,
    longitude: f64,
    elevation: f64,
) -> DVec3 {
    DVec3::new(
        equatorial_radius * longitude.to_radians(),
        equatorial_radius * latitude.to_radians(),
        elevation,
    )
}

pub(crate) fn to_cartesian_grid(
    equatorial_radius: f64,
    sector: &Sector,
    num_lat: usize,
    num_lon: usize,
    elevations: &[f64],
    reference_center: DVec3,
    out: &mut [DVec3],
) {
    let delta_lat = sector.delta_latitude() / num_lat.max(1) as f64;
    let delta_lon = sector.delta_longitude() / num_lon.max(1) as f64;

    let mut pos = 0;
    for j in 0..=num_lat {
        let lat = if j == num_lat {
            sector.max_latitude
        } else {
            sector.min_latitude + delta_lat * j as f64
        };
        // Latitude is constant along a row, so y is computed once per row.
        let y = equatorial_radius * lat.to_radians() - reference_center.y;

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

pub(crate) fn to_geographic(equatorial_radius: f64, point: DVec3) -> Position {
    Position::new(
        (point.y / equatorial_radius).to_degrees(),
        (point.x / equatorial_radius).to_degrees(),
        point.z,
    )
}
