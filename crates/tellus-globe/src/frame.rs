//! Per-frame view state consumed by terrain selection.

use glam::{DMat4, DVec3};
use tellus_coords::Frustum;

use crate::globe::{Globe, GlobeStateKey};

/// A snapshot of the view for one frame.
///
/// Terrain selection never talks to a camera. It reads the eye point, the
/// combined modelview-projection matrix, the frustum extracted from that
/// matrix, and the screen-resolution coefficients captured here.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameState {
    /// Eye position in model coordinates.
    pub eye_point: DVec3,
    /// Combined modelview-projection matrix for the frame.
    pub modelview_projection: DMat4,
    /// View frustum in model coordinates, derived from the matrix.
    pub frustum: Frustum,
    /// Multiplier applied to terrain heights. 1 renders true scale.
    pub vertical_exaggeration: f64,
    /// Linear pixel-size model: a pixel at distance d from the eye covers
    /// `pixel_size_scale * d + pixel_size_offset` meters.
    pub pixel_size_scale: f64,
    pub pixel_size_offset: f64,
    /// The globe state this frame was captured against.
    pub globe_state_key: GlobeStateKey,
}

impl FrameState {
    /// Capture the view state for a frame.
    ///
    /// The pixel-size coefficients come from the vertical field of view and
    /// viewport height: a symmetric perspective viewport `h` pixels tall
    /// spanning `fov_y` degrees sees `2 * d * tan(fov_y / 2)` meters at
    /// distance `d`. Vertical exaggeration starts at 1.
    ///
    /// # Panics
    ///
    /// Panics if `fov_y_degrees` is outside `(0, 180)` or
    /// `viewport_height` is not strictly positive.
    #[must_use]
    pub fn new(
        globe: &Globe,
        eye_point: DVec3,
        modelview_projection: DMat4,
        fov_y_degrees: f64,
        viewport_height: f64,
    ) -> Self {
        assert!(
            fov_y_degrees > 0.0 && fov_y_degrees < 180.0,
            "field of view must be between 0 and 180 degrees"
        );
        assert!(viewport_height > 0.0, "viewport height must be positive");

        let pixel_size_scale = 2.0 * (0.5 * fov_y_degrees.to_radians()).tan() / viewport_height;

        Self {
            eye_point,
            modelview_projection,
            frustum: Frustum::from_matrix(&modelview_projection),
            vertical_exaggeration: 1.0,
            pixel_size_scale,
            pixel_size_offset: 0.0,
            globe_state_key: globe.state_key(),
        }
    }

    /// The size in meters of one pixel at `distance` meters from the eye.
    #[must_use]
    pub fn pixel_size_at_distance(&self, distance: f64) -> f64 {
        self.pixel_size_scale * distance + self.pixel_size_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tellus_projections::GeographicProjection;

    fn make_frame(eye: DVec3) -> FrameState {
        let globe = Globe::wgs84(GeographicProjection::Equirectangular);
        let view = DMat4::look_at_rh(eye, DVec3::new(eye.x, eye.y, 0.0), DVec3::Y);
        let projection =
            DMat4::perspective_rh_gl(45.0_f64.to_radians(), 1.0, 1.0, 1.0e8);
        FrameState::new(&globe, eye, projection * view, 45.0, 1000.0)
    }

    #[test]
    fn test_pixel_size_is_linear_in_distance() {
        let frame = make_frame(DVec3::new(0.0, 0.0, 1.0e6));
        let expected_scale = 2.0 * (22.5_f64.to_radians()).tan() / 1000.0;
        assert!((frame.pixel_size_scale - expected_scale).abs() < 1e-15);
        assert_eq!(frame.pixel_size_at_distance(0.0), 0.0);
        let at_two = frame.pixel_size_at_distance(2.0e6);
        let at_one = frame.pixel_size_at_distance(1.0e6);
        assert!((at_two - 2.0 * at_one).abs() < 1e-9);
    }

    #[test]
    fn test_frustum_sees_point_in_front_of_eye() {
        let frame = make_frame(DVec3::new(0.0, 0.0, 1.0e6));
        assert!(frame.frustum.contains_point(DVec3::ZERO));
        // Behind the eye
        assert!(!frame.frustum.contains_point(DVec3::new(0.0, 0.0, 2.0e6)));
    }

    #[test]
    fn test_vertical_exaggeration_defaults_to_one() {
        let frame = make_frame(DVec3::new(0.0, 0.0, 1.0e6));
        assert_eq!(frame.vertical_exaggeration, 1.0);
    }

    #[test]
    #[should_panic(expected = "viewport height must be positive")]
    fn test_zero_viewport_panics() {
        let globe = Globe::wgs84(GeographicProjection::Equirectangular);
        let _ = FrameState::new(&globe, DVec3::ZERO, DMat4::IDENTITY, 45.0, 0.0);
    }

    #[test]
    #[should_panic(expected = "field of view")]
    fn test_degenerate_fov_panics() {
        let globe = Globe::wgs84(GeographicProjection::Equirectangular);
        let _ = FrameState::new(&globe, DVec3::ZERO, DMat4::IDENTITY, 180.0, 100.0);
    }
}
