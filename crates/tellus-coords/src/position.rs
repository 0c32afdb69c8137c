//! Geographic location and position value types.

/// A geographic location in degrees.
///
/// Latitude is positive north, longitude positive east. Plain value type;
/// nothing here validates ranges, callers that need clamping do it at their
/// own boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Location {
    /// Create a location from degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a location from radians.
    #[must_use]
    pub fn from_radians(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: latitude.to_degrees(),
            longitude: longitude.to_degrees(),
        }
    }

    /// Latitude in radians.
    #[must_use]
    pub fn latitude_radians(&self) -> f64 {
        self.latitude.to_radians()
    }

    /// Longitude in radians.
    #[must_use]
    pub fn longitude_radians(&self) -> f64 {
        self.longitude.to_radians()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}\u{b0}, {:.6}\u{b0})", self.latitude, self.longitude)
    }
}

/// A geographic position: a [`Location`] plus an altitude in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters above the reference surface.
    pub altitude: f64,
}

impl Position {
    /// Create a position from degrees and meters.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    /// The location component of this position.
    #[must_use]
    pub const fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.6}\u{b0}, {:.6}\u{b0}, {:.1} m)",
            self.latitude, self.longitude, self.altitude
        )
    }
}
