//! Quadtree tiles addressed by level, row and column.

use std::fmt;

use glam::DVec3;
use tellus_coords::{BoundingBox, Sector};
use tellus_globe::{FrameState, Globe, GlobeStateKey};

use crate::level::{Level, LevelSet};

/// Identity of a tile within a level set.
///
/// Row 0 starts at the level set's minimum latitude, column 0 at its minimum
/// longitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Ordinal of the level this tile belongs to.
    pub level: usize,
    /// Row within the level.
    pub row: usize,
    /// Column within the level.
    pub column: usize,
}

impl TileKey {
    /// Create a key from level, row and column.
    #[must_use]
    pub const fn new(level: usize, row: usize, column: usize) -> Self {
        Self {
            level,
            row,
            column,
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.level, self.row, self.column)
    }
}

/// Per-frame view-dependent state computed by [`Tile::update`].
#[derive(Clone, Debug)]
struct UpdateState {
    /// (elevation timestamp, vertical exaggeration, globe state key) the
    /// state below was computed for.
    stamp: (u64, f64, GlobeStateKey),
    /// Bounds of the terrain surface this tile can produce.
    extent: BoundingBox,
    /// 3x3 grid of surface points at the mean elevation, used to estimate
    /// the eye-to-tile distance.
    sample_points: [DVec3; 9],
}

/// A node of the tile quadtree.
///
/// Carries the tile's geographic footprint and identity plus per-level grid
/// parameters copied from its [`Level`]. View-dependent state (bounding
/// extent, distance sample points) is computed lazily by [`Tile::update`]
/// and memoized on the globe state it was derived from.
#[derive(Clone, Debug)]
pub struct Tile {
    /// The geographic region this tile covers.
    pub sector: Sector,
    /// The tile's identity within its level set.
    pub key: TileKey,
    /// Tile width in grid cells.
    pub tile_width: usize,
    /// Tile height in grid cells.
    pub tile_height: usize,
    /// Radians of latitude per texel at this tile's level.
    pub texel_size: f64,
    update_state: Option<UpdateState>,
}

impl Tile {
    /// Create a tile for `sector` at the given level, row and column.
    #[must_use]
    pub fn new(sector: Sector, level: &Level, row: usize, column: usize) -> Self {
        Self {
            sector,
            key: TileKey::new(level.level_number, row, column),
            tile_width: level.tile_width,
            tile_height: level.tile_height,
            texel_size: level.texel_size,
            update_state: None,
        }
    }

    /// The sector covered by the tile at `row`, `column` of `level`.
    #[must_use]
    pub fn compute_sector(levels: &LevelSet, level: &Level, row: usize, column: usize) -> Sector {
        let origin = levels.sector();
        let delta_latitude = level.tile_delta.latitude;
        let delta_longitude = level.tile_delta.longitude;
        let min_latitude = origin.min_latitude + row as f64 * delta_latitude;
        let min_longitude = origin.min_longitude + column as f64 * delta_longitude;
        Sector::new(
            min_latitude,
            min_latitude + delta_latitude,
            min_longitude,
            min_longitude + delta_longitude,
        )
    }

    /// The row containing `latitude` at `level`.
    ///
    /// The latitude must lie within the level set's sector; the maximum edge
    /// maps to the last row rather than one past it.
    #[must_use]
    pub fn compute_row(levels: &LevelSet, level: &Level, latitude: f64) -> usize {
        let origin = levels.sector();
        if latitude == origin.max_latitude {
            return Self::compute_last_row(levels, level, latitude);
        }
        ((latitude - origin.min_latitude) / level.tile_delta.latitude).floor() as usize
    }

    /// The column containing `longitude` at `level`.
    ///
    /// The longitude must lie within the level set's sector; the maximum edge
    /// maps to the last column rather than one past it.
    #[must_use]
    pub fn compute_column(levels: &LevelSet, level: &Level, longitude: f64) -> usize {
        let origin = levels.sector();
        if longitude == origin.max_longitude {
            return Self::compute_last_column(levels, level, longitude);
        }
        ((longitude - origin.min_longitude) / level.tile_delta.longitude).floor() as usize
    }

    /// The last row at `level` needed to reach `max_latitude`.
    #[must_use]
    pub fn compute_last_row(levels: &LevelSet, level: &Level, max_latitude: f64) -> usize {
        let span = max_latitude - levels.sector().min_latitude;
        let delta = level.tile_delta.latitude;
        if span < delta {
            // The whole span fits in the first row.
            return 0;
        }
        (span / delta - 1.0).ceil() as usize
    }

    /// The last column at `level` needed to reach `max_longitude`.
    #[must_use]
    pub fn compute_last_column(levels: &LevelSet, level: &Level, max_longitude: f64) -> usize {
        let span = max_longitude - levels.sector().min_longitude;
        let delta = level.tile_delta.longitude;
        if span < delta {
            return 0;
        }
        (span / delta - 1.0).ceil() as usize
    }

    /// Create every tile of `level` across the level set's sector.
    ///
    /// `factory` receives each tile's sector, level, row and column and
    /// produces whatever tile type the caller stores.
    pub fn create_tiles_for_level<T>(
        levels: &LevelSet,
        level: &Level,
        mut factory: impl FnMut(Sector, &Level, usize, usize) -> T,
        out: &mut Vec<T>,
    ) {
        let sector = levels.sector();
        let first_row = Self::compute_row(levels, level, sector.min_latitude);
        let last_row = Self::compute_last_row(levels, level, sector.max_latitude);
        let first_column = Self::compute_column(levels, level, sector.min_longitude);
        let last_column = Self::compute_last_column(levels, level, sector.max_longitude);

        for row in first_row..=last_row {
            for column in first_column..=last_column {
                let tile_sector = Self::compute_sector(levels, level, row, column);
                out.push(factory(tile_sector, level, row, column));
            }
        }
    }

    /// Quarter this tile into its four children at `next_level`.
    ///
    /// Children are returned south to north, west to east, at rows
    /// `2*row`/`2*row + 1` and columns `2*column`/`2*column + 1`.
    ///
    /// # Panics
    ///
    /// Panics when `next_level` is not the level directly below this tile's.
    #[must_use]
    pub fn subdivide(&self, next_level: &Level) -> [Tile; 4] {
        assert_eq!(
            next_level.level_number,
            self.key.level + 1,
            "subdivision must target the next finer level"
        );

        let sector = &self.sector;
        let mid_latitude = 0.5 * (sector.min_latitude + sector.max_latitude);
        let mid_longitude = 0.5 * (sector.min_longitude + sector.max_longitude);
        let row = 2 * self.key.row;
        let column = 2 * self.key.column;

        [
            Tile::new(
                Sector::new(sector.min_latitude, mid_latitude, sector.min_longitude, mid_longitude),
                next_level,
                row,
                column,
            ),
            Tile::new(
                Sector::new(sector.min_latitude, mid_latitude, mid_longitude, sector.max_longitude),
                next_level,
                row,
                column + 1,
            ),
            Tile::new(
                Sector::new(mid_latitude, sector.max_latitude, sector.min_longitude, mid_longitude),
                next_level,
                row + 1,
                column,
            ),
            Tile::new(
                Sector::new(mid_latitude, sector.max_latitude, mid_longitude, sector.max_longitude),
                next_level,
                row + 1,
                column + 1,
            ),
        ]
    }

    /// Whether this tile's resolution is too coarse for the current view.
    ///
    /// Splits when the geographic size of one texel exceeds `detail_factor`
    /// screen pixels at the tile's distance from the eye, with a half-meter
    /// floor so deeply zoomed views stop subdividing.
    #[must_use]
    pub fn must_subdivide(&self, globe: &Globe, frame: &FrameState, detail_factor: f64) -> bool {
        let cell_size = globe.equatorial_radius * self.texel_size;
        let distance = self.distance_to(frame.eye_point);
        let pixel_size = frame.pixel_size_at_distance(distance);
        cell_size > (detail_factor * pixel_size).max(0.5)
    }

    /// Recompute the tile's extent and distance sample points when the globe
    /// state they were derived from has changed.
    ///
    /// Must be called before [`Tile::must_subdivide`], [`Tile::distance_to`]
    /// or any frustum test against [`Tile::extent`] each frame.
    pub fn update(&mut self, globe: &Globe, frame: &FrameState) {
        let stamp = (
            globe.elevation_timestamp(),
            frame.vertical_exaggeration,
            frame.globe_state_key,
        );
        if self.update_state.as_ref().map(|state| state.stamp) == Some(stamp) {
            return;
        }

        let (min_elevation, max_elevation) = globe
            .min_and_max_elevations_for_sector(&self.sector)
            .unwrap_or((-globe.equatorial_radius, globe.equatorial_radius));
        let min_height = min_elevation * frame.vertical_exaggeration;
        let mut max_height = max_elevation * frame.vertical_exaggeration;
        if max_height == min_height {
            // A flat tile still needs a box with volume for stable culling.
            max_height = min_height + 10.0;
        }

        // Bound the surface with a 3x3 boundary grid at both extreme heights.
        let mut grid = [DVec3::ZERO; 9];
        let mut boundary = [DVec3::ZERO; 18];
        for (half, height) in [min_height, max_height].into_iter().enumerate() {
            let elevations = [height; 9];
            globe.compute_points_for_grid(&self.sector, 2, 2, &elevations, DVec3::ZERO, &mut grid);
            boundary[half * 9..(half + 1) * 9].copy_from_slice(&grid);
        }
        let extent = BoundingBox::from_points(&boundary);

        // Sample the surface at the mean height to estimate eye distance.
        let mean_height = 0.5 * (min_height + max_height);
        let elevations = [mean_height; 9];
        let mut sample_points = [DVec3::ZERO; 9];
        globe.compute_points_for_grid(
            &self.sector,
            2,
            2,
            &elevations,
            DVec3::ZERO,
            &mut sample_points,
        );

        self.update_state = Some(UpdateState {
            stamp,
            extent,
            sample_points,
        });
    }

    /// The tile's bounding extent, or `None` before the first
    /// [`Tile::update`].
    #[must_use]
    pub fn extent(&self) -> Option<&BoundingBox> {
        self.update_state.as_ref().map(|state| &state.extent)
    }

    /// Minimum distance from `point` to the tile's surface sample points.
    ///
    /// Infinite before the first [`Tile::update`].
    #[must_use]
    pub fn distance_to(&self, point: DVec3) -> f64 {
        let Some(state) = &self.update_state else {
            return f64::INFINITY;
        };
        state
            .sample_points
            .iter()
            .map(|sample| sample.distance_squared(point))
            .fold(f64::INFINITY, f64::min)
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use glam::DMat4;
    use tellus_coords::Location;
    use tellus_globe::ElevationSource;
    use tellus_projections::GeographicProjection;

    use super::*;

    fn full_sphere_set() -> LevelSet {
        LevelSet::new(Sector::FULL_SPHERE, Location::new(45.0, 45.0), 15, 32, 32)
    }

    fn frame_for_eye(globe: &Globe, eye: DVec3) -> FrameState {
        let view = DMat4::look_at_rh(eye, DVec3::ZERO, DVec3::Y);
        let projection = DMat4::perspective_rh_gl(45.0f64.to_radians(), 1.0, 1.0, 1.0e9);
        FrameState::new(globe, eye, projection * view, 45.0, 800.0)
    }

    /// Elevation source that counts how often its extremes are queried.
    struct CountingSource {
        calls: Arc<AtomicU64>,
    }

    impl ElevationSource for CountingSource {
        fn timestamp(&self) -> u64 {
            7
        }

        fn min_and_max_elevations_for_sector(&self, _sector: &Sector) -> Option<(f64, f64)> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Some((100.0, 900.0))
        }

        fn elevations_for_grid(
            &self,
            _sector: &Sector,
            _num_lat: usize,
            _num_lon: usize,
            out: &mut [f64],
        ) -> bool {
            out.fill(500.0);
            true
        }
    }

    #[test]
    fn test_key_display() {
        assert_eq!(TileKey::new(3, 14, 159).to_string(), "3.14.159");
    }

    #[test]
    fn test_key_ordering_is_level_major() {
        let coarse = TileKey::new(1, 9, 9);
        let fine = TileKey::new(2, 0, 0);
        assert!(coarse < fine);
    }

    /// Row/column lookup over the full sphere at a 45 degree delta.
    #[test]
    fn test_compute_row_and_column() {
        let levels = full_sphere_set();
        let level = levels.first_level();

        assert_eq!(Tile::compute_row(&levels, level, -90.0), 0);
        assert_eq!(Tile::compute_row(&levels, level, 0.0), 2);
        assert_eq!(Tile::compute_row(&levels, level, 89.9), 3);
        // The maximum edge belongs to the last row, not one past it.
        assert_eq!(Tile::compute_row(&levels, level, 90.0), 3);

        assert_eq!(Tile::compute_column(&levels, level, -180.0), 0);
        assert_eq!(Tile::compute_column(&levels, level, 0.0), 4);
        assert_eq!(Tile::compute_column(&levels, level, 180.0), 7);
    }

    #[test]
    fn test_compute_last_row_and_column() {
        let levels = full_sphere_set();
        let level = levels.first_level();
        assert_eq!(Tile::compute_last_row(&levels, level, 90.0), 3);
        assert_eq!(Tile::compute_last_column(&levels, level, 180.0), 7);

        // A span smaller than one delta still occupies one row.
        let narrow = LevelSet::new(
            Sector::new(0.0, 30.0, 0.0, 30.0),
            Location::new(45.0, 45.0),
            1,
            32,
            32,
        );
        let narrow_level = narrow.first_level();
        assert_eq!(Tile::compute_last_row(&narrow, narrow_level, 30.0), 0);
        assert_eq!(Tile::compute_last_column(&narrow, narrow_level, 30.0), 0);
    }

    #[test]
    fn test_compute_sector() {
        let levels = full_sphere_set();
        let level = levels.first_level();
        let sector = Tile::compute_sector(&levels, level, 0, 0);
        assert_eq!(sector, Sector::new(-90.0, -45.0, -180.0, -135.0));
        let sector = Tile::compute_sector(&levels, level, 3, 7);
        assert_eq!(sector, Sector::new(45.0, 90.0, 135.0, 180.0));
    }

    /// The top level of the full sphere is 4 rows by 8 columns.
    #[test]
    fn test_create_tiles_for_level() {
        let levels = full_sphere_set();
        let mut tiles = Vec::new();
        Tile::create_tiles_for_level(
            &levels,
            levels.first_level(),
            |sector, level, row, column| Tile::new(sector, level, row, column),
            &mut tiles,
        );

        assert_eq!(tiles.len(), 32);
        assert_eq!(tiles[0].sector, Sector::new(-90.0, -45.0, -180.0, -135.0));
        assert_eq!(tiles[31].sector, Sector::new(45.0, 90.0, 135.0, 180.0));
        assert_eq!(tiles[31].key, TileKey::new(0, 3, 7));
    }

    #[test]
    fn test_subdivide_quarters_sector_and_doubles_indices() {
        let levels = full_sphere_set();
        let level = levels.first_level();
        let parent = Tile::new(
            Tile::compute_sector(&levels, level, 2, 4),
            level,
            2,
            4,
        );

        let children = parent.subdivide(levels.level(1).unwrap());
        assert_eq!(children[0].key, TileKey::new(1, 4, 8));
        assert_eq!(children[1].key, TileKey::new(1, 4, 9));
        assert_eq!(children[2].key, TileKey::new(1, 5, 8));
        assert_eq!(children[3].key, TileKey::new(1, 5, 9));

        // South-west child keeps the parent's south-west corner.
        assert_eq!(children[0].sector, Sector::new(0.0, 22.5, 0.0, 22.5));
        // North-east child keeps the parent's north-east corner.
        assert_eq!(children[3].sector, Sector::new(22.5, 45.0, 22.5, 45.0));

        // The four children exactly tile the parent.
        let union = children
            .iter()
            .skip(1)
            .fold(children[0].sector, |acc, child| acc.union(&child.sector));
        assert_eq!(union, parent.sector);
    }

    #[test]
    #[should_panic(expected = "subdivision must target the next finer level")]
    fn test_subdivide_rejects_wrong_level() {
        let levels = full_sphere_set();
        let level = levels.first_level();
        let tile = Tile::new(Tile::compute_sector(&levels, level, 0, 0), level, 0, 0);
        let _ = tile.subdivide(levels.level(2).unwrap());
    }

    /// Update derives the extent and sample points; both reflect elevations.
    #[test]
    fn test_update_computes_extent_and_samples() {
        let globe = Globe::wgs84(GeographicProjection::Equirectangular);
        let levels = full_sphere_set();
        let level = levels.first_level();
        let sector = Tile::compute_sector(&levels, level, 2, 4);
        let mut tile = Tile::new(sector, level, 2, 4);
        assert!(tile.extent().is_none());
        assert!(tile.distance_to(DVec3::ZERO).is_infinite());

        let eye = DVec3::new(0.0, 0.0, 1.0e7);
        let frame = frame_for_eye(&globe, eye);
        tile.update(&globe, &frame);

        let centroid = sector.centroid();
        let surface = globe.geographic_to_cartesian(centroid.latitude, centroid.longitude, 0.0);
        let extent = tile.extent().unwrap();
        assert!(extent.contains_point(surface), "extent must contain the surface centroid");

        // One sample point sits at the centroid; zero elevations pad the mean
        // height to 5 m, so a point 1 km above it is 995 m away.
        let above = surface + DVec3::new(0.0, 0.0, 1000.0);
        assert!((tile.distance_to(above) - 995.0).abs() < 1e-6);
    }

    /// Update recomputes only when timestamp, exaggeration or state key move.
    #[test]
    fn test_update_is_memoized() {
        let calls = Arc::new(AtomicU64::new(0));
        let mut globe = Globe::wgs84(GeographicProjection::Equirectangular);
        globe.set_elevation_source(Some(Box::new(CountingSource {
            calls: Arc::clone(&calls),
        })));

        let levels = full_sphere_set();
        let level = levels.first_level();
        let mut tile = Tile::new(Tile::compute_sector(&levels, level, 2, 4), level, 2, 4);

        let eye = DVec3::new(0.0, 0.0, 1.0e7);
        let frame = frame_for_eye(&globe, eye);
        tile.update(&globe, &frame);
        tile.update(&globe, &frame);
        assert_eq!(calls.load(Ordering::Relaxed), 1, "unchanged state must not recompute");

        let mut exaggerated = frame.clone();
        exaggerated.vertical_exaggeration = 2.0;
        tile.update(&globe, &exaggerated);
        assert_eq!(calls.load(Ordering::Relaxed), 2, "new exaggeration must recompute");
    }

    /// A close eye wants subdivision, a distant eye does not.
    #[test]
    fn test_must_subdivide_depends_on_distance() {
        let globe = Globe::wgs84(GeographicProjection::Equirectangular);
        let levels = full_sphere_set();
        let level = levels.first_level();
        let sector = Tile::compute_sector(&levels, level, 2, 4);
        let centroid = sector.centroid();
        let surface = globe.geographic_to_cartesian(centroid.latitude, centroid.longitude, 0.0);
        let mut tile = Tile::new(sector, level, 2, 4);

        let near_eye = surface + DVec3::new(0.0, 0.0, 5.0e5);
        let near_frame = frame_for_eye(&globe, near_eye);
        tile.update(&globe, &near_frame);
        assert!(tile.must_subdivide(&globe, &near_frame, 1.1));

        let far_eye = surface + DVec3::new(0.0, 0.0, 2.0e8);
        let far_frame = frame_for_eye(&globe, far_eye);
        tile.update(&globe, &far_frame);
        assert!(!tile.must_subdivide(&globe, &far_frame, 1.1));
    }
}
