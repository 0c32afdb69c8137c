//! Terrain tiles carrying the vertex grid the renderer draws.

use std::mem;

use glam::{DMat4, DVec3, Vec3};
use tellus_cache::MemoryCache;
use tellus_coords::Sector;
use tellus_globe::{FrameState, Globe, GlobeStateKey};

use crate::level::Level;
use crate::tile::{Tile, TileKey};

/// A quadtree tile plus the terrain geometry built for it.
///
/// Points are single-precision model coordinates relative to
/// [`TerrainTile::reference_point`], laid out row-major from the sector's
/// south-west corner with `tile_width + 1` points per row. The reference
/// point keeps coordinates small enough for f32 precision on a
/// planet-radius globe; the transformation matrix moves them back into
/// place.
#[derive(Clone, Debug)]
pub struct TerrainTile {
    /// The underlying quadtree tile.
    pub tile: Tile,
    points: Vec<Vec3>,
    reference_point: DVec3,
    transformation_matrix: DMat4,
    geometry_stamp: Option<(u64, f64, GlobeStateKey)>,
    geometry_timestamp: u64,
}

impl TerrainTile {
    /// Create a terrain tile with no geometry yet.
    #[must_use]
    pub fn new(sector: Sector, level: &Level, row: usize, column: usize) -> Self {
        Self::from_tile(Tile::new(sector, level, row, column))
    }

    /// Wrap an existing quadtree tile.
    #[must_use]
    pub fn from_tile(tile: Tile) -> Self {
        Self {
            tile,
            points: Vec::new(),
            reference_point: DVec3::ZERO,
            transformation_matrix: DMat4::IDENTITY,
            geometry_stamp: None,
            geometry_timestamp: 0,
        }
    }

    /// The tile's identity.
    #[must_use]
    pub fn key(&self) -> TileKey {
        self.tile.key
    }

    /// The geographic region this tile covers.
    #[must_use]
    pub fn sector(&self) -> &Sector {
        &self.tile.sector
    }

    /// The vertex grid, relative to the reference point. Empty until
    /// [`TerrainTile::build_geometry`] runs.
    #[must_use]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Model-coordinate origin of the vertex grid.
    #[must_use]
    pub fn reference_point(&self) -> DVec3 {
        self.reference_point
    }

    /// Translation from tile-local to model coordinates.
    #[must_use]
    pub fn transformation_matrix(&self) -> DMat4 {
        self.transformation_matrix
    }

    /// Bumped on every geometry rebuild. Renderers compare it against the
    /// stamp of their uploaded vertex buffer to detect staleness.
    #[must_use]
    pub fn geometry_timestamp(&self) -> u64 {
        self.geometry_timestamp
    }

    /// Whether geometry has been built at least once.
    #[must_use]
    pub fn has_geometry(&self) -> bool {
        !self.points.is_empty()
    }

    /// Whether the geometry is missing or was built against different
    /// elevations, exaggeration or globe state.
    #[must_use]
    pub fn needs_geometry(&self, globe: &Globe, frame: &FrameState) -> bool {
        self.geometry_stamp
            != Some((
                globe.elevation_timestamp(),
                frame.vertical_exaggeration,
                frame.globe_state_key,
            ))
    }

    /// Build the vertex grid for the current globe state.
    ///
    /// Grid elevations fall back to zero where the globe has no data. The
    /// reference point is the Cartesian position of the sector centroid on
    /// the reference surface.
    pub fn build_geometry(&mut self, globe: &Globe, frame: &FrameState) {
        let num_lat = self.tile.tile_height;
        let num_lon = self.tile.tile_width;
        let num_points = (num_lat + 1) * (num_lon + 1);

        let mut elevations = vec![0.0; num_points];
        globe.elevations_for_grid(&self.tile.sector, num_lat, num_lon, &mut elevations);
        for elevation in &mut elevations {
            *elevation *= frame.vertical_exaggeration;
        }

        let centroid = self.tile.sector.centroid();
        self.reference_point =
            globe.geographic_to_cartesian(centroid.latitude, centroid.longitude, 0.0);
        self.transformation_matrix = DMat4::from_translation(self.reference_point);

        let mut grid = vec![DVec3::ZERO; num_points];
        globe.compute_points_for_grid(
            &self.tile.sector,
            num_lat,
            num_lon,
            &elevations,
            self.reference_point,
            &mut grid,
        );
        self.points.clear();
        self.points.extend(grid.iter().map(|point| point.as_vec3()));

        self.geometry_stamp = Some((
            globe.elevation_timestamp(),
            frame.vertical_exaggeration,
            frame.globe_state_key,
        ));
        self.geometry_timestamp += 1;
    }

    /// Estimated in-memory size in bytes, counting the vertex grid the tile
    /// carries once geometry is built. Stable across rebuilds so cache
    /// accounting set at creation stays accurate.
    #[must_use]
    pub fn size(&self) -> u64 {
        let num_points = (self.tile.tile_width + 1) * (self.tile.tile_height + 1);
        (mem::size_of::<Self>() + num_points * mem::size_of::<Vec3>()) as u64
    }

    /// The model-coordinate point on this tile's surface at a location.
    ///
    /// Interpolates within the grid cell containing the location, split
    /// along the cell diagonal from its lower-left to its upper-right
    /// vertex. Returns `None` until geometry exists or when the location
    /// falls outside the tile's sector.
    #[must_use]
    pub fn surface_point(&self, latitude: f64, longitude: f64) -> Option<DVec3> {
        if self.points.is_empty() || !self.tile.sector.contains(latitude, longitude) {
            return None;
        }

        let sector = &self.tile.sector;
        let width = self.tile.tile_width;
        let height = self.tile.tile_height;

        // Parameterize the location over the grid: s in [0, width],
        // t in [0, height].
        let s = (longitude - sector.min_longitude) / sector.delta_longitude() * width as f64;
        let t = (latitude - sector.min_latitude) / sector.delta_latitude() * height as f64;

        // Cell indices, clamped so the north and east edges resolve to the
        // last cell instead of one past it.
        let si = (s as usize).min(width - 1);
        let ti = (t as usize).min(height - 1);
        let sf = (s - si as f64).clamp(0.0, 1.0);
        let tf = (t - ti as f64).clamp(0.0, 1.0);

        let row_stride = width + 1;
        let lower_left = self.points[si + ti * row_stride].as_dvec3();
        let lower_right = self.points[si + 1 + ti * row_stride].as_dvec3();
        let upper_left = self.points[si + (ti + 1) * row_stride].as_dvec3();
        let upper_right = self.points[si + 1 + (ti + 1) * row_stride].as_dvec3();

        let local = if sf < tf {
            // Upper-left triangle of the diagonal split.
            lower_right + (1.0 - sf) * (lower_left - lower_right) + tf * (upper_right - lower_right)
        } else {
            // Lower-right triangle.
            upper_left + sf * (upper_right - upper_left) + (1.0 - tf) * (lower_left - upper_left)
        };

        Some(local + self.reference_point)
    }

    /// Fetch or create the four children of `parent` in `cache`.
    ///
    /// Children already cached are left as-is with their recency refreshed;
    /// missing children are created empty and inserted, so at most one live
    /// tile exists per identity key per cache.
    pub fn subdivide_to_cache(
        parent: &Tile,
        next_level: &Level,
        cache: &mut MemoryCache<TileKey, TerrainTile>,
    ) -> [TileKey; 4] {
        parent.subdivide(next_level).map(|child| {
            let key = child.key;
            if cache.entry_for_key(&key).is_none() {
                let tile = TerrainTile::from_tile(child);
                let size = tile.size();
                cache.put_entry(key, tile, size);
            }
            key
        })
    }
}

#[cfg(test)]
mod tests {
    use tellus_coords::Location;
    use tellus_projections::GeographicProjection;

    use super::*;
    use crate::level::LevelSet;

    fn full_sphere_set() -> LevelSet {
        LevelSet::new(Sector::FULL_SPHERE, Location::new(45.0, 45.0), 15, 32, 32)
    }

    fn test_frame(globe: &Globe) -> FrameState {
        let eye = DVec3::new(0.0, 0.0, 1.0e7);
        let view = DMat4::look_at_rh(eye, DVec3::ZERO, DVec3::Y);
        let projection = DMat4::perspective_rh_gl(45.0f64.to_radians(), 1.0, 1.0, 1.0e9);
        FrameState::new(globe, eye, projection * view, 45.0, 800.0)
    }

    fn tile_at(levels: &LevelSet, row: usize, column: usize) -> TerrainTile {
        let level = levels.first_level();
        TerrainTile::new(
            Tile::compute_sector(levels, level, row, column),
            level,
            row,
            column,
        )
    }

    /// Building geometry fills the full grid relative to the centroid.
    #[test]
    fn test_build_geometry_fills_grid() {
        let globe = Globe::wgs84(GeographicProjection::Equirectangular);
        let frame = test_frame(&globe);
        let levels = full_sphere_set();
        let mut tile = tile_at(&levels, 2, 4);

        assert!(!tile.has_geometry());
        assert!(tile.needs_geometry(&globe, &frame));
        tile.build_geometry(&globe, &frame);

        assert_eq!(tile.points().len(), 33 * 33);
        assert!(tile.has_geometry());
        assert!(!tile.needs_geometry(&globe, &frame));
        assert_eq!(tile.geometry_timestamp(), 1);

        let centroid = tile.sector().centroid();
        let expected_reference =
            globe.geographic_to_cartesian(centroid.latitude, centroid.longitude, 0.0);
        assert_eq!(tile.reference_point(), expected_reference);
        assert_eq!(
            tile.transformation_matrix(),
            DMat4::from_translation(expected_reference)
        );

        // The first point is the south-west corner relative to the centroid.
        let sw = globe.geographic_to_cartesian(
            tile.sector().min_latitude,
            tile.sector().min_longitude,
            0.0,
        ) - expected_reference;
        let first = tile.points()[0].as_dvec3();
        assert!((first - sw).length() < 1.0, "south-west corner off by {}", (first - sw).length());
    }

    /// New exaggeration or elevations mark built geometry stale.
    #[test]
    fn test_needs_geometry_tracks_frame_state() {
        let globe = Globe::wgs84(GeographicProjection::Equirectangular);
        let frame = test_frame(&globe);
        let levels = full_sphere_set();
        let mut tile = tile_at(&levels, 2, 4);
        tile.build_geometry(&globe, &frame);
        assert!(!tile.needs_geometry(&globe, &frame));

        let mut exaggerated = frame.clone();
        exaggerated.vertical_exaggeration = 2.0;
        assert!(tile.needs_geometry(&globe, &exaggerated));

        tile.build_geometry(&globe, &exaggerated);
        assert_eq!(tile.geometry_timestamp(), 2);
        assert!(!tile.needs_geometry(&globe, &exaggerated));
    }

    /// On the linear equirectangular projection the interpolated surface
    /// point reproduces the projected location.
    #[test]
    fn test_surface_point_matches_projection() {
        let globe = Globe::wgs84(GeographicProjection::Equirectangular);
        let frame = test_frame(&globe);
        let levels = full_sphere_set();
        let mut tile = tile_at(&levels, 2, 4);

        assert!(tile.surface_point(10.0, 10.0).is_none(), "no geometry yet");
        tile.build_geometry(&globe, &frame);

        for (latitude, longitude) in [
            (10.0, 10.0),
            (0.0, 0.0),
            (44.999, 44.999),
            (22.5, 22.5),
            (45.0, 45.0),
        ] {
            let expected = globe.geographic_to_cartesian(latitude, longitude, 0.0);
            let actual = tile.surface_point(latitude, longitude).unwrap();
            assert!(
                (actual - expected).length() < 1.0,
                "({latitude}, {longitude}): off by {}",
                (actual - expected).length()
            );
        }

        assert!(tile.surface_point(50.0, 10.0).is_none(), "outside the sector");
    }

    /// Subdividing through the cache reuses cached children.
    #[test]
    fn test_subdivide_to_cache_keeps_one_tile_per_key() {
        let globe = Globe::wgs84(GeographicProjection::Equirectangular);
        let frame = test_frame(&globe);
        let levels = full_sphere_set();
        let parent = tile_at(&levels, 2, 4);
        let next_level = levels.level(1).unwrap();
        let mut cache: MemoryCache<TileKey, TerrainTile> = MemoryCache::new(1_000_000, 800_000);

        let keys = TerrainTile::subdivide_to_cache(&parent.tile, next_level, &mut cache);
        assert_eq!(
            keys,
            [
                TileKey::new(1, 4, 8),
                TileKey::new(1, 4, 9),
                TileKey::new(1, 5, 8),
                TileKey::new(1, 5, 9),
            ]
        );
        assert_eq!(cache.len(), 4);

        // Build geometry on one child, then subdivide again: the cached
        // child must survive untouched.
        cache
            .get_mut(&keys[0])
            .unwrap()
            .build_geometry(&globe, &frame);
        let again = TerrainTile::subdivide_to_cache(&parent.tile, next_level, &mut cache);
        assert_eq!(again, keys);
        assert_eq!(cache.len(), 4);
        assert!(cache.entry_for_key(&keys[0]).unwrap().has_geometry());
    }

    /// The size estimate covers the eventual grid and is rebuild-stable.
    #[test]
    fn test_size_is_stable_across_build() {
        let globe = Globe::wgs84(GeographicProjection::Equirectangular);
        let frame = test_frame(&globe);
        let levels = full_sphere_set();
        let mut tile = tile_at(&levels, 2, 4);

        let before = tile.size();
        assert!(before >= (33 * 33 * 12) as u64);
        tile.build_geometry(&globe, &frame);
        assert_eq!(tile.size(), before);
    }
}
