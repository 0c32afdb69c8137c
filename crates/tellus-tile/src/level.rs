//! Resolution levels of the tile pyramid.

use tellus_coords::{Location, Sector};

/// One resolution level in a [`LevelSet`].
#[derive(Clone, Debug)]
pub struct Level {
    /// This level's ordinal in its set, 0 = coarsest.
    pub level_number: usize,
    /// Geographic size of one tile at this level, in degrees.
    pub tile_delta: Location,
    /// Tile width in grid cells.
    pub tile_width: usize,
    /// Tile height in grid cells.
    pub tile_height: usize,
    /// Radians of latitude spanned by one texel at this level.
    pub texel_size: f64,
}

/// The ordered sequence of resolution levels covering a sector.
///
/// Level *n*'s tile delta is the first level's delta divided by `2^n`, so
/// each level quarters the geographic area of the one above it.
#[derive(Clone, Debug)]
pub struct LevelSet {
    sector: Sector,
    levels: Vec<Level>,
}

/// Most levels a set can hold. Level 47 tiles of a 45-degree pyramid are
/// already well under a millimeter across.
pub const MAX_NUM_LEVELS: usize = 48;

impl LevelSet {
    /// Create a level set over `sector`.
    ///
    /// `first_level_delta` is the geographic size of a level-0 tile in
    /// degrees; `tile_width` and `tile_height` are the cell counts of every
    /// tile's sampling grid.
    ///
    /// # Panics
    ///
    /// Panics when the delta is not positive, `num_levels` is zero or
    /// exceeds [`MAX_NUM_LEVELS`], or a tile dimension is zero.
    #[must_use]
    pub fn new(
        sector: Sector,
        first_level_delta: Location,
        num_levels: usize,
        tile_width: usize,
        tile_height: usize,
    ) -> Self {
        assert!(
            first_level_delta.latitude > 0.0 && first_level_delta.longitude > 0.0,
            "first-level tile delta must be positive"
        );
        assert!(num_levels > 0, "level set needs at least one level");
        assert!(
            num_levels <= MAX_NUM_LEVELS,
            "level set is limited to {MAX_NUM_LEVELS} levels, got {num_levels}"
        );
        assert!(
            tile_width > 0 && tile_height > 0,
            "tile dimensions must be positive"
        );

        let levels = (0..num_levels)
            .map(|n| {
                let divisor = (1u64 << n) as f64;
                let tile_delta = Location::new(
                    first_level_delta.latitude / divisor,
                    first_level_delta.longitude / divisor,
                );
                Level {
                    level_number: n,
                    tile_delta,
                    tile_width,
                    tile_height,
                    texel_size: tile_delta.latitude.to_radians() / tile_height as f64,
                }
            })
            .collect();

        Self {
            sector,
            levels,
        }
    }

    /// The sector this level set covers.
    #[must_use]
    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    /// The coarsest level.
    #[must_use]
    pub fn first_level(&self) -> &Level {
        &self.levels[0]
    }

    /// The finest level.
    #[must_use]
    pub fn last_level(&self) -> &Level {
        &self.levels[self.levels.len() - 1]
    }

    /// The level at ordinal `n`, or `None` when `n` is out of range.
    #[must_use]
    pub fn level(&self, n: usize) -> Option<&Level> {
        self.levels.get(n)
    }

    /// Whether `n` names the finest level.
    #[must_use]
    pub fn is_last_level(&self, n: usize) -> bool {
        n + 1 == self.levels.len()
    }

    /// Number of levels in the set.
    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// All levels, coarsest first.
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_sphere_set() -> LevelSet {
        LevelSet::new(Sector::FULL_SPHERE, Location::new(45.0, 45.0), 4, 256, 256)
    }

    /// Level n's delta halves at each step of the pyramid.
    #[test]
    fn test_delta_geometric_progression() {
        let levels = full_sphere_set();
        for n in 0..levels.num_levels() {
            let level = levels.level(n).unwrap();
            let expected = 45.0 / (1u64 << n) as f64;
            assert_eq!(level.tile_delta.latitude, expected, "level {n} latitude delta");
            assert_eq!(level.tile_delta.longitude, expected, "level {n} longitude delta");
        }
        assert_eq!(levels.level(3).unwrap().tile_delta.latitude, 5.625);
    }

    /// Texel size is latitude delta in radians over the tile height.
    #[test]
    fn test_texel_size() {
        let levels = full_sphere_set();
        let level = levels.first_level();
        let expected = 45.0f64.to_radians() / 256.0;
        assert!((level.texel_size - expected).abs() < 1e-15);
    }

    #[test]
    fn test_accessors() {
        let levels = full_sphere_set();
        assert_eq!(levels.num_levels(), 4);
        assert_eq!(levels.first_level().level_number, 0);
        assert_eq!(levels.last_level().level_number, 3);
        assert!(levels.is_last_level(3));
        assert!(!levels.is_last_level(2));
        assert!(levels.level(4).is_none());
        assert_eq!(levels.levels().len(), 4);
        assert_eq!(*levels.sector(), Sector::FULL_SPHERE);
    }

    #[test]
    #[should_panic(expected = "first-level tile delta must be positive")]
    fn test_rejects_non_positive_delta() {
        let _ = LevelSet::new(Sector::FULL_SPHERE, Location::new(0.0, 45.0), 4, 32, 32);
    }

    #[test]
    #[should_panic(expected = "level set needs at least one level")]
    fn test_rejects_zero_levels() {
        let _ = LevelSet::new(Sector::FULL_SPHERE, Location::new(45.0, 45.0), 0, 32, 32);
    }

    #[test]
    #[should_panic(expected = "tile dimensions must be positive")]
    fn test_rejects_zero_tile_dimension() {
        let _ = LevelSet::new(Sector::FULL_SPHERE, Location::new(45.0, 45.0), 4, 32, 0);
    }

    /// The deepest allowed pyramid still has finite, positive deltas.
    #[test]
    fn test_accepts_the_maximum_depth() {
        let levels = LevelSet::new(
            Sector::FULL_SPHERE,
            Location::new(45.0, 45.0),
            MAX_NUM_LEVELS,
            32,
            32,
        );
        assert_eq!(levels.num_levels(), MAX_NUM_LEVELS);
        let finest = levels.last_level();
        assert!(finest.tile_delta.latitude > 0.0);
        assert!(finest.texel_size > 0.0);
    }

    #[test]
    #[should_panic(expected = "limited to 48 levels")]
    fn test_rejects_excessive_depth() {
        let _ = LevelSet::new(Sector::FULL_SPHERE, Location::new(45.0, 45.0), 64, 32, 32);
    }
}
