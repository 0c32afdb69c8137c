//! Frame-by-frame terrain tile selection.

use glam::{DMat4, DVec3};
use rustc_hash::{FxHashMap, FxHashSet};
use tellus_cache::MemoryCache;
use tellus_coords::{Intersection, Location, Sector};
use tellus_globe::{FrameState, Globe, GlobeStateKey};
use tellus_tile::{LevelSet, TerrainTile, Tile, TileKey};
use tracing::{debug, trace};

use crate::geometry::SharedGeometry;
use crate::terrain::{SelectedTile, Terrain};

const DEFAULT_NUM_LEVELS: usize = 15;
const DEFAULT_TILE_WIDTH: usize = 32;
const DEFAULT_TILE_HEIGHT: usize = 32;
const DEFAULT_FIRST_LEVEL_DELTA: f64 = 45.0;
const DEFAULT_DETAIL_HINT_ORIGIN: f64 = 1.1;
const DEFAULT_TILE_CACHE_CAPACITY: u64 = 5_000_000;
const DEFAULT_TILE_CACHE_LOW_WATER: u64 = 4_000_000;

/// Tiles fully poleward of this latitude subdivide a little later.
const POLAR_LATITUDE: f64 = 75.0;
const POLAR_DETAIL_SCALE: f64 = 0.9;

/// Corner coordinates keyed by exact bit pattern.
///
/// Every tile corner in a level set is the level-set origin plus a dyadic
/// multiple of the first-level delta, so tiles sharing a corner produce
/// bit-identical coordinates no matter which subdivision path created
/// them.
type CornerKey = (u64, u64);

fn corner_key(latitude: f64, longitude: f64) -> CornerKey {
    (latitude.to_bits(), longitude.to_bits())
}

/// Which selected tiles have a corner of theirs at one coordinate, by
/// working-set index and by which of their corners it is.
#[derive(Clone, Copy, Debug, Default)]
struct CornerRoles {
    sw: Option<usize>,
    nw: Option<usize>,
    se: Option<usize>,
    ne: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
struct WorkingTile {
    key: TileKey,
    sector: Sector,
}

/// The selection being assembled for one frame: the tiles chosen so far
/// and the corner map used to find their neighbors.
#[derive(Default)]
struct WorkingSet {
    tiles: Vec<WorkingTile>,
    corners: FxHashMap<CornerKey, CornerRoles>,
}

impl WorkingSet {
    fn clear(&mut self) {
        self.tiles.clear();
        self.corners.clear();
    }

    fn add_tile(&mut self, key: TileKey, sector: Sector) {
        let index = self.tiles.len();
        self.tiles.push(WorkingTile { key, sector });

        self.corners
            .entry(corner_key(sector.min_latitude, sector.min_longitude))
            .or_default()
            .sw = Some(index);
        self.corners
            .entry(corner_key(sector.max_latitude, sector.min_longitude))
            .or_default()
            .nw = Some(index);
        self.corners
            .entry(corner_key(sector.min_latitude, sector.max_longitude))
            .or_default()
            .se = Some(index);
        self.corners
            .entry(corner_key(sector.max_latitude, sector.max_longitude))
            .or_default()
            .ne = Some(index);
    }

    fn roles_at(&self, latitude: f64, longitude: f64) -> CornerRoles {
        self.corners
            .get(&corner_key(latitude, longitude))
            .copied()
            .unwrap_or_default()
    }
}

/// Immutable inputs of one selection pass.
struct SelectContext<'a> {
    globe: &'a Globe,
    frame: &'a FrameState,
    levels: &'a LevelSet,
    detail_factor: f64,
}

/// Selects the terrain tiles to render each frame.
///
/// The controller owns the level-set pyramid, a memory cache of terrain
/// tiles keyed by identity, and the geometry buffers shared by all tiles.
/// Top-level tiles are created once per globe grid and kept for the
/// controller's lifetime; everything finer lives in the cache and is
/// recreated on demand after eviction.
pub struct TileController {
    levels: LevelSet,
    shared_geometry: SharedGeometry,
    detail_hint_origin: f64,
    detail_hint: f64,
    tile_cache: MemoryCache<TileKey, TerrainTile>,
    top_level_tiles: FxHashMap<(u64, &'static str), Vec<TerrainTile>>,
    working: WorkingSet,
    timestamp: u64,
    last_frame: Option<(GlobeStateKey, f64, DMat4)>,
    last_terrain: Option<Terrain>,
}

impl TileController {
    /// A controller over the whole globe: 45-degree top-level tiles of
    /// 32x32 cells, refined through 15 levels.
    #[must_use]
    pub fn new() -> Self {
        let levels = LevelSet::new(
            Sector::FULL_SPHERE,
            Location::new(DEFAULT_FIRST_LEVEL_DELTA, DEFAULT_FIRST_LEVEL_DELTA),
            DEFAULT_NUM_LEVELS,
            DEFAULT_TILE_WIDTH,
            DEFAULT_TILE_HEIGHT,
        );
        Self::with_levels(
            levels,
            DEFAULT_DETAIL_HINT_ORIGIN,
            DEFAULT_TILE_CACHE_CAPACITY,
            DEFAULT_TILE_CACHE_LOW_WATER,
        )
    }

    /// A controller over a custom level set and cache tuning.
    ///
    /// # Panics
    ///
    /// Panics when the level set's tile dimensions cannot be indexed by
    /// the shared 16-bit index buffers.
    #[must_use]
    pub fn with_levels(
        levels: LevelSet,
        detail_hint_origin: f64,
        cache_capacity: u64,
        cache_low_water: u64,
    ) -> Self {
        let first = levels.first_level();
        let shared_geometry = SharedGeometry::new(first.tile_width, first.tile_height);
        Self {
            levels,
            shared_geometry,
            detail_hint_origin,
            detail_hint: 0.0,
            tile_cache: MemoryCache::new(cache_capacity, cache_low_water),
            top_level_tiles: FxHashMap::default(),
            working: WorkingSet::default(),
            timestamp: 0,
            last_frame: None,
            last_terrain: None,
        }
    }

    /// The level-set pyramid tiles are selected from.
    #[must_use]
    pub fn levels(&self) -> &LevelSet {
        &self.levels
    }

    /// Index and texture-coordinate buffers shared by every tile.
    #[must_use]
    pub fn shared_geometry(&self) -> &SharedGeometry {
        &self.shared_geometry
    }

    /// The tile cache, for inspection.
    #[must_use]
    pub fn tile_cache(&self) -> &MemoryCache<TileKey, TerrainTile> {
        &self.tile_cache
    }

    /// The current detail hint. See [`TileController::set_detail_hint`].
    #[must_use]
    pub fn detail_hint(&self) -> f64 {
        self.detail_hint
    }

    /// Nudge subdivision eagerness. Positive values tolerate coarser
    /// tiles; negative values subdivide sooner. Typical values lie within
    /// half a unit of zero.
    pub fn set_detail_hint(&mut self, detail_hint: f64) {
        if self.detail_hint != detail_hint {
            self.detail_hint = detail_hint;
            self.invalidate();
        }
    }

    /// Drop the memoized selection so the next frame recomputes it.
    pub fn invalidate(&mut self) {
        self.last_frame = None;
        self.last_terrain = None;
    }

    /// Choose the terrain tiles to render for one frame.
    ///
    /// Selection descends from the top-level tiles, keeping each visible
    /// tile whose texel size is fine enough for its distance from the eye
    /// and subdividing the rest. Neighbor refinement then subdivides any
    /// selected tile more than one level coarser than a tile it touches,
    /// so border stitching always has a mating edge. Finally every
    /// selected tile's vertex grid is built or refreshed.
    ///
    /// The result is memoized: repeated calls with an unchanged globe
    /// state, vertical exaggeration and view matrix return the previous
    /// selection. A globe without an elevation source selects nothing.
    pub fn select_tiles(&mut self, globe: &Globe, frame: &FrameState) -> Terrain {
        let frame_stamp = (
            frame.globe_state_key,
            frame.vertical_exaggeration,
            frame.modelview_projection,
        );
        if let Some(terrain) = &self.last_terrain {
            if self.last_frame == Some(frame_stamp) {
                trace!("view unchanged, reusing {} selected tiles", terrain.len());
                return terrain.clone();
            }
        }

        self.timestamp += 1;

        if !globe.has_elevations() {
            debug!("globe has no elevation source, selecting no terrain");
            return Terrain::empty(
                frame.globe_state_key,
                frame.vertical_exaggeration,
                self.timestamp,
            );
        }

        // Top-level tiles are created lazily, once per globe grid.
        let grid_key = (
            frame.globe_state_key.globe_id,
            frame.globe_state_key.projection,
        );
        let mut top_tiles = match self.top_level_tiles.remove(&grid_key) {
            Some(tiles) => tiles,
            None => {
                let mut tiles = Vec::new();
                Tile::create_tiles_for_level(
                    &self.levels,
                    self.levels.first_level(),
                    TerrainTile::new,
                    &mut tiles,
                );
                debug!(
                    "created {} top-level tiles for globe {} ({})",
                    tiles.len(),
                    grid_key.0,
                    grid_key.1
                );
                tiles
            }
        };

        // Phase 1: descend from the top-level tiles.
        self.working.clear();
        let ctx = SelectContext {
            globe,
            frame,
            levels: &self.levels,
            detail_factor: self.detail_hint_origin + self.detail_hint,
        };
        for top in &mut top_tiles {
            top.tile.update(globe, frame);
            if is_tile_visible(globe, frame, &top.tile) {
                add_tile_or_descendants(&ctx, &mut self.tile_cache, &mut self.working, &top.tile);
            }
        }

        // Phase 2: subdivide tiles bordering much finer neighbors.
        refine_neighbors(&ctx, &mut self.tile_cache, &mut self.working);

        // Phase 3: resolve neighbor levels and refresh stale geometry. The
        // whole selection is pinned while it is re-established: recreating
        // one evicted tile must not displace another selected tile, even
        // when the selection exceeds the cache budget.
        let selected_keys: FxHashSet<TileKey> =
            self.working.tiles.iter().map(|tile| tile.key).collect();
        let mut selected = Vec::with_capacity(self.working.tiles.len());
        let mut sector: Option<Sector> = None;
        let mut rebuilt = 0usize;
        for index in 0..self.working.tiles.len() {
            let entry = self.working.tiles[index];
            let neighbor_levels = neighbor_levels(&self.working, index);

            let resident = match tile_mut(&mut self.tile_cache, &mut top_tiles, &entry.key) {
                Some(tile) => {
                    if tile.needs_geometry(globe, frame) {
                        tile.build_geometry(globe, frame);
                        rebuilt += 1;
                    }
                    true
                }
                None => false,
            };
            if !resident {
                // Evicted during this frame's descent; recreate so the
                // renderer can still fetch it by key.
                let Some(level) = self.levels.level(entry.key.level) else {
                    continue;
                };
                let mut tile =
                    TerrainTile::new(entry.sector, level, entry.key.row, entry.key.column);
                tile.build_geometry(globe, frame);
                rebuilt += 1;
                let size = tile.size();
                self.tile_cache
                    .put_entry_pinned(entry.key, tile, size, |key| selected_keys.contains(key));
            }

            sector = Some(match sector {
                Some(sector) => sector.union(&entry.sector),
                None => entry.sector,
            });
            selected.push(SelectedTile {
                key: entry.key,
                sector: entry.sector,
                neighbor_levels,
            });
        }

        self.top_level_tiles.insert(grid_key, top_tiles);

        let terrain = Terrain::new(
            sector.unwrap_or(Sector::new(0.0, 0.0, 0.0, 0.0)),
            selected,
            frame.globe_state_key,
            frame.vertical_exaggeration,
            self.timestamp,
        );
        debug!(
            "selected {} terrain tiles ({} geometry builds, cache {}/{} bytes)",
            terrain.len(),
            rebuilt,
            self.tile_cache.used_capacity(),
            self.tile_cache.capacity()
        );

        self.last_frame = Some(frame_stamp);
        self.last_terrain = Some(terrain.clone());
        terrain
    }

    /// The terrain tile for `key`, if it is resident.
    ///
    /// Tiles from the current selection are always resident; anything
    /// older may have been evicted. Cache hits refresh recency.
    pub fn tile(&mut self, key: &TileKey) -> Option<&TerrainTile> {
        if key.level == 0 {
            for tiles in self.top_level_tiles.values() {
                if let Some(tile) = tiles.iter().find(|tile| tile.key() == *key) {
                    return Some(tile);
                }
            }
            return None;
        }
        self.tile_cache.entry_for_key(key)
    }

    /// The model-coordinate point on the selected terrain at a location,
    /// from the first selected tile containing it.
    pub fn surface_point(
        &mut self,
        terrain: &Terrain,
        latitude: f64,
        longitude: f64,
    ) -> Option<DVec3> {
        for selected in terrain.tiles() {
            if !selected.sector.contains(latitude, longitude) {
                continue;
            }
            if let Some(tile) = self.tile(&selected.key) {
                if let Some(point) = tile.surface_point(latitude, longitude) {
                    return Some(point);
                }
            }
        }
        None
    }
}

impl Default for TileController {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an updated tile can appear on screen: inside the projection's
/// representable region and not culled by the frustum.
pub(crate) fn is_tile_visible(globe: &Globe, frame: &FrameState, tile: &Tile) -> bool {
    if let Some(limits) = globe.projection_limits() {
        if !tile.sector.overlaps(&limits) {
            return false;
        }
    }
    match tile.extent() {
        Some(extent) => frame.frustum.intersects_box(extent) != Intersection::Outside,
        None => false,
    }
}

fn tile_meets_render_criteria(ctx: &SelectContext, tile: &Tile) -> bool {
    if ctx.levels.is_last_level(tile.key.level) {
        return true;
    }
    let mut detail_factor = ctx.detail_factor;
    if tile.sector.min_latitude >= POLAR_LATITUDE || tile.sector.max_latitude <= -POLAR_LATITUDE {
        detail_factor *= POLAR_DETAIL_SCALE;
    }
    !tile.must_subdivide(ctx.globe, ctx.frame, detail_factor)
}

fn add_tile_or_descendants(
    ctx: &SelectContext,
    cache: &mut MemoryCache<TileKey, TerrainTile>,
    working: &mut WorkingSet,
    tile: &Tile,
) {
    if tile_meets_render_criteria(ctx, tile) {
        trace!("selected tile {}", tile.key);
        working.add_tile(tile.key, tile.sector);
        return;
    }
    add_tile_descendants(ctx, cache, working, tile);
}

fn add_tile_descendants(
    ctx: &SelectContext,
    cache: &mut MemoryCache<TileKey, TerrainTile>,
    working: &mut WorkingSet,
    parent: &Tile,
) {
    let Some(next_level) = ctx.levels.level(parent.key.level + 1) else {
        return;
    };
    for key in TerrainTile::subdivide_to_cache(parent, next_level, cache) {
        let Some(child) = cache.get_mut(&key) else {
            continue;
        };
        child.tile.update(ctx.globe, ctx.frame);
        if !ctx.levels.sector().intersects(&child.tile.sector) {
            continue;
        }
        if !is_tile_visible(ctx.globe, ctx.frame, &child.tile) {
            continue;
        }
        let child = child.tile.clone();
        add_tile_or_descendants(ctx, cache, working, &child);
    }
}

/// Repeatedly subdivide selected tiles bordering tiles more than one
/// level finer, until every edge gap is at most one level.
///
/// Each pass rebuilds the working set: unrefined tiles re-register as
/// they are, refined tiles are replaced by their visible descendants.
/// Every refined tile is replaced by strictly finer tiles, so the loop
/// terminates.
fn refine_neighbors(
    ctx: &SelectContext,
    cache: &mut MemoryCache<TileKey, TerrainTile>,
    working: &mut WorkingSet,
) {
    loop {
        let mut refine = vec![false; working.tiles.len()];
        for tile in &working.tiles {
            let level = tile.key.level;
            let sector = tile.sector;
            let ne = working.roles_at(sector.max_latitude, sector.max_longitude);
            let se = working.roles_at(sector.min_latitude, sector.max_longitude);
            let nw = working.roles_at(sector.max_latitude, sector.min_longitude);
            let sw = working.roles_at(sector.min_latitude, sector.min_longitude);

            // A neighbor anchored at any of this tile's corners that is
            // more than one level coarser must subdivide.
            for neighbor in [ne.se, ne.nw, se.ne, se.sw, nw.ne, nw.sw, sw.se, sw.nw] {
                if let Some(index) = neighbor {
                    if working.tiles[index].key.level + 1 < level {
                        refine[index] = true;
                    }
                }
            }
        }

        if !refine.iter().any(|&marked| marked) {
            return;
        }

        let previous = std::mem::take(&mut working.tiles);
        working.corners.clear();
        for (index, entry) in previous.into_iter().enumerate() {
            if !refine[index] {
                working.add_tile(entry.key, entry.sector);
                continue;
            }
            match ctx.levels.level(entry.key.level) {
                Some(level) => {
                    trace!("refining tile {} for finer neighbors", entry.key);
                    let tile = Tile::new(entry.sector, level, entry.key.row, entry.key.column);
                    add_tile_descendants(ctx, cache, working, &tile);
                }
                None => working.add_tile(entry.key, entry.sector),
            }
        }
    }
}

/// Levels of the selected tiles sharing each edge, found through the
/// corner map. An edge neighbor is anchored at one of the edge's two
/// corners with the matching corner of its own.
fn neighbor_levels(working: &WorkingSet, index: usize) -> [Option<usize>; 4] {
    let sector = working.tiles[index].sector;
    let ne = working.roles_at(sector.max_latitude, sector.max_longitude);
    let se = working.roles_at(sector.min_latitude, sector.max_longitude);
    let nw = working.roles_at(sector.max_latitude, sector.min_longitude);
    let sw = working.roles_at(sector.min_latitude, sector.min_longitude);

    let north = ne.se.or(nw.sw);
    let south = se.ne.or(sw.nw);
    let east = ne.nw.or(se.sw);
    let west = nw.ne.or(sw.se);

    [north, south, east, west].map(|neighbor| neighbor.map(|index| working.tiles[index].key.level))
}

fn tile_mut<'a>(
    cache: &'a mut MemoryCache<TileKey, TerrainTile>,
    top_tiles: &'a mut [TerrainTile],
    key: &TileKey,
) -> Option<&'a mut TerrainTile> {
    if key.level == 0 {
        return top_tiles.iter_mut().find(|tile| tile.key() == *key);
    }
    cache.get_mut(key)
}
