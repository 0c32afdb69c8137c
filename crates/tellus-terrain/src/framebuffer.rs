//! Tile selection for rendering surface overlays into off-screen targets.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::DMat4;
use rustc_hash::FxHashMap;
use tellus_cache::MemoryCache;
use tellus_coords::{Location, Sector};
use tellus_globe::{FrameState, Globe, GlobeStateKey};
use tellus_tile::{FramebufferTile, Level, LevelSet, Tile, TileKey};
use tracing::debug;

use crate::controller::is_tile_visible;

const FRAMEBUFFER_TILE_SIZE: usize = 256;
const FRAMEBUFFER_NUM_LEVELS: usize = 16;
const FRAMEBUFFER_FIRST_LEVEL_DELTA: f64 = 45.0;
/// Framebuffer tiles cover many screen pixels per texel, so they
/// subdivide far later than terrain tiles.
const FRAMEBUFFER_DETAIL_HINT_ORIGIN: f64 = 2.4;
const FRAMEBUFFER_CACHE_CAPACITY: u64 = 500_000;
const FRAMEBUFFER_CACHE_LOW_WATER: u64 = 400_000;

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(1);

/// Immutable inputs of one assembly pass.
struct AssembleContext<'a> {
    globe: &'a Globe,
    frame: &'a FrameState,
    levels: &'a LevelSet,
    detail_factor: f64,
    controller_id: u64,
}

/// Selects the tiles whose render targets compose surface overlays.
///
/// Works like terrain selection without the geometry and neighbor
/// phases: tiles subdivide against the view until their texel size
/// suffices, and the assembled set is memoized per view. Each controller
/// gets a process-unique id so its render-target keys never collide with
/// another controller's in a shared GPU cache.
pub struct FramebufferTileController {
    controller_id: u64,
    levels: LevelSet,
    detail_hint_origin: f64,
    tile_cache: MemoryCache<TileKey, FramebufferTile>,
    top_level_tiles: FxHashMap<(u64, &'static str), Vec<FramebufferTile>>,
    assembled: Vec<FramebufferTile>,
    last_frame: Option<(GlobeStateKey, f64, DMat4)>,
}

impl FramebufferTileController {
    /// A controller over the whole globe: 45-degree top-level tiles of
    /// 256x256 texels, refined through 16 levels.
    #[must_use]
    pub fn new() -> Self {
        let levels = LevelSet::new(
            Sector::FULL_SPHERE,
            Location::new(FRAMEBUFFER_FIRST_LEVEL_DELTA, FRAMEBUFFER_FIRST_LEVEL_DELTA),
            FRAMEBUFFER_NUM_LEVELS,
            FRAMEBUFFER_TILE_SIZE,
            FRAMEBUFFER_TILE_SIZE,
        );
        Self {
            controller_id: NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed),
            levels,
            detail_hint_origin: FRAMEBUFFER_DETAIL_HINT_ORIGIN,
            tile_cache: MemoryCache::new(FRAMEBUFFER_CACHE_CAPACITY, FRAMEBUFFER_CACHE_LOW_WATER),
            top_level_tiles: FxHashMap::default(),
            assembled: Vec::new(),
            last_frame: None,
        }
    }

    /// The id scoping this controller's render-target keys.
    #[must_use]
    pub fn controller_id(&self) -> u64 {
        self.controller_id
    }

    /// The level-set pyramid tiles are selected from.
    #[must_use]
    pub fn levels(&self) -> &LevelSet {
        &self.levels
    }

    /// Drop the memoized assembly so the next call recomputes it.
    pub fn invalidate(&mut self) {
        self.last_frame = None;
    }

    /// The tiles overlapping `sector`, at detail matched to the view.
    ///
    /// The underlying assembly covers everything visible and is memoized
    /// per (globe state, exaggeration, view matrix); each call filters it
    /// by the requested sector. A globe without an elevation source
    /// yields nothing.
    pub fn select_tiles(
        &mut self,
        globe: &Globe,
        frame: &FrameState,
        sector: &Sector,
    ) -> Vec<FramebufferTile> {
        if !globe.has_elevations() {
            debug!("globe has no elevation source, selecting no framebuffer tiles");
            return Vec::new();
        }

        let frame_stamp = (
            frame.globe_state_key,
            frame.vertical_exaggeration,
            frame.modelview_projection,
        );
        if self.last_frame != Some(frame_stamp) {
            self.assemble(globe, frame);
            self.last_frame = Some(frame_stamp);
        }

        self.assembled
            .iter()
            .filter(|tile| tile.tile.sector.overlaps(sector))
            .cloned()
            .collect()
    }

    fn assemble(&mut self, globe: &Globe, frame: &FrameState) {
        let grid_key = (
            frame.globe_state_key.globe_id,
            frame.globe_state_key.projection,
        );
        let mut top_tiles = match self.top_level_tiles.remove(&grid_key) {
            Some(tiles) => tiles,
            None => {
                let controller_id = self.controller_id;
                let mut tiles = Vec::new();
                Tile::create_tiles_for_level(
                    &self.levels,
                    self.levels.first_level(),
                    |sector, level, row, column| {
                        FramebufferTile::new(sector, level, row, column, controller_id)
                    },
                    &mut tiles,
                );
                tiles
            }
        };

        self.assembled.clear();
        let ctx = AssembleContext {
            globe,
            frame,
            levels: &self.levels,
            detail_factor: self.detail_hint_origin,
            controller_id: self.controller_id,
        };
        for top in &mut top_tiles {
            top.tile.update(globe, frame);
            if is_tile_visible(globe, frame, &top.tile) {
                add_tile_or_descendants(&ctx, &mut self.tile_cache, &mut self.assembled, &top.tile);
            }
        }

        self.top_level_tiles.insert(grid_key, top_tiles);
        debug!(
            "assembled {} framebuffer tiles for controller {}",
            self.assembled.len(),
            self.controller_id
        );
    }
}

impl Default for FramebufferTileController {
    fn default() -> Self {
        Self::new()
    }
}

fn add_tile_or_descendants(
    ctx: &AssembleContext,
    cache: &mut MemoryCache<TileKey, FramebufferTile>,
    assembled: &mut Vec<FramebufferTile>,
    tile: &Tile,
) {
    if ctx.levels.is_last_level(tile.key.level)
        || !tile.must_subdivide(ctx.globe, ctx.frame, ctx.detail_factor)
    {
        assembled.push(FramebufferTile::from_tile(tile.clone(), ctx.controller_id));
        return;
    }

    let Some(next_level) = ctx.levels.level(tile.key.level + 1) else {
        return;
    };
    for key in subdivide_to_cache(tile, next_level, ctx.controller_id, cache) {
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
        add_tile_or_descendants(ctx, cache, assembled, &child);
    }
}

fn subdivide_to_cache(
    parent: &Tile,
    next_level: &Level,
    controller_id: u64,
    cache: &mut MemoryCache<TileKey, FramebufferTile>,
) -> [TileKey; 4] {
    parent.subdivide(next_level).map(|child| {
        let key = child.key;
        if cache.entry_for_key(&key).is_none() {
            let tile = FramebufferTile::from_tile(child, controller_id);
            let size = tile.size();
            cache.put_entry(key, tile, size);
        }
        key
    })
}
