//! Quadtree tiling for the Tellus globe engine.
//!
//! A [`LevelSet`] fixes the resolution pyramid over a sector; [`Tile`]
//! carries the per-node footprint, identity and view-dependent culling
//! state; [`TerrainTile`] and [`FramebufferTile`] add the payloads the
//! terrain and surface-shape controllers select each frame.

mod framebuffer_tile;
mod level;
mod terrain_tile;
mod tile;

pub use framebuffer_tile::{FramebufferKey, FramebufferTile};
pub use level::{Level, LevelSet, MAX_NUM_LEVELS};
pub use terrain_tile::TerrainTile;
pub use tile::{Tile, TileKey};
