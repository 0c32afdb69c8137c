//! Per-frame terrain selection for the Tellus globe engine.
//!
//! [`TileController`] walks the tile pyramid each frame and produces a
//! [`Terrain`]: the flat list of tiles whose combined resolution satisfies
//! the view, ready for the renderer. [`SharedGeometry`] carries the index
//! and texture-coordinate buffers every tile of a grid size shares, and
//! [`FramebufferTileController`] runs the same selection for surface
//! overlays rendered into off-screen targets.

mod controller;
mod framebuffer;
mod geometry;
mod terrain;

pub use controller::TileController;
pub use framebuffer::FramebufferTileController;
pub use geometry::{SharedGeometry, TileVertex};
pub use terrain::{Edge, SelectedTile, Terrain};
