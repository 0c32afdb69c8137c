//! Tiles backed by off-screen render targets.

use std::fmt;

use tellus_cache::GpuResourceCache;
use tellus_coords::Sector;

use crate::level::Level;
use crate::tile::{Tile, TileKey};

/// Cache key naming one controller's render target for one tile.
///
/// Render targets live in a GPU cache shared across controllers, so the
/// tile identity alone is ambiguous; the owning controller's id
/// disambiguates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FramebufferKey {
    /// Process-unique id of the controller owning the target.
    pub controller_id: u64,
    /// The tile the target covers.
    pub tile: TileKey,
}

impl fmt::Display for FramebufferKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.controller_id, self.tile)
    }
}

/// A quadtree tile whose payload is an off-screen render target.
///
/// The tile itself never creates GPU resources; callers supply them
/// through [`FramebufferTile::framebuffer`].
#[derive(Clone, Debug)]
pub struct FramebufferTile {
    /// The underlying quadtree tile.
    pub tile: Tile,
    key: FramebufferKey,
}

impl FramebufferTile {
    /// Create a framebuffer tile owned by `controller_id`.
    #[must_use]
    pub fn new(
        sector: Sector,
        level: &Level,
        row: usize,
        column: usize,
        controller_id: u64,
    ) -> Self {
        Self::from_tile(Tile::new(sector, level, row, column), controller_id)
    }

    /// Wrap an existing quadtree tile.
    #[must_use]
    pub fn from_tile(tile: Tile, controller_id: u64) -> Self {
        let key = FramebufferKey {
            controller_id,
            tile: tile.key,
        };
        Self { tile, key }
    }

    /// In-memory size in bytes, for cache accounting.
    #[must_use]
    pub fn size(&self) -> u64 {
        std::mem::size_of::<Self>() as u64
    }

    /// The key naming this tile's render target in a GPU cache.
    #[must_use]
    pub fn framebuffer_key(&self) -> FramebufferKey {
        self.key
    }

    /// The cached render target for this tile, created through `create` when
    /// absent.
    ///
    /// `create` returns the resource and its byte size for cache accounting.
    /// Targets displaced by the insertion are dropped; handle types that
    /// free on drop release their GPU memory here.
    pub fn framebuffer<'c, R>(
        &self,
        cache: &'c mut GpuResourceCache<FramebufferKey, R>,
        create: impl FnOnce() -> (R, u64),
    ) -> Option<&'c R> {
        if !cache.contains_resource(&self.key) {
            let (resource, size) = create();
            cache.put_resource(self.key, resource, size);
        }
        cache.resource_for_key(&self.key)
    }
}
