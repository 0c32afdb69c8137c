//! The terrain selection handed to renderers each frame.

use tellus_coords::Sector;
use tellus_globe::GlobeStateKey;
use tellus_tile::TileKey;

/// One edge of a tile's sector, in neighbor-array order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    North,
    South,
    East,
    West,
}

impl Edge {
    /// All four edges, in the order neighbor arrays are indexed.
    pub const ALL: [Edge; 4] = [Edge::North, Edge::South, Edge::East, Edge::West];

    /// Index of this edge into a neighbor array.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A tile chosen for rendering, with the levels of its edge neighbors.
///
/// Neighbor levels drive edge stitching: when an edge neighbor sits at a
/// coarser level than the tile itself, the renderer draws that border with
/// the half-resolution mesh so the two grids meet without cracks. `None`
/// means no selected tile shares that edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectedTile {
    /// Identity of the tile; geometry is fetched from the controller by key.
    pub key: TileKey,
    /// The geographic region the tile covers.
    pub sector: Sector,
    /// Level numbers of the selected neighbors sharing each edge.
    pub neighbor_levels: [Option<usize>; 4],
}

impl SelectedTile {
    /// The level number of the selected tile sharing `edge`, if any.
    #[must_use]
    pub fn neighbor_level(&self, edge: Edge) -> Option<usize> {
        self.neighbor_levels[edge.index()]
    }

    /// Whether the border along `edge` must be drawn with the
    /// half-resolution mesh to mate with a coarser neighbor.
    #[must_use]
    pub fn use_lores_border(&self, edge: Edge) -> bool {
        match self.neighbor_level(edge) {
            Some(neighbor_level) => neighbor_level < self.key.level,
            None => false,
        }
    }
}

/// The tiles selected for one frame.
///
/// A terrain is a value: cloning it is cheap and the clone stays valid for
/// the frame it was produced in. Vertex grids are not carried here; they
/// live in the controller's tile cache and are looked up by key.
#[derive(Clone, Debug)]
pub struct Terrain {
    sector: Sector,
    tiles: Vec<SelectedTile>,
    state_key: GlobeStateKey,
    vertical_exaggeration: f64,
    timestamp: u64,
}

impl Terrain {
    pub(crate) fn new(
        sector: Sector,
        tiles: Vec<SelectedTile>,
        state_key: GlobeStateKey,
        vertical_exaggeration: f64,
        timestamp: u64,
    ) -> Self {
        Self {
            sector,
            tiles,
            state_key,
            vertical_exaggeration,
            timestamp,
        }
    }

    pub(crate) fn empty(
        state_key: GlobeStateKey,
        vertical_exaggeration: f64,
        timestamp: u64,
    ) -> Self {
        Self::new(
            Sector::new(0.0, 0.0, 0.0, 0.0),
            Vec::new(),
            state_key,
            vertical_exaggeration,
            timestamp,
        )
    }

    /// Union of the selected tiles' sectors. Degenerate when no tiles were
    /// selected.
    #[must_use]
    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    /// The selected tiles, coarsest levels first within each top-level
    /// descent.
    #[must_use]
    pub fn tiles(&self) -> &[SelectedTile] {
        &self.tiles
    }

    /// The globe state this selection was computed against.
    #[must_use]
    pub fn state_key(&self) -> GlobeStateKey {
        self.state_key
    }

    /// The vertical exaggeration the selection was computed with.
    #[must_use]
    pub fn vertical_exaggeration(&self) -> f64 {
        self.vertical_exaggeration
    }

    /// Monotonic selection counter. Two terrains with the same timestamp
    /// are the same selection.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Whether the selection contains no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The number of selected tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }
}
