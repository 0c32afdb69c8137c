//! Index and texture-coordinate buffers shared by every tile of a grid size.
//!
//! Tile vertex grids all have the same topology, so the triangle strips,
//! border meshes, texture coordinates and debug outlines are built once per
//! controller and reused for every tile. Border meshes come in two
//! variants: a full-resolution strip for neighbors at the same level, and a
//! half-resolution strip that skips every other exterior vertex so the tile
//! mates with a neighbor one level coarser without cracks.

use crate::terrain::Edge;

/// Per-vertex attributes shared by every tile: texture coordinates over the
/// unit square, `(0, 0)` at the south-west corner and `(1, 1)` at the
/// north-east.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TileVertex {
    pub tex_coord: [f32; 2],
}

static_assertions::assert_eq_size!(TileVertex, [u8; 8]);

/// Geometry shared by all tiles with the same grid dimensions.
///
/// Vertex indices address the row-major point grid produced by
/// [`tellus_tile::TerrainTile::build_geometry`]: `tile_width + 1` points
/// per row, south row first. The interior mesh is a single triangle strip
/// (pairs of columns joined by degenerate triangles) inset one ring from
/// the grid edge; the border meshes fill that ring.
#[derive(Clone, Debug)]
pub struct SharedGeometry {
    pub tile_width: usize,
    pub tile_height: usize,
    /// One entry per grid point.
    pub tex_coords: Vec<TileVertex>,
    /// Interior triangle strip.
    pub indices: Vec<u16>,
    pub indices_north: Vec<u16>,
    pub indices_south: Vec<u16>,
    pub indices_west: Vec<u16>,
    pub indices_east: Vec<u16>,
    /// Half-resolution borders for edges shared with a coarser neighbor.
    pub indices_lores_north: Vec<u16>,
    pub indices_lores_south: Vec<u16>,
    pub indices_lores_west: Vec<u16>,
    pub indices_lores_east: Vec<u16>,
    /// Line-list indices drawing every grid edge.
    pub wireframe_indices: Vec<u16>,
    /// Line-strip indices tracing the tile perimeter.
    pub outline_indices: Vec<u16>,
}

impl SharedGeometry {
    /// Build the shared buffers for tiles `tile_width` by `tile_height`
    /// cells.
    ///
    /// # Panics
    ///
    /// Panics when either dimension is below two cells or the resulting
    /// grid has more points than a 16-bit index can address.
    #[must_use]
    pub fn new(tile_width: usize, tile_height: usize) -> Self {
        assert!(
            tile_width >= 2 && tile_height >= 2,
            "tile grids need at least two cells per side"
        );
        let num_points = (tile_width + 1) * (tile_height + 1);
        assert!(
            num_points <= usize::from(u16::MAX) + 1,
            "tile grid exceeds 16-bit index range"
        );

        Self {
            tile_width,
            tile_height,
            tex_coords: build_tex_coords(tile_width, tile_height),
            indices: build_interior_indices(tile_width, tile_height),
            indices_north: build_north_border(tile_width, tile_height, false),
            indices_south: build_south_border(tile_width, false),
            indices_west: build_west_border(tile_width, tile_height, false),
            indices_east: build_east_border(tile_width, tile_height, false),
            indices_lores_north: build_north_border(tile_width, tile_height, true),
            indices_lores_south: build_south_border(tile_width, true),
            indices_lores_west: build_west_border(tile_width, tile_height, true),
            indices_lores_east: build_east_border(tile_width, tile_height, true),
            wireframe_indices: build_wireframe_indices(tile_width, tile_height),
            outline_indices: build_outline_indices(tile_width, tile_height),
        }
    }

    /// The number of points in each tile's vertex grid.
    #[must_use]
    pub fn num_points(&self) -> usize {
        (self.tile_width + 1) * (self.tile_height + 1)
    }

    /// The border strip for `edge`, half-resolution when `lores` is set.
    #[must_use]
    pub fn border_indices(&self, edge: Edge, lores: bool) -> &[u16] {
        match (edge, lores) {
            (Edge::North, false) => &self.indices_north,
            (Edge::South, false) => &self.indices_south,
            (Edge::East, false) => &self.indices_east,
            (Edge::West, false) => &self.indices_west,
            (Edge::North, true) => &self.indices_lores_north,
            (Edge::South, true) => &self.indices_lores_south,
            (Edge::East, true) => &self.indices_lores_east,
            (Edge::West, true) => &self.indices_lores_west,
        }
    }

    /// Texture coordinates as bytes for GPU upload (zero-copy).
    #[must_use]
    pub fn tex_coord_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.tex_coords)
    }
}

fn build_tex_coords(tile_width: usize, tile_height: usize) -> Vec<TileVertex> {
    let num_lon = tile_width + 1;
    let num_lat = tile_height + 1;
    let delta_s = 1.0 / tile_width as f32;
    let delta_t = 1.0 / tile_height as f32;

    let mut tex_coords = Vec::with_capacity(num_lat * num_lon);
    for lat_index in 0..num_lat {
        // Force the last row and column to exactly 1 so accumulated
        // rounding never leaves the unit square.
        let t = if lat_index == num_lat - 1 {
            1.0
        } else {
            lat_index as f32 * delta_t
        };
        for lon_index in 0..num_lon {
            let s = if lon_index == num_lon - 1 {
                1.0
            } else {
                lon_index as f32 * delta_s
            };
            tex_coords.push(TileVertex { tex_coord: [s, t] });
        }
    }
    tex_coords
}

/// One triangle strip covering the grid inset by one ring: adjacent vertex
/// columns are zipped into strip columns, and two degenerate triangles
/// bridge each column to the next.
fn build_interior_indices(tile_width: usize, tile_height: usize) -> Vec<u16> {
    let num_lon = tile_width + 1;
    let num_lat = tile_height + 1;

    let columns = num_lon - 3;
    let mut indices = Vec::with_capacity(2 * columns * (num_lat - 1));
    for lon_index in 1..num_lon - 2 {
        for lat_index in 1..num_lat - 1 {
            let vertex = lon_index + lat_index * num_lon;
            indices.push(vertex as u16);
            indices.push((vertex + 1) as u16);
        }

        // Repeat the column's last vertex and the next column's first to
        // produce two degenerate triangles between columns.
        let last = lon_index + (num_lat - 2) * num_lon;
        indices.push((last + 1) as u16);
        indices.push((lon_index + 1 + num_lon) as u16);
    }
    indices
}

/// North border strip, east to west. Half-resolution variants round each
/// exterior vertex to an even column so the edge only uses vertices shared
/// with a neighbor one level coarser.
fn build_north_border(tile_width: usize, tile_height: usize, lores: bool) -> Vec<u16> {
    let num_lon = tile_width + 1;
    let top = tile_height;

    let mut indices = Vec::with_capacity(2 * num_lon - 2);
    indices.push((num_lon - 1 + top * num_lon) as u16);
    for lon_index in (1..=num_lon - 2).rev() {
        let exterior = if lores { (lon_index + 1) & !1 } else { lon_index };
        indices.push((exterior + top * num_lon) as u16);
        indices.push((lon_index + (top - 1) * num_lon) as u16);
    }
    indices.push((top * num_lon) as u16);
    indices
}

/// South border strip, west to east.
fn build_south_border(tile_width: usize, lores: bool) -> Vec<u16> {
    let num_lon = tile_width + 1;

    let mut indices = Vec::with_capacity(2 * num_lon - 2);
    indices.push(0);
    for lon_index in 1..=num_lon - 2 {
        let exterior = if lores { lon_index & !1 } else { lon_index };
        indices.push(exterior as u16);
        indices.push((lon_index + num_lon) as u16);
    }
    indices.push((num_lon - 1) as u16);
    indices
}

/// West border strip, north to south.
fn build_west_border(tile_width: usize, tile_height: usize, lores: bool) -> Vec<u16> {
    let num_lon = tile_width + 1;
    let num_lat = tile_height + 1;

    let mut indices = Vec::with_capacity(2 * num_lat - 2);
    indices.push(((num_lat - 1) * num_lon) as u16);
    for lat_index in (1..=num_lat - 2).rev() {
        let exterior = if lores { (lat_index + 1) & !1 } else { lat_index };
        indices.push((exterior * num_lon) as u16);
        indices.push((1 + lat_index * num_lon) as u16);
    }
    indices.push(0);
    indices
}

/// East border strip, south to north.
fn build_east_border(tile_width: usize, tile_height: usize, lores: bool) -> Vec<u16> {
    let num_lon = tile_width + 1;
    let num_lat = tile_height + 1;

    let mut indices = Vec::with_capacity(2 * num_lat - 2);
    indices.push((num_lon - 1) as u16);
    for lat_index in 1..=num_lat - 2 {
        let exterior = if lores { lat_index & !1 } else { lat_index };
        indices.push((num_lon - 1 + exterior * num_lon) as u16);
        indices.push((num_lon - 2 + lat_index * num_lon) as u16);
    }
    indices.push((num_lon - 1 + (num_lat - 1) * num_lon) as u16);
    indices
}

/// Line-list segments along every row and column of the grid.
fn build_wireframe_indices(tile_width: usize, tile_height: usize) -> Vec<u16> {
    let num_lon = tile_width + 1;
    let num_lat = tile_height + 1;

    let mut indices =
        Vec::with_capacity(2 * tile_width * num_lat + 2 * tile_height * num_lon);
    for lat_index in 0..num_lat {
        for lon_index in 0..tile_width {
            let vertex = lon_index + lat_index * num_lon;
            indices.push(vertex as u16);
            indices.push((vertex + 1) as u16);
        }
    }
    for lon_index in 0..num_lon {
        for lat_index in 0..tile_height {
            let vertex = lon_index + lat_index * num_lon;
            indices.push(vertex as u16);
            indices.push((vertex + num_lon) as u16);
        }
    }
    indices
}

/// Line strip tracing the tile perimeter counter-clockwise, closed at the
/// south-west corner.
fn build_outline_indices(tile_width: usize, tile_height: usize) -> Vec<u16> {
    let num_lon = tile_width + 1;
    let num_lat = tile_height + 1;

    let mut indices = Vec::with_capacity(2 * num_lon + 2 * num_lat - 1);
    // South edge, west to east.
    for lon_index in 0..num_lon {
        indices.push(lon_index as u16);
    }
    // East edge, south to north.
    for lat_index in 1..num_lat {
        indices.push((num_lon - 1 + lat_index * num_lon) as u16);
    }
    // North edge, east to west.
    for lon_index in (0..num_lon).rev() {
        indices.push((lon_index + (num_lat - 1) * num_lon) as u16);
    }
    // West edge, north to south, ending back at the south-west corner.
    for lat_index in (0..num_lat).rev() {
        indices.push((lat_index * num_lon) as u16);
    }
    indices
}
