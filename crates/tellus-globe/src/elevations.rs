//! The boundary between terrain geometry and elevation data.

use tellus_coords::Sector;

/// A supplier of terrain heights.
///
/// Implementations are typically backed by tiled datasets whose coverage
/// grows as data arrives, so every answer is a best effort against what is
/// currently resident. The [`timestamp`](ElevationSource::timestamp) method
/// reports when that changes.
pub trait ElevationSource {
    /// A monotonic counter that increases whenever previously returned
    /// elevations may have changed. Consumers compare timestamps to decide
    /// whether cached geometry is stale.
    fn timestamp(&self) -> u64;

    /// The lowest and highest elevation within `sector`, in meters, or
    /// `None` when nothing is known about the sector yet.
    fn min_and_max_elevations_for_sector(&self, sector: &Sector) -> Option<(f64, f64)>;

    /// Fill `out` with elevations for a regular grid spanning `sector`,
    /// `(num_lat + 1) * (num_lon + 1)` samples row-major from the south-west
    /// corner. Returns `false` when no data is available, in which case
    /// `out` is untouched and the caller falls back to zero heights.
    fn elevations_for_grid(
        &self,
        sector: &Sector,
        num_lat: usize,
        num_lon: usize,
        out: &mut [f64],
    ) -> bool;
}

/// An elevation source reporting zero height everywhere. Used for globes
/// without terrain relief.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroElevationSource;

impl ElevationSource for ZeroElevationSource {
    fn timestamp(&self) -> u64 {
        0
    }

    fn min_and_max_elevations_for_sector(&self, _sector: &Sector) -> Option<(f64, f64)> {
        Some((0.0, 0.0))
    }

    fn elevations_for_grid(
        &self,
        _sector: &Sector,
        _num_lat: usize,
        _num_lon: usize,
        out: &mut [f64],
    ) -> bool {
        out.fill(0.0);
        true
    }
}
