//! The globe model: an ellipsoid, a map projection, and an elevation source.
//!
//! [`Globe`] ties the pieces together and hands out a [`GlobeStateKey`] that
//! changes whenever cached terrain derived from the globe would become stale.
//! [`FrameState`] is the per-frame snapshot of the view that terrain
//! selection reads instead of talking to a camera directly.

mod elevations;
mod frame;
mod globe;

pub use elevations::{ElevationSource, ZeroElevationSource};
pub use frame::FrameState;
pub use globe::{Globe, GlobeStateKey};
