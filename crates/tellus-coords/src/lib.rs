//! Geographic and Cartesian primitives for the Tellus globe engine.
//!
//! Provides the value types the tiling and projection layers are built on:
//! [`Location`] and [`Position`] in geographic coordinates, [`Sector`] for
//! rectangular lat/lon regions, and f64 culling geometry ([`Plane`],
//! [`Frustum`], [`BoundingBox`]) in model coordinates.

mod bounds;
mod frustum;
mod position;
mod sector;

pub use bounds::BoundingBox;
pub use frustum::{Frustum, Intersection, Plane};
pub use position::{Location, Position};
pub use sector::Sector;
