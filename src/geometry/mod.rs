//! Geometry module for printer-motion.
//!
//! Pure plane geometry used for bed leveling: plane construction from
//! calibrated points, region classification and height lookup.

mod bed;
mod plane;
mod vector;

pub use bed::{BedGeometry, Corner, Region, Side};
pub use plane::{Plane, PlaneEquation};
pub use vector::Vector3;
