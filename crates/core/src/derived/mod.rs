//! Derived-data engine
//!
//! Pure functions over a field state: mirrored faces and cross-sections,
//! solidification front distances, longitudinal curves and maps.

mod front;
mod mirror;
mod records;
mod view;

pub use front::{front_distance, Crossing, Join, JoinTracker};
pub use mirror::{mirror_index, Subsample};
pub use records::{Matrix, Sides, SliceInfo, Snapshot, VerticalCurve, VerticalMap};
pub use view::{FieldView, DEFAULT_CURVE_STRIDE};
