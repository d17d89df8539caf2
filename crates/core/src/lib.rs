//! Continuous Casting Strand Core Library
//!
//! Holds the solidifying strand as a moving window of cross-section slices and
//! derives the views a remote client renders from it.
//!
//! ## Building blocks
//!
//! - Windowed field store: fixed-capacity ring of quadrant slices with O(1)
//!   front insertion, back eviction and random access
//! - Derived-data engine: mirrored faces and cross-sections, solidus/liquidus
//!   front distances, longitudinal curves and maps
//! - Stepper interface for the external heat-conduction solver, plus a lumped
//!   cooling stand-in
//! - Steel grade catalog for phase temperatures

// Session configuration values
pub mod config;
pub mod error;

// Strand storage and derived views
pub mod derived;
pub mod field;

// External collaborators
pub mod steel;
pub mod stepper;

// Re-export core types
pub use config::{CastingParameters, Coordinate, Geometry, PhaseThresholds, ViewScale, WaterFlow};
pub use error::{GeometryError, QueryError, StoreError};
pub use field::{FieldStore, Slice};

// Re-export derived records
pub use derived::{FieldView, Join, SliceInfo, Snapshot, VerticalCurve, VerticalMap};

// Re-export collaborator interfaces
pub use steel::{StaticSteelCatalog, SteelCatalog};
pub use stepper::{LumpedCoolingStepper, SliceStepper, StepOutcome};
