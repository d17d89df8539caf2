//! Physics stepper interface
//!
//! The heat-conduction solver that produces slice temperatures lives outside
//! this crate. The session drives any implementation of [`SliceStepper`] one
//! step at a time while holding exclusive access to the field.

mod cooling;

pub use cooling::LumpedCoolingStepper;

use crate::config::{CastingParameters, Geometry};
use crate::error::StoreError;
use crate::field::FieldStore;

/// Result of one stepper advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The field moved on by one slice spacing
    Advanced,
    /// Tail casting drained the field; no further steps are possible
    Exhausted,
}

/// Backend-agnostic interface for the strand solver.
///
/// A step typically updates the stored slices in place, then appends a new
/// slice at the front (normal casting) or drains one from the back (tail
/// casting, [`FieldStore::is_tail`]).
pub trait SliceStepper: Send + Sync {
    /// Prepare for a newly configured session.
    ///
    /// # Arguments
    ///
    /// * `geometry` - Strand geometry, fixed for the session
    /// * `params` - Initial casting parameters
    fn configure(&mut self, geometry: &Geometry, params: &CastingParameters);

    /// Advance the strand by one slice spacing.
    ///
    /// # Errors
    ///
    /// Any [`StoreError`] leaves the field in an unknown state and ends the session.
    fn step(&mut self, params: &CastingParameters, field: &mut FieldStore) -> Result<StepOutcome, StoreError>;
}
