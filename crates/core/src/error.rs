//! Error types for the field store and geometry configuration

use thiserror::Error;

/// Errors raised by [`FieldStore`](crate::field::FieldStore) operations.
///
/// Any of these coming out of a stepper means the field can no longer be
/// trusted; the session treats them as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Remove or read on a store holding no slices.
    #[error("field store is empty")]
    Empty,

    /// Insert at capacity while back-eviction is suppressed (tail mode).
    #[error("field store is full ({capacity} slices) and eviction is suppressed")]
    Full {
        /// Store capacity in slices
        capacity: usize,
    },

    /// Slice index outside the live window.
    #[error("slice index {z} out of range for field of size {size}")]
    OutOfRange {
        /// Requested front-relative index
        z: usize,
        /// Current number of stored slices
        size: usize,
    },

    /// Row/column outside the slice shape.
    #[error("cell ({row}, {col}) out of range for {rows}x{cols} slice")]
    CellOutOfRange {
        /// Requested row
        row: usize,
        /// Requested column
        col: usize,
        /// Slice rows
        rows: usize,
        /// Slice columns
        cols: usize,
    },

    /// Inserted slice does not have the session's slice shape.
    #[error("slice shape {got_rows}x{got_cols} does not match field shape {rows}x{cols}")]
    ShapeMismatch {
        /// Expected rows
        rows: usize,
        /// Expected columns
        cols: usize,
        /// Rows of the rejected slice
        got_rows: usize,
        /// Columns of the rejected slice
        got_cols: usize,
    },

    /// Cursor or live count outside the backing array.
    #[error("field store bookkeeping is inconsistent: front={front}, len={len}, capacity={capacity}")]
    Inconsistent {
        /// Physical index of the front slot
        front: usize,
        /// Live slice count
        len: usize,
        /// Backing array size
        capacity: usize,
    },
}

/// Errors raised while turning client coordinates into a [`Geometry`](crate::config::Geometry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// A step size was zero.
    #[error("step size '{0}' must be positive")]
    ZeroStep(&'static str),

    /// A dimension is too small to hold a single sample at its step.
    #[error("{axis} of {value}mm yields no samples at step {step}mm")]
    NoSamples {
        /// Axis name (`length`, `width`, `z_length`)
        axis: &'static str,
        /// Dimension value used for the axis
        value: usize,
        /// Step size along the axis
        step: usize,
    },
}

/// Errors raised by derived-data queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Lateral index outside the slice columns.
    #[error("lateral index {index} out of range [0, {limit})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Exclusive upper bound
        limit: usize,
    },

    /// Downsampling factor of zero.
    #[error("z scale must be a positive integer")]
    ZeroScale,

    /// Underlying store access failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
