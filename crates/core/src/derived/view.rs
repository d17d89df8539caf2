//! Read-only derived views over the strand field

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use super::front::{front_distance, Crossing, JoinTracker};
use super::mirror::Subsample;
use super::records::{Matrix, Sides, SliceInfo, Snapshot, VerticalCurve, VerticalMap};
use crate::config::{Geometry, PhaseThresholds, ViewScale};
use crate::error::{QueryError, StoreError};
use crate::field::{FieldStore, Slice};

/// Default spacing, in slices, between vertical curve points
pub const DEFAULT_CURVE_STRIDE: usize = 5;

/// Derived-data engine bound to one field state.
///
/// Holds only borrows and copies of session constants; every method is a
/// pure function of the field contents at call time.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    field: &'a FieldStore,
    geometry: &'a Geometry,
    thresholds: PhaseThresholds,
    scale: ViewScale,
    curve_stride: usize,
}

impl<'a> FieldView<'a> {
    /// Create a view with default downsampling.
    pub fn new(field: &'a FieldStore, geometry: &'a Geometry, thresholds: PhaseThresholds) -> Self {
        Self {
            field,
            geometry,
            thresholds,
            scale: ViewScale::default(),
            curve_stride: DEFAULT_CURVE_STRIDE,
        }
    }

    /// Use `scale` for snapshot faces.
    pub fn with_scale(mut self, scale: ViewScale) -> Self {
        self.scale = scale.sanitized();
        self
    }

    /// Sample the vertical curve every `stride` slices.
    pub fn with_curve_stride(mut self, stride: usize) -> Self {
        self.curve_stride = stride.max(1);
        self
    }

    // =========================================================================
    // SNAPSHOT
    // =========================================================================

    /// Build the periodic six-face snapshot.
    ///
    /// Up is the newest slice, down the oldest. Front/back carry the wide-face
    /// surface row and left/right the narrow-face surface column of every
    /// `scale.z`-th slice, counted from the back.
    ///
    /// # Errors
    ///
    /// [`StoreError::Empty`] if the field holds no slice.
    pub fn build_snapshot(&self) -> Result<Snapshot, StoreError> {
        let started = Instant::now();
        let field = self.field;
        if field.is_empty() {
            return Err(StoreError::Empty);
        }

        let (rows, cols) = field.shape();
        let across_width = Subsample::new(rows, self.scale.y);
        let across_length = Subsample::new(cols, self.scale.x);

        let up = mirrored_face(field.slice(0)?, across_width, across_length);
        let down = mirrored_face(field.slice(field.size() - 1)?, across_width, across_length);

        let face_rows = field.capacity().div_ceil(self.scale.z);
        let mut front = vec![vec![0.0; across_length.mirrored_len()]; face_rows];
        let mut left = vec![vec![0.0; across_width.mirrored_len()]; face_rows];

        let sampled_z: Vec<usize> = (0..field.size()).rev().step_by(self.scale.z).collect();
        let lines = sampled_z
            .into_par_iter()
            .map(|z| -> Result<(usize, Vec<f32>, Vec<f32>), StoreError> {
                let slice = field.slice(z)?;
                let wide = (0..across_length.mirrored_len())
                    .map(|c| slice[(rows - 1, across_length.mirrored(c))])
                    .collect::<Vec<f32>>();
                let narrow = (0..across_width.mirrored_len())
                    .map(|r| slice[(across_width.mirrored(r), cols - 1)])
                    .collect::<Vec<f32>>();
                Ok((z / self.scale.z, wide, narrow))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (row, wide, narrow) in lines {
            front[row] = wide;
            left[row] = narrow;
        }

        let snapshot = Snapshot {
            x_scale: self.scale.x,
            y_scale: self.scale.y,
            z_scale: self.scale.z,
            start: field.start(),
            end: field.end(),
            is_full: field.is_full(),
            is_tail: field.is_tail(),
            sides: Sides {
                up,
                right: left.clone(),
                left,
                back: front.clone(),
                front,
                down,
            },
        };

        debug!("build snapshot cost: {:?}", started.elapsed());
        Ok(snapshot)
    }

    // =========================================================================
    // CROSS-SECTION
    // =========================================================================

    /// Full symmetric cross-section `z` with its four front thicknesses.
    ///
    /// Vertical fronts run along column 0 (wide face inward), horizontal fronts
    /// along row 0 (narrow face inward). Thicknesses are in millimetres and
    /// saturate at the half width/length.
    ///
    /// # Errors
    ///
    /// [`StoreError::OutOfRange`] unless `z < size()`.
    pub fn slice_info(&self, z: usize) -> Result<SliceInfo, StoreError> {
        let slice = self.field.slice(z)?;
        let (rows, cols) = self.field.shape();

        let vertical_line: Vec<f32> = slice.column(0).iter().copied().collect();
        let horizontal_line: Vec<f32> = slice.row(0).iter().copied().collect();

        let (vertical_solid, horizontal_solid) =
            self.coupled_fronts(&vertical_line, &horizontal_line, self.thresholds.solidus);
        let (vertical_liquid, horizontal_liquid) =
            self.coupled_fronts(&vertical_line, &horizontal_line, self.thresholds.liquidus);

        Ok(SliceInfo {
            horizontal_solid_thickness: horizontal_solid,
            vertical_solid_thickness: vertical_solid,
            horizontal_liquid_thickness: horizontal_liquid,
            vertical_liquid_thickness: vertical_liquid,
            slice: mirrored_face(slice, Subsample::new(rows, 1), Subsample::new(cols, 1)),
            length: self.field.size(),
        })
    }

    /// Fronts along both axes for one threshold.
    ///
    /// A vertical front saturated at the half width means the section is
    /// through for this threshold, so the horizontal front is forced to the
    /// half length.
    fn coupled_fronts(&self, vertical_line: &[f32], horizontal_line: &[f32], threshold: f32) -> (f32, f32) {
        let half_width = self.geometry.width as f32;
        let half_length = self.geometry.length as f32;

        let vertical = front_distance(vertical_line, self.geometry.y_step as f32, threshold, half_width);

        let horizontal = match Crossing::locate(horizontal_line, threshold) {
            Crossing::Surface => 0.0,
            _ if vertical >= half_width => half_length,
            crossing => crossing.distance(
                horizontal_line,
                self.geometry.x_step as f32,
                threshold,
                half_length,
            ),
        };

        (vertical, horizontal)
    }

    // =========================================================================
    // LONGITUDINAL
    // =========================================================================

    /// Centre and edge temperature curves along the casting direction.
    pub fn vertical_curve(&self) -> VerticalCurve {
        let (rows, cols) = self.field.shape();
        let z_step = self.geometry.z_step as f32;
        let stride = self.curve_stride;
        let center = 0;
        let edge = cols - 1;

        let mut curve = VerticalCurve::default();
        for (z, slice) in self.field.iter().enumerate() {
            if (z + 1) % stride != 0 {
                continue;
            }
            let position = (z + 1) as f32 * z_step;
            curve.center_outer.push([position, slice[(rows - 1, center)]]);
            curve.center_inner.push([position, slice[(0, center)]]);
            curve.edge_outer.push([position, slice[(rows - 1, edge)]]);
            curve.edge_inner.push([position, slice[(0, edge)]]);
        }
        curve
    }

    /// Longitudinal map at lateral `index` (0 = narrow-face surface column).
    ///
    /// Every `z_scale`-th slice contributes one mirrored row. Front distances
    /// are computed for every slice in samples, saturating at the row count.
    ///
    /// # Errors
    ///
    /// [`QueryError::IndexOutOfRange`] unless `index < cols`,
    /// [`QueryError::ZeroScale`] if `z_scale == 0`.
    pub fn vertical_map(&self, index: usize, z_scale: usize) -> Result<VerticalMap, QueryError> {
        let (rows, cols) = self.field.shape();
        if index >= cols {
            return Err(QueryError::IndexOutOfRange { index, limit: cols });
        }
        if z_scale == 0 {
            return Err(QueryError::ZeroScale);
        }

        let size = self.field.size();
        let col = cols - 1 - index;
        let across_width = Subsample::new(rows, 1);
        let saturation = rows as f32;

        let mut vertical_slice: Matrix = Vec::with_capacity(size / z_scale);
        let mut solid = vec![0.0; size];
        let mut liquid = vec![0.0; size];
        let mut solid_join = JoinTracker::default();
        let mut liquid_join = JoinTracker::default();

        self.field.traverse(0..size, |z, slice| {
            if (z + 1) % z_scale == 0 {
                vertical_slice.push(
                    (0..across_width.mirrored_len())
                        .map(|r| slice[(across_width.mirrored(r), col)])
                        .collect(),
                );
            }

            let line: Vec<f32> = slice.column(col).iter().copied().collect();
            solid[z] = front_distance(&line, 1.0, self.thresholds.solidus, saturation);
            solid_join.observe(z, &mut solid[z], saturation);
            liquid[z] = front_distance(&line, 1.0, self.thresholds.liquidus, saturation);
            liquid_join.observe(z, &mut liquid[z], saturation);
        })?;

        Ok(VerticalMap {
            length: size,
            vertical_slice,
            solid,
            liquid,
            solid_join: solid_join.join(),
            liquid_join: liquid_join.join(),
        })
    }
}

/// Rebuild a full face from a quadrant, keeping the samples picked by the subsamplers.
fn mirrored_face(slice: &Slice, across_width: Subsample, across_length: Subsample) -> Matrix {
    (0..across_width.mirrored_len())
        .map(|r| {
            let row = across_width.mirrored(r);
            (0..across_length.mirrored_len())
                .map(|c| slice[(row, across_length.mirrored(c))])
                .collect()
        })
        .collect()
}
