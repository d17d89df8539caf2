//! Lumped surface-cooling stepper
//!
//! A lightweight stand-in for the finite-difference solver: explicit 2D
//! conduction inside each quadrant with a symmetry condition on the centre
//! lines and a relaxation towards the mould water temperature at the surfaces.
//! Good enough to drive a session end to end, not a metallurgical model.

use tracing::debug;

use super::{SliceStepper, StepOutcome};
use crate::config::{CastingParameters, Geometry};
use crate::error::StoreError;
use crate::field::{FieldStore, Slice};

/// Explicit scheme stability limit for `rx + ry`
const STABILITY_LIMIT: f32 = 0.45;

/// Explicit conduction stepper with lumped surface cooling
#[derive(Debug, Clone)]
pub struct LumpedCoolingStepper {
    /// Thermal diffusivity of the strand (m²/s)
    diffusivity: f32,
    /// Fraction of the surface-to-water difference removed per step (0-1)
    surface_coefficient: f32,
    /// Sample spacing along length, width, casting direction (m)
    dx: f32,
    dy: f32,
    dz: f32,
}

impl Default for LumpedCoolingStepper {
    /// Carbon steel near solidus, 1 mm grid
    fn default() -> Self {
        Self {
            diffusivity: 6.0e-6,
            surface_coefficient: 0.08,
            dx: 0.001,
            dy: 0.001,
            dz: 0.01,
        }
    }
}

impl LumpedCoolingStepper {
    /// Create a stepper with explicit material constants.
    ///
    /// # Arguments
    ///
    /// * `diffusivity` - Thermal diffusivity (m²/s)
    /// * `surface_coefficient` - Surface relaxation per step (clamped to 0-1)
    pub fn new(diffusivity: f32, surface_coefficient: f32) -> Self {
        Self {
            diffusivity: diffusivity.max(0.0),
            surface_coefficient: surface_coefficient.clamp(0.0, 1.0),
            ..Self::default()
        }
    }

    /// Residence time of one slice spacing at the current casting speed (s)
    fn step_time(&self, params: &CastingParameters) -> f32 {
        if params.drag_speed > 0.0 {
            self.dz / (params.drag_speed / 60.0)
        } else {
            0.0
        }
    }

    /// Diffusion numbers `(rx, ry)` scaled into the stable range.
    fn diffusion_numbers(&self, dt: f32) -> (f32, f32) {
        let rx = self.diffusivity * dt / (self.dx * self.dx);
        let ry = self.diffusivity * dt / (self.dy * self.dy);
        let total = rx + ry;
        if total > STABILITY_LIMIT {
            let scale = STABILITY_LIMIT / total;
            (rx * scale, ry * scale)
        } else {
            (rx, ry)
        }
    }
}

/// One explicit conduction update of a quadrant.
///
/// Row `rows-1` faces the wide-face water, column `cols-1` the narrow-face
/// water; row 0 and column 0 are symmetry lines.
fn cool_slice(slice: &mut Slice, rx: f32, ry: f32, h: f32, wide_water: f32, narrow_water: f32) {
    let previous = slice.clone();
    let (rows, cols) = previous.shape();

    for r in 0..rows {
        for c in 0..cols {
            let t = previous[(r, c)];
            let inner_r = if r > 0 { previous[(r - 1, c)] } else { t };
            let outer_r = if r + 1 < rows {
                previous[(r + 1, c)]
            } else {
                t + h * (wide_water - t)
            };
            let inner_c = if c > 0 { previous[(r, c - 1)] } else { t };
            let outer_c = if c + 1 < cols {
                previous[(r, c + 1)]
            } else {
                t + h * (narrow_water - t)
            };
            slice[(r, c)] =
                t + rx * (inner_c - 2.0 * t + outer_c) + ry * (inner_r - 2.0 * t + outer_r);
        }
    }
}

impl SliceStepper for LumpedCoolingStepper {
    fn configure(&mut self, geometry: &Geometry, params: &CastingParameters) {
        self.dx = geometry.x_step as f32 / 1000.0;
        self.dy = geometry.y_step as f32 / 1000.0;
        self.dz = geometry.z_step as f32 / 1000.0;
        debug!(
            "Cooling stepper configured: dx={:.4}m, dy={:.4}m, dz={:.4}m, dt={:.3}s",
            self.dx,
            self.dy,
            self.dz,
            self.step_time(params)
        );
    }

    fn step(&mut self, params: &CastingParameters, field: &mut FieldStore) -> Result<StepOutcome, StoreError> {
        let (rx, ry) = self.diffusion_numbers(self.step_time(params));
        let h = self.surface_coefficient;
        let wide_water = 0.5 * (params.wide_surface.inlet + params.wide_surface.outlet);
        let narrow_water = 0.5 * (params.narrow_surface.inlet + params.narrow_surface.outlet);

        field.par_for_each_mut(|_, slice| cool_slice(slice, rx, ry, h, wide_water, narrow_water));

        if field.is_tail() {
            if field.is_empty() {
                return Ok(StepOutcome::Exhausted);
            }
            field.remove_last()?;
            if field.is_empty() {
                return Ok(StepOutcome::Exhausted);
            }
            return Ok(StepOutcome::Advanced);
        }

        field.add_first_uniform(params.start_temperature)?;
        Ok(StepOutcome::Advanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Geometry, CastingParameters, LumpedCoolingStepper) {
        let geometry = Geometry::new(40, 30, 100, 10, 10, 10).unwrap();
        let params = CastingParameters::default();
        let mut stepper = LumpedCoolingStepper::default();
        stepper.configure(&geometry, &params);
        (geometry, params, stepper)
    }

    #[test]
    fn test_new_slice_enters_at_pouring_temperature() {
        let (geometry, params, mut stepper) = setup();
        let mut field = FieldStore::new(&geometry);

        for _ in 0..5 {
            assert_eq!(stepper.step(&params, &mut field).unwrap(), StepOutcome::Advanced);
        }

        assert_eq!(field.size(), 5);
        assert_eq!(field.get(0, 0, 0).unwrap(), params.start_temperature);
    }

    #[test]
    fn test_older_slices_are_cooler_at_surface() {
        let (geometry, params, mut stepper) = setup();
        let mut field = FieldStore::new(&geometry);
        for _ in 0..6 {
            stepper.step(&params, &mut field).unwrap();
        }
        let (rows, cols) = field.shape();

        let oldest = field.slice(field.size() - 1).unwrap();
        let surface = oldest[(rows - 1, cols - 1)];
        let centre = oldest[(0, 0)];
        assert!(surface < centre, "surface {surface} should be below centre {centre}");
        assert!(surface < field.get(1, rows - 1, cols - 1).unwrap());
    }

    #[test]
    fn test_tail_mode_drains_until_exhausted() {
        let (geometry, params, mut stepper) = setup();
        let mut field = FieldStore::new(&geometry);
        for _ in 0..3 {
            stepper.step(&params, &mut field).unwrap();
        }
        field.set_tail(true);

        assert_eq!(stepper.step(&params, &mut field).unwrap(), StepOutcome::Advanced);
        assert_eq!(stepper.step(&params, &mut field).unwrap(), StepOutcome::Advanced);
        assert_eq!(stepper.step(&params, &mut field).unwrap(), StepOutcome::Exhausted);
        assert!(field.is_empty());
        assert_eq!(stepper.step(&params, &mut field).unwrap(), StepOutcome::Exhausted);
    }

    #[test]
    fn test_diffusion_numbers_are_stable() {
        let stepper = LumpedCoolingStepper::new(1.0, 0.1);
        let (rx, ry) = stepper.diffusion_numbers(10.0);
        assert!(rx + ry <= STABILITY_LIMIT + 1e-6);
    }
}
