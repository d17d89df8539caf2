//! Session configuration values
//!
//! Everything here is built once when a session is configured and then passed
//! by reference. Nothing in this module is mutated after construction except
//! [`CastingParameters`], which the hub replaces wholesale on each command.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

fn default_x_step() -> usize {
    2
}

fn default_y_step() -> usize {
    2
}

fn default_z_step() -> usize {
    10
}

/// Strand coordinates as sent by the client (full dimensions, millimetres).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Full cross-section length (wide face), mm
    pub length: usize,
    /// Full cross-section width (narrow face), mm
    pub width: usize,
    /// Strand length along the casting direction, mm
    pub z_length: usize,
    /// Sample spacing along the length axis, mm
    #[serde(default = "default_x_step")]
    pub x_step: usize,
    /// Sample spacing along the width axis, mm
    #[serde(default = "default_y_step")]
    pub y_step: usize,
    /// Slice spacing along the casting direction, mm
    #[serde(default = "default_z_step")]
    pub z_step: usize,
}

/// Validated strand geometry for one session.
///
/// Stores the *half* cross-section because slices only hold one symmetric
/// quadrant. Row index runs along the width axis, column index along the
/// length axis; index 0 is the centre line, the last index is the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Half cross-section length, mm
    pub length: usize,
    /// Half cross-section width, mm
    pub width: usize,
    /// Strand length, mm
    pub z_length: usize,
    /// Sample spacing along length, mm
    pub x_step: usize,
    /// Sample spacing along width, mm
    pub y_step: usize,
    /// Slice spacing along the casting direction, mm
    pub z_step: usize,
}

impl Geometry {
    /// Build geometry from client coordinates, halving the cross-section.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if a step is zero or an axis holds no sample.
    pub fn from_coordinate(coordinate: &Coordinate) -> Result<Self, GeometryError> {
        Self::new(
            coordinate.length / 2,
            coordinate.width / 2,
            coordinate.z_length,
            coordinate.x_step,
            coordinate.y_step,
            coordinate.z_step,
        )
    }

    /// Build geometry from half dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if a step is zero or an axis holds no sample.
    pub fn new(
        length: usize,
        width: usize,
        z_length: usize,
        x_step: usize,
        y_step: usize,
        z_step: usize,
    ) -> Result<Self, GeometryError> {
        for (name, step) in [("x_step", x_step), ("y_step", y_step), ("z_step", z_step)] {
            if step == 0 {
                return Err(GeometryError::ZeroStep(name));
            }
        }
        for (axis, value, step) in [
            ("length", length, x_step),
            ("width", width, y_step),
            ("z_length", z_length, z_step),
        ] {
            if value / step == 0 {
                return Err(GeometryError::NoSamples { axis, value, step });
            }
        }

        Ok(Self {
            length,
            width,
            z_length,
            x_step,
            y_step,
            z_step,
        })
    }

    /// Slice rows (samples across the half width)
    pub fn rows(&self) -> usize {
        self.width / self.y_step
    }

    /// Slice columns (samples across the half length)
    pub fn cols(&self) -> usize {
        self.length / self.x_step
    }

    /// Field capacity in slices
    pub fn capacity(&self) -> usize {
        self.z_length / self.z_step
    }
}

/// Downsampling factors applied to snapshot faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewScale {
    /// Keep every `x`-th column
    pub x: usize,
    /// Keep every `y`-th row
    pub y: usize,
    /// Keep every `z`-th slice
    pub z: usize,
}

impl Default for ViewScale {
    fn default() -> Self {
        Self { x: 2, y: 1, z: 2 }
    }
}

impl ViewScale {
    /// Replace zero factors with 1 so downsampling never divides by zero.
    pub fn sanitized(self) -> Self {
        Self {
            x: self.x.max(1),
            y: self.y.max(1),
            z: self.z.max(1),
        }
    }
}

/// Solidus and liquidus temperatures of the cast steel grade (°C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    /// Below this the steel is fully solid
    pub solidus: f32,
    /// Above this the steel is fully liquid
    pub liquidus: f32,
}

impl PhaseThresholds {
    /// Create thresholds, ordering them so `solidus <= liquidus`.
    pub fn new(solidus: f32, liquidus: f32) -> Self {
        Self {
            solidus: solidus.min(liquidus),
            liquidus: solidus.max(liquidus),
        }
    }
}

/// Mould cooling water flow for one face pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterFlow {
    /// Inlet water temperature
    #[serde(rename = "in")]
    pub inlet: f32,
    /// Outlet water temperature
    #[serde(rename = "out")]
    pub outlet: f32,
}

/// Operating parameters read by the stepper at every step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CastingParameters {
    /// Pouring temperature of new slices, °C
    pub start_temperature: f32,
    /// Casting speed, m/min
    pub drag_speed: f32,
    /// Narrow face mould water
    pub narrow_surface: WaterFlow,
    /// Wide face mould water
    pub wide_surface: WaterFlow,
    /// Steel grade identifier
    pub steel_value: i32,
}

impl Default for CastingParameters {
    fn default() -> Self {
        Self {
            start_temperature: 1550.0,
            drag_speed: 1.2,
            narrow_surface: WaterFlow {
                inlet: 30.0,
                outlet: 38.0,
            },
            wide_surface: WaterFlow {
                inlet: 30.0,
                outlet: 38.0,
            },
            steel_value: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_halves_cross_section() {
        let coordinate = Coordinate {
            length: 420,
            width: 250,
            z_length: 4000,
            x_step: 10,
            y_step: 10,
            z_step: 20,
        };
        let geometry = Geometry::from_coordinate(&coordinate).unwrap();

        assert_eq!(geometry.length, 210);
        assert_eq!(geometry.width, 125);
        assert_eq!(geometry.cols(), 21);
        assert_eq!(geometry.rows(), 12);
        assert_eq!(geometry.capacity(), 200);
    }

    #[test]
    fn test_geometry_rejects_zero_step() {
        let err = Geometry::new(100, 100, 100, 0, 1, 1).unwrap_err();
        assert_eq!(err, GeometryError::ZeroStep("x_step"));
    }

    #[test]
    fn test_geometry_rejects_empty_axis() {
        let err = Geometry::new(100, 1, 100, 1, 2, 1).unwrap_err();
        assert!(matches!(err, GeometryError::NoSamples { axis: "width", .. }));
    }

    #[test]
    fn test_thresholds_are_ordered() {
        let t = PhaseThresholds::new(1520.0, 1460.0);
        assert_eq!(t.solidus, 1460.0);
        assert_eq!(t.liquidus, 1520.0);
    }

    #[test]
    fn test_water_flow_uses_wire_names() {
        let flow: WaterFlow = serde_json::from_str(r#"{"in": 25.0, "out": 31.5}"#).unwrap();
        assert_eq!(flow.inlet, 25.0);
        assert_eq!(flow.outlet, 31.5);
    }
}
