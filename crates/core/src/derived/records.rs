//! Wire records produced by the derived-data engine
//!
//! Field names are a compatibility contract with the existing client.

use serde::{Deserialize, Serialize};

use super::front::Join;

/// Row-major matrix as sent over the wire
pub type Matrix = Vec<Vec<f32>>;

/// The six mirrored, downsampled faces of the strand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sides {
    pub up: Matrix,
    pub left: Matrix,
    pub right: Matrix,
    pub front: Matrix,
    pub back: Matrix,
    pub down: Matrix,
}

/// Periodic temperature field snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub x_scale: usize,
    pub y_scale: usize,
    pub z_scale: usize,
    /// Logical position of the oldest slice in the window
    pub start: u64,
    /// Logical position one past the newest slice
    pub end: u64,
    /// Slices fill the whole machine
    pub is_full: bool,
    /// Tail casting in progress
    pub is_tail: bool,
    pub sides: Sides,
}

/// One full cross-section with its front thicknesses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceInfo {
    pub horizontal_solid_thickness: f32,
    pub vertical_solid_thickness: f32,
    pub horizontal_liquid_thickness: f32,
    pub vertical_liquid_thickness: f32,
    pub slice: Matrix,
    /// Field size at the time of the query
    pub length: usize,
}

/// Temperature along the casting direction at the centre and edge columns.
///
/// Each point is `[z_coordinate_mm, temperature]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerticalCurve {
    pub center_outer: Vec<[f32; 2]>,
    pub center_inner: Vec<[f32; 2]>,
    pub edge_outer: Vec<[f32; 2]>,
    pub edge_inner: Vec<[f32; 2]>,
}

/// Longitudinal temperature map at one lateral index with front tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalMap {
    /// Field size at the time of the query
    pub length: usize,
    pub vertical_slice: Matrix,
    /// Solidus front distance per z, in samples
    pub solid: Vec<f32>,
    /// Liquidus front distance per z, in samples
    pub liquid: Vec<f32>,
    pub solid_join: Join,
    pub liquid_join: Join,
}
