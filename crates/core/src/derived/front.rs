//! Solidification front tracking by threshold interpolation
//!
//! A line of samples runs from the strand centre (index 0) to the surface
//! (index N-1). The front for a threshold `T` is found by scanning from the
//! surface inward for the first sample hotter than `T`:
//!
//! ```text
//! i == N-1          -> 0                      (surface already above T)
//! no sample > T     -> saturation             (fully below T on this line)
//! otherwise         -> s*(N-1-i) + s*(T - line[i+1]) / (line[i] - line[i+1])
//! ```

use serde::{Deserialize, Serialize};

/// Where a threshold crossing sits on a centre-to-surface line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// The surface sample already exceeds the threshold
    Surface,
    /// `line[i] > T` with `i` the outermost such sample
    Interior(usize),
    /// No sample exceeds the threshold
    Absent,
}

impl Crossing {
    /// Locate the outermost sample of `line` above `threshold`.
    pub fn locate(line: &[f32], threshold: f32) -> Self {
        match line.iter().rposition(|&t| t > threshold) {
            None => Crossing::Absent,
            Some(i) if i + 1 == line.len() => Crossing::Surface,
            Some(i) => Crossing::Interior(i),
        }
    }

    /// Distance from the surface for this crossing.
    ///
    /// # Arguments
    ///
    /// * `line` - The line the crossing was located on
    /// * `step` - Sample spacing
    /// * `threshold` - Phase temperature
    /// * `saturation` - Value returned when the threshold is not reached
    pub fn distance(self, line: &[f32], step: f32, threshold: f32, saturation: f32) -> f32 {
        match self {
            Crossing::Surface => 0.0,
            Crossing::Absent => saturation,
            Crossing::Interior(i) => {
                let n = line.len();
                let hot = line[i];
                let cold = line[i + 1];
                step * (n - 1 - i) as f32 + step * (threshold - cold) / (hot - cold)
            }
        }
    }
}

/// Saturating, interpolated front distance along one line.
///
/// An empty line is treated as never reaching the threshold.
pub fn front_distance(line: &[f32], step: f32, threshold: f32, saturation: f32) -> f32 {
    Crossing::locate(line, threshold).distance(line, step, threshold, saturation)
}

/// One-shot marker for where a front first reaches the strand centre.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    /// Whether the front has met the centre within the window
    pub is_join: bool,
    /// First z at which it did
    pub join_index: usize,
}

/// Records the first z at which a distance series saturates.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinTracker {
    join: Join,
}

impl JoinTracker {
    /// Observe the distance at `z`; clamps and records it on first saturation.
    pub fn observe(&mut self, z: usize, distance: &mut f32, saturation: f32) {
        if !self.join.is_join && *distance >= saturation {
            *distance = saturation;
            self.join = Join {
                is_join: true,
                join_index: z,
            };
        }
    }

    /// The recorded marker
    pub fn join(&self) -> Join {
        self.join
    }
}
