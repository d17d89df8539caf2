//! Steel grade phase temperature lookup

use rustc_hash::FxHashMap;

use crate::config::PhaseThresholds;

/// Resolves a steel grade identifier to its phase temperatures.
pub trait SteelCatalog: Send + Sync {
    /// Thresholds for `steel_value`, or `None` for an unknown grade.
    fn thresholds(&self, steel_value: i32) -> Option<PhaseThresholds>;
}

/// In-memory catalog keyed by grade identifier.
#[derive(Debug, Clone, Default)]
pub struct StaticSteelCatalog {
    grades: FxHashMap<i32, PhaseThresholds>,
}

impl StaticSteelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a grade.
    pub fn with_grade(mut self, steel_value: i32, solidus: f32, liquidus: f32) -> Self {
        self.insert(steel_value, PhaseThresholds::new(solidus, liquidus));
        self
    }

    pub fn insert(&mut self, steel_value: i32, thresholds: PhaseThresholds) {
        self.grades.insert(steel_value, thresholds);
    }

    pub fn len(&self) -> usize {
        self.grades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }
}

impl SteelCatalog for StaticSteelCatalog {
    fn thresholds(&self, steel_value: i32) -> Option<PhaseThresholds> {
        self.grades.get(&steel_value).copied()
    }
}
