//! Hub configuration

use std::path::PathBuf;

use caster_sim_core::derived::DEFAULT_CURVE_STRIDE;
use caster_sim_core::ViewScale;
use serde::{Deserialize, Serialize};

/// When a `tail` command takes effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailPolicy {
    /// Set the tail flag as soon as the command is handled
    Immediate,
    /// Let the stepper pick it up at the start of its next step
    #[default]
    NextStep,
}

/// Per-session settings for the [`Hub`](crate::Hub).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Bound of the inbound command queue
    pub queue_capacity: usize,
    /// Directory holding `<caster>.json` descriptions
    pub caster_home: PathBuf,
    pub tail_policy: TailPolicy,
    /// Consecutive transport write failures tolerated before the session ends
    pub max_transport_failures: u32,
    /// Snapshot face downsampling
    pub view_scale: ViewScale,
    /// Emit every n-th slice in longitudinal curves
    pub curve_stride: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            caster_home: PathBuf::from("casters"),
            tail_policy: TailPolicy::default(),
            max_transport_failures: 3,
            view_scale: ViewScale::default(),
            curve_stride: DEFAULT_CURVE_STRIDE,
        }
    }
}

impl HubConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns the decode error if `text` is not a valid configuration object.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_caster_home(mut self, dir: impl Into<PathBuf>) -> Self {
        self.caster_home = dir.into();
        self
    }

    pub fn with_tail_policy(mut self, policy: TailPolicy) -> Self {
        self.tail_policy = policy;
        self
    }

    pub fn with_view_scale(mut self, scale: ViewScale) -> Self {
        self.view_scale = scale;
        self
    }

    pub fn with_max_transport_failures(mut self, failures: u32) -> Self {
        self.max_transport_failures = failures;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = HubConfig::from_json(r#"{"tail_policy": "immediate", "curve_stride": 3}"#).unwrap();
        assert_eq!(config.tail_policy, TailPolicy::Immediate);
        assert_eq!(config.curve_stride, 3);
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.max_transport_failures, 3);
        assert_eq!(config.view_scale, ViewScale::default());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(HubConfig::from_json(r#"{"tail_policy": "later"}"#).is_err());
    }
}
