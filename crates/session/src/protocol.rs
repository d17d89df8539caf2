//! Wire protocol: the message envelope and command payloads
//!
//! Every message in either direction is `{"type": ..., "content": ...}` where
//! `content` is itself a string, JSON-encoded when the payload is structured.

use caster_sim_core::{CastingParameters, Coordinate, WaterFlow};
use serde::{Deserialize, Serialize};

/// Message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Msg {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
}

impl Msg {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: content.into(),
        }
    }
}

/// Inbound message types.
pub mod inbound {
    pub const SELECT_CASTER: &str = "select_caster";
    pub const ENV: &str = "env";
    pub const CHANGE_INITIAL_TEMP: &str = "change_initial_temp";
    pub const CHANGE_NARROW_SURFACE: &str = "change_narrow_surface";
    pub const CHANGE_WIDE_SURFACE: &str = "change_wide_surface";
    pub const CHANGE_V: &str = "change_v";
    pub const START: &str = "start";
    pub const STOP: &str = "stop";
    pub const TAIL: &str = "tail";
    pub const GENERATE_SLICE: &str = "generate_slice";
    pub const GENERATE_VERTICAL_SLICE1: &str = "generate_vertical_slice1";
    pub const GENERATE_VERTICAL_SLICE2: &str = "generate_vertical_slice2";
}

/// Outbound message types.
pub mod reply {
    pub const CASTER_INFO: &str = "caster_info";
    pub const ENV_SET: &str = "env_set";
    pub const INITIAL_TEMP_SET: &str = "initial_temp_set";
    pub const NARROW_SURFACE_TEMP_SET: &str = "narrow_surface_temp_set";
    pub const WIDE_SURFACE_TEMP_SET: &str = "wide_surface_temp_set";
    pub const V_SET: &str = "v_set";
    pub const STARTED: &str = "started";
    pub const STOPPED: &str = "stopped";
    pub const TAIL_START: &str = "tail_start";
    pub const SLICE_GENERATED: &str = "slice_generated";
    pub const VERTICAL_SLICE1_GENERATED: &str = "vertical_slice1_generated";
    pub const VERTICAL_SLICE2_GENERATED: &str = "vertical_slice2_generated";
    pub const DATA_PUSH: &str = "data_push";
    pub const ERROR: &str = "error";
}

/// `command` tags for error replies raised by a run worker rather than by
/// a client message.
pub mod origin {
    pub const STEP: &str = "step";
    pub const PUSH: &str = "push";
}

fn default_start_temperature() -> f32 {
    CastingParameters::default().start_temperature
}

fn default_water_flow() -> WaterFlow {
    CastingParameters::default().wide_surface
}

/// Payload of the `env` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Env {
    pub coordinate: Coordinate,
    pub steel_value: i32,
    pub drag_speed: f32,
    #[serde(default = "default_start_temperature")]
    pub start_temperature: f32,
    #[serde(default = "default_water_flow")]
    pub narrow_surface: WaterFlow,
    #[serde(default = "default_water_flow")]
    pub wide_surface: WaterFlow,
}

impl Env {
    /// Casting parameters this environment starts the session with.
    pub fn casting_parameters(&self) -> CastingParameters {
        CastingParameters {
            start_temperature: self.start_temperature,
            drag_speed: self.drag_speed,
            narrow_surface: self.narrow_surface,
            wide_surface: self.wide_surface,
            steel_value: self.steel_value,
        }
    }
}

/// Payload of `generate_vertical_slice2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerticalRequest {
    /// Lateral index, counted from the narrow face inward
    pub index: usize,
    /// Keep every `z_scale`-th slice
    #[serde(alias = "zScale")]
    pub z_scale: usize,
}

/// Content of an `error` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    /// Error class (`configuration`, `validation`, ...)
    pub kind: String,
    /// Message type that caused it
    pub command: String,
    pub message: String,
}
