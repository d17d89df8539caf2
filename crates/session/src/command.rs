//! Typed session commands parsed from inbound messages

use caster_sim_core::WaterFlow;
use serde::de::DeserializeOwned;

use crate::error::SessionError;
use crate::protocol::{inbound, Env, Msg, VerticalRequest};

/// One client command, payload already decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SelectCaster(String),
    Env(Box<Env>),
    ChangeInitialTemp(f32),
    ChangeNarrowSurface(WaterFlow),
    ChangeWideSurface(WaterFlow),
    ChangeV(f32),
    Start,
    Stop,
    Tail,
    GenerateSlice(usize),
    GenerateVerticalSlice1,
    GenerateVerticalSlice2(VerticalRequest),
}

impl Command {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::SelectCaster(_) => inbound::SELECT_CASTER,
            Command::Env(_) => inbound::ENV,
            Command::ChangeInitialTemp(_) => inbound::CHANGE_INITIAL_TEMP,
            Command::ChangeNarrowSurface(_) => inbound::CHANGE_NARROW_SURFACE,
            Command::ChangeWideSurface(_) => inbound::CHANGE_WIDE_SURFACE,
            Command::ChangeV(_) => inbound::CHANGE_V,
            Command::Start => inbound::START,
            Command::Stop => inbound::STOP,
            Command::Tail => inbound::TAIL,
            Command::GenerateSlice(_) => inbound::GENERATE_SLICE,
            Command::GenerateVerticalSlice1 => inbound::GENERATE_VERTICAL_SLICE1,
            Command::GenerateVerticalSlice2(_) => inbound::GENERATE_VERTICAL_SLICE2,
        }
    }

    /// Decode an inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Validation`] for unknown types and malformed
    /// payloads. Range checks that depend on session state happen later.
    pub fn parse(msg: &Msg) -> Result<Self, SessionError> {
        let kind = msg.kind.as_str();
        let content = msg.content.trim();

        let command = match kind {
            inbound::SELECT_CASTER => Command::SelectCaster(caster_name(kind, content)?.to_string()),
            inbound::ENV => Command::Env(Box::new(json(kind, content)?)),
            inbound::CHANGE_INITIAL_TEMP => Command::ChangeInitialTemp(number(kind, content)?),
            inbound::CHANGE_NARROW_SURFACE => Command::ChangeNarrowSurface(json(kind, content)?),
            inbound::CHANGE_WIDE_SURFACE => Command::ChangeWideSurface(json(kind, content)?),
            inbound::CHANGE_V => {
                let speed = number(kind, content)?;
                if speed < 0.0 {
                    return Err(SessionError::validation(kind, "drag speed must not be negative"));
                }
                Command::ChangeV(speed)
            }
            inbound::START => Command::Start,
            inbound::STOP => Command::Stop,
            inbound::TAIL => Command::Tail,
            inbound::GENERATE_SLICE => {
                let index: i64 = content
                    .parse()
                    .map_err(|_| SessionError::validation(kind, format!("'{content}' is not a slice index")))?;
                let index = usize::try_from(index)
                    .map_err(|_| SessionError::validation(kind, format!("slice index {index} is negative")))?;
                Command::GenerateSlice(index)
            }
            inbound::GENERATE_VERTICAL_SLICE1 => Command::GenerateVerticalSlice1,
            inbound::GENERATE_VERTICAL_SLICE2 => Command::GenerateVerticalSlice2(json(kind, content)?),
            other => return Err(SessionError::validation(other, "unknown message type")),
        };
        Ok(command)
    }
}

fn json<T: DeserializeOwned>(kind: &str, content: &str) -> Result<T, SessionError> {
    serde_json::from_str(content).map_err(|e| SessionError::validation(kind, format!("malformed payload: {e}")))
}

fn number(kind: &str, content: &str) -> Result<f32, SessionError> {
    match content.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SessionError::validation(kind, format!("'{content}' is not a number"))),
    }
}

fn caster_name<'a>(kind: &str, content: &'a str) -> Result<&'a str, SessionError> {
    if content.is_empty() || content.contains(|c: char| c == '/' || c == '\\') || content.starts_with('.') {
        return Err(SessionError::validation(kind, format!("invalid caster name '{content}'")));
    }
    Ok(content)
}
