//! Session state machine

use std::fmt;

use crate::command::Command;
use crate::error::SessionError;

/// Lifecycle phase of a session.
///
/// Tail mode is orthogonal and lives on the field store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// No field or stepper attached
    #[default]
    Idle,
    /// Geometry, steel and cooling parameters set
    Configured,
    /// Stepper and periodic push active
    Running,
    /// Push halted, field retained
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Configured => "configured",
            Phase::Running => "running",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

impl Phase {
    /// True once `env` has been applied
    pub fn is_configured(self) -> bool {
        self != Phase::Idle
    }

    /// Whether `command` may run in this phase.
    pub fn admits(self, command: &Command) -> bool {
        match command {
            Command::SelectCaster(_) => true,
            Command::Env(_) => matches!(self, Phase::Idle | Phase::Configured),
            Command::Start => matches!(self, Phase::Configured | Phase::Stopped),
            Command::Stop => self == Phase::Running,
            Command::Tail => matches!(self, Phase::Running | Phase::Stopped),
            Command::ChangeInitialTemp(_)
            | Command::ChangeNarrowSurface(_)
            | Command::ChangeWideSurface(_)
            | Command::ChangeV(_)
            | Command::GenerateSlice(_)
            | Command::GenerateVerticalSlice1
            | Command::GenerateVerticalSlice2(_) => self.is_configured(),
        }
    }

    /// Reject `command` with a configuration error unless this phase admits it.
    pub fn check(self, command: &Command) -> Result<(), SessionError> {
        if self.admits(command) {
            Ok(())
        } else {
            Err(SessionError::Configuration {
                command: command.name(),
                phase: self,
            })
        }
    }
}
