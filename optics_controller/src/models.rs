use std::fmt;

use optics::{IrCutFilterState, OpticsControlError, RelativeStep};
use ptz::{PtzError, PtzPosition};
use serde_json::Value;
use utilities::command_executor::ExecutorError;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Available,
    GetOptics,
    GetCapabilities,
    Focus {
        optics_id: String,
        position: f64,
    },
    RelativeFocus {
        optics_id: String,
        step: RelativeStep,
    },
    Magnification {
        optics_id: String,
        magnification: f64,
    },
    RelativeMagnification {
        optics_id: String,
        step: RelativeStep,
    },
    Calibrate {
        optics_id: String,
        zoom: bool,
        focus: bool,
    },
    Reset {
        optics_id: String,
        zoom: bool,
        focus: bool,
    },
    FocusWindow {
        optics_id: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Autofocus {
        optics_id: String,
    },
    TemperatureCompensation {
        optics_id: String,
        enabled: bool,
    },
    IrCutFilter {
        optics_id: String,
        state: IrCutFilterState,
    },
    IrCompensation {
        optics_id: String,
        enabled: bool,
    },
    PtzPosition,
    PtzHome {
        speed: i32,
    },
    PtzStop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    Success,
    Available(bool),
    Body(Value),
    Position(PtzPosition),
}

impl fmt::Display for CommandResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResponse::Success => write!(f, "OK"),
            CommandResponse::Available(available) => write!(f, "{}", available),
            CommandResponse::Body(body) => write!(f, "OK:{}", body),
            CommandResponse::Position(p) => write!(f, "OK:{}:{}:{}", p.pan, p.tilt, p.zoom),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandError {
    pub code: Option<i64>,
    pub message: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "Error: {} ({})", self.message, code),
            None => write!(f, "Error: {}", self.message),
        }
    }
}

impl From<OpticsControlError> for CommandError {
    fn from(error: OpticsControlError) -> Self {
        CommandError {
            code: error.code,
            message: error.message,
        }
    }
}

impl From<PtzError> for CommandError {
    fn from(error: PtzError) -> Self {
        let code = match &error {
            PtzError::Transport(e) => e.code(),
            PtzError::InvalidPosition(_) => None,
        };

        CommandError {
            code,
            message: error.to_string(),
        }
    }
}

impl From<ExecutorError> for CommandError {
    fn from(error: ExecutorError) -> Self {
        CommandError {
            code: None,
            message: error.to_string(),
        }
    }
}

pub type CommandResult = Result<CommandResponse, CommandError>;
