pub mod command_sender;

use optics::OpticsControl;
use ptz::PtzControl;
use utilities::{
    command_executor::{Command as ExecutorCommand, DeviceHandler},
    vapix::VapixTransport,
};

use crate::models::{Command, CommandError, CommandResponse, CommandResult};

/// Owns the camera transport. Lives on the executor thread, so all camera
/// requests are issued from there one after another.
pub struct CameraHandler {
    transport: Box<dyn VapixTransport + Send>,
}

impl DeviceHandler for CameraHandler {
    type Command = Command;
}

impl CameraHandler {
    pub fn new(transport: impl VapixTransport + Send + 'static) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    fn optics(&self) -> OpticsControl<'_, dyn VapixTransport + Send> {
        OpticsControl::new(self.transport.as_ref())
    }

    fn ptz(&self) -> PtzControl<'_, dyn VapixTransport + Send> {
        PtzControl::new(self.transport.as_ref())
    }
}

fn success<E: Into<CommandError>>(result: Result<(), E>) -> CommandResult {
    result
        .map(|_| CommandResponse::Success)
        .map_err(Into::into)
}

impl ExecutorCommand for Command {
    type Response = CommandResponse;
    type Error = CommandError;
    type Handler = CameraHandler;

    fn execute(self, handler: &mut CameraHandler) -> CommandResult {
        tracing::debug!(command = ?self, "Executing camera command");

        let optics = handler.optics();

        match self {
            Command::Available => Ok(CommandResponse::Available(optics.is_available())),
            Command::GetOptics => Ok(CommandResponse::Body(optics.get_optics()?)),
            Command::GetCapabilities => Ok(CommandResponse::Body(optics.get_capabilities()?)),
            Command::Focus {
                optics_id,
                position,
            } => success(optics.set_focus(optics_id, position)),
            Command::RelativeFocus { optics_id, step } => {
                success(optics.set_relative_focus(optics_id, step))
            }
            Command::Magnification {
                optics_id,
                magnification,
            } => success(optics.set_magnification(optics_id, magnification)),
            Command::RelativeMagnification { optics_id, step } => {
                success(optics.set_relative_magnification(optics_id, step))
            }
            Command::Calibrate {
                optics_id,
                zoom,
                focus,
            } => success(optics.calibrate(optics_id, zoom, focus)),
            Command::Reset {
                optics_id,
                zoom,
                focus,
            } => success(optics.reset(optics_id, zoom, focus)),
            Command::FocusWindow {
                optics_id,
                x,
                y,
                width,
                height,
            } => success(optics.set_focus_window(optics_id, x, y, width, height)),
            Command::Autofocus { optics_id } => success(optics.perform_autofocus(optics_id)),
            Command::TemperatureCompensation { optics_id, enabled } => {
                success(optics.set_temperature_compensation(optics_id, enabled))
            }
            Command::IrCutFilter { optics_id, state } => {
                success(optics.set_ir_cut_filter_state(optics_id, state))
            }
            Command::IrCompensation { optics_id, enabled } => {
                success(optics.set_ir_compensation(optics_id, enabled))
            }
            Command::PtzPosition => Ok(CommandResponse::Position(
                handler.ptz().get_current_position()?,
            )),
            Command::PtzHome { speed } => success(handler.ptz().go_home(speed)),
            Command::PtzStop => success(handler.ptz().stop_move()),
        }
    }
}
