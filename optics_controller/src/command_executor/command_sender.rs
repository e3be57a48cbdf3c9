use utilities::command_executor::CommandSender;

use crate::models::{Command, CommandResponse, CommandResult};

#[derive(Clone)]
pub struct CameraCommandSender {
    sender: CommandSender<Command>,
}

impl CameraCommandSender {
    pub fn new(commands_ch: CommandSender<Command>) -> Self {
        Self {
            sender: commands_ch,
        }
    }

    pub async fn execute(&self, command: Command) -> CommandResult {
        self.sender.send_command(command).await
    }

    pub async fn is_available(&self) -> bool {
        matches!(
            self.execute(Command::Available).await,
            Ok(CommandResponse::Available(true))
        )
    }
}
