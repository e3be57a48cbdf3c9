use std::sync::mpsc::{Receiver, Sender};

use tokio::sync::oneshot;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Failed to send command")]
    Send,
    #[error("Failed to receive response")]
    Receive,
}

pub trait Command: Send {
    type Response: Send;
    type Error: Send + From<ExecutorError>;
    type Handler: DeviceHandler<Command = Self>;

    fn execute(self, handler: &mut Self::Handler) -> Result<Self::Response, Self::Error>;
}

pub trait DeviceHandler {
    type Command: Command<Handler = Self>;
}

type CommandResult<C> = Result<<C as Command>::Response, <C as Command>::Error>;

pub struct GenericCommand<C: Command> {
    command: C,
    response_ch: oneshot::Sender<CommandResult<C>>,
}

impl<C: Command> GenericCommand<C> {
    pub fn new(command: C, response_ch: oneshot::Sender<CommandResult<C>>) -> Self {
        Self {
            command,
            response_ch,
        }
    }

    /// Runs the command and hands the result back to the caller.
    pub fn execute(self, handler: &mut C::Handler) -> Result<(), ExecutorError> {
        let result = self.command.execute(handler);

        self.response_ch.send(result).map_err(|_| ExecutorError::Send)
    }
}

/// Owns a device handler and runs commands against it one at a time on a
/// blocking thread.
pub struct CommandExecutor<H: DeviceHandler + Send + 'static> {
    handler: H,
    commands_ch: Receiver<GenericCommand<H::Command>>,
    sender: Sender<GenericCommand<H::Command>>,
}

impl<H: DeviceHandler + Send> CommandExecutor<H> {
    pub fn new(handler: H) -> Self {
        let (sender, commands_ch) = std::sync::mpsc::channel();

        Self {
            handler,
            commands_ch,
            sender,
        }
    }

    pub fn sender(&self) -> CommandSender<H::Command> {
        CommandSender::new(self.sender.clone())
    }

    /// Runs until every sender has been dropped.
    pub fn run(mut self) {
        drop(self.sender);

        while let Ok(command) = self.commands_ch.recv() {
            if let Err(e) = command.execute(&mut self.handler) {
                tracing::warn!(error = %e, "Command response was not delivered");
            }
        }

        tracing::debug!("Command executor stopped");
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run())
    }
}

pub struct CommandSender<C: Command> {
    commands_ch: Sender<GenericCommand<C>>,
}

impl<C: Command> Clone for CommandSender<C> {
    fn clone(&self) -> Self {
        Self {
            commands_ch: self.commands_ch.clone(),
        }
    }
}

impl<C: Command> CommandSender<C> {
    pub fn new(commands_ch: Sender<GenericCommand<C>>) -> Self {
        Self { commands_ch }
    }

    pub async fn send_command(&self, command: C) -> Result<C::Response, C::Error> {
        let (response_ch, response_rx) = oneshot::channel();
        let command = GenericCommand::new(command, response_ch);

        self.commands_ch
            .send(command)
            .map_err(|_| C::Error::from(ExecutorError::Send))?;

        response_rx
            .await
            .map_err(|_| C::Error::from(ExecutorError::Receive))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: i32,
    }

    enum CounterCommand {
        Add(i32),
        Fail,
    }

    #[derive(Debug, thiserror::Error)]
    enum CounterError {
        #[error("counter failure")]
        Failed,
        #[error(transparent)]
        Executor(#[from] ExecutorError),
    }

    impl DeviceHandler for Counter {
        type Command = CounterCommand;
    }

    impl Command for CounterCommand {
        type Response = i32;
        type Error = CounterError;
        type Handler = Counter;

        fn execute(self, handler: &mut Counter) -> Result<i32, CounterError> {
            match self {
                CounterCommand::Add(n) => {
                    handler.value += n;
                    Ok(handler.value)
                }
                CounterCommand::Fail => Err(CounterError::Failed),
            }
        }
    }

    #[tokio::test]
    async fn commands_run_in_order_on_the_handler() {
        let executor = CommandExecutor::new(Counter { value: 0 });
        let sender = executor.sender();
        let handle = executor.spawn();

        assert_eq!(sender.send_command(CounterCommand::Add(2)).await.unwrap(), 2);
        assert_eq!(sender.send_command(CounterCommand::Add(5)).await.unwrap(), 7);
        assert!(matches!(
            sender.send_command(CounterCommand::Fail).await,
            Err(CounterError::Failed)
        ));

        drop(sender);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn sending_without_executor_fails() {
        let executor = CommandExecutor::new(Counter { value: 0 });
        let sender = executor.sender();
        drop(executor);

        assert!(matches!(
            sender.send_command(CounterCommand::Add(1)).await,
            Err(CounterError::Executor(ExecutorError::Send))
        ));
    }
}
