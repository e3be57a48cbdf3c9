use std::path::Path;

use anyhow::{Result, anyhow};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::UnixListener,
};

use crate::{
    command_executor::command_sender::CameraCommandSender, commands::parse_command,
};

/// Handles one request line and returns the reply line (without newline).
pub async fn handle_line(line: &str, sender: &CameraCommandSender) -> String {
    let Some(command) = parse_command(line) else {
        tracing::debug!(line, "Rejected malformed command");
        return "Error: Invalid command".to_string();
    };

    match sender.execute(command).await {
        Ok(response) => response.to_string(),
        Err(e) => {
            tracing::warn!(line, error = %e, "Camera command failed");
            e.to_string()
        }
    }
}

pub async fn serve_connection<S>(stream: S, sender: CameraCommandSender) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let mut reply = handle_line(&line, &sender).await;
        reply.push('\n');
        writer.write_all(reply.as_bytes()).await?;
    }

    Ok(())
}

pub async fn run_communication_layer(socket_path: &str, sender: CameraCommandSender) -> Result<()> {
    // Remove existing socket file if it exists to prevent "Address already in use" error
    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)
            .map_err(|e| anyhow!("Failed to remove existing socket file: {}", e))?;
    }

    let listener = UnixListener::bind(socket_path)
        .map_err(|e| anyhow!("Failed to bind to socket: {}", e))?;

    tracing::info!(socket_path, "Listening for commands");

    loop {
        let (socket, _) = listener
            .accept()
            .await
            .map_err(|e| anyhow!("Failed to accept connection: {}", e))?;

        let sender = sender.clone();

        tokio::spawn(async move {
            if let Err(e) = serve_connection(socket, sender).await {
                tracing::warn!(error = %e, "Connection closed with error");
            }
        });
    }
}
