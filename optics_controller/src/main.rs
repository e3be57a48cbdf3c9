use crate::{
    command_executor::{CameraHandler, command_sender::CameraCommandSender},
    communication::run_communication_layer,
    config::ControllerConfig,
};

use utilities::{command_executor::CommandExecutor, session::VapixSession};

pub mod command_executor;
pub mod commands;
pub mod communication;
pub mod config;
pub mod logging;
pub mod models;

fn should_create_config() -> bool {
    std::env::var("CREATE_CONFIG")
        .map(|val| val == "1" || val.to_lowercase() == "true")
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config_path = config::config_path();
    if should_create_config() {
        ControllerConfig::default().save(&config_path)?;
    }

    let config = ControllerConfig::load_or_create(&config_path).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Run with CREATE_CONFIG=1 to overwrite it with the defaults.");
        e
    })?;

    let session = VapixSession::new(config.camera.clone())?;
    tracing::info!(camera = %session.base_url(), "Using camera");

    let camera_executor = CommandExecutor::new(CameraHandler::new(session));
    let camera = CameraCommandSender::new(camera_executor.sender());
    camera_executor.spawn();

    if camera.is_available().await {
        tracing::info!("Optics control available");
    } else {
        tracing::warn!("Optics control not available, commands will likely fail");
    }

    run_communication_layer(&config.socket_path, camera).await
}
