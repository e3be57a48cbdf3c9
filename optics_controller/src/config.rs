use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use utilities::session::SessionConfig;

const DEFAULT_CONFIG_PATH: &str = "default_config.toml";

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ControllerConfig {
    pub socket_path: String,
    pub camera: SessionConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/optics_controller.sock".to_string(),
            camera: SessionConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// `CONFIG_PATH` if set, otherwise `default_config.toml` in the working
/// directory.
pub fn config_path() -> PathBuf {
    std::env::var_os("CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl ControllerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: ControllerConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;

        Ok(config)
    }

    /// Loads `path`, writing the defaults there first when it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }

        tracing::info!(path = %path.display(), "Writing default configuration");
        let config = Self::default();
        config.save(path)?;

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(write_error)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.host.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "camera.host must not be empty".to_string(),
            ));
        }

        if self.socket_path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "socket_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
