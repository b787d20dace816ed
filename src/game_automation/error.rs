use super::types::StateId;
use crate::device::DeviceError;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for bot operations.
pub type BotResult<T> = Result<T, BotError>;

/// The error type for configuration, assets and the automation core.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {description}")]
    Config { description: String },

    #[error("Failed to load template '{name}' from {path:?}: {description}")]
    Template {
        name: String,
        path: PathBuf,
        description: String,
    },

    #[error("Mask for template '{name}' is {mask_width}x{mask_height}, expected {width}x{height}")]
    MaskSizeMismatch {
        name: String,
        width: u32,
        height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    #[error("Attempted to switch to unknown state: {0}")]
    UnknownState(StateId),

    #[error("Unknown bot type '{name}'. Available: {available}")]
    UnknownBot { name: String, available: String },

    #[error("Failed to write overlay {path:?}: {source}")]
    Overlay {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Hotkey registration failed: {description}")]
    Hotkeys { description: String },

    #[error("Control loop task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl BotError {
    pub fn config(description: impl Into<String>) -> Self {
        BotError::Config {
            description: description.into(),
        }
    }
}
