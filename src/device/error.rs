use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for capture and input operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// The error type for the frame source and the input actuator.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No screenshots found in {path:?}")]
    NoFrames { path: PathBuf },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode image {path:?}: {source}")]
    ImageDecode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Screen capture failed: {description}")]
    CaptureFailed { description: String },

    #[error("Input action '{action}' failed: {description}")]
    InputFailed { action: String, description: String },
}

impl DeviceError {
    pub fn input(action: impl Into<String>, description: impl Into<String>) -> Self {
        DeviceError::InputFailed {
            action: action.into(),
            description: description.into(),
        }
    }
}
