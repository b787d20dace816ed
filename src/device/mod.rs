// Device module - the screen and input collaborators driven by the control loop.
// Real OS capture/input backends live outside this crate; the replay source and
// dry-run actuator below are enough to run, probe and calibrate a bot offline.

pub mod dry_run;
pub mod error;
pub mod replay;
pub mod types;

// Re-export the main types for easy access
pub use dry_run::DryRunActuator;
pub use error::{DeviceError, DeviceResult};
pub use replay::ImageDirSource;
pub use types::{CaptureRegion, Frame, FrameSource, InputActuator, MouseButton};
