// Core device types and traits
use super::error::DeviceResult;
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen rectangle the frame source captures, in desktop coordinates.
///
/// Resolved once at startup. Its origin is added to every match location so
/// that coordinates handed to the input actuator are absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureRegion {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        }
    }
}

impl CaptureRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Absolute center of the captured area
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Translate a point relative to the region into desktop coordinates
    pub fn to_absolute(&self, x: i32, y: i32) -> (i32, i32) {
        (self.x + x, self.y + y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        };
        f.write_str(name)
    }
}

/// One captured image of the monitored region.
///
/// The grayscale plane is derived once at capture time; every template
/// lookup of the iteration reuses it.
#[derive(Debug, Clone)]
pub struct Frame {
    rgb: RgbImage,
    gray: GrayImage,
    index: u64,
}

impl Frame {
    pub fn new(rgb: RgbImage) -> Self {
        let gray = image::imageops::grayscale(&rgb);
        Self { rgb, gray, index: 0 }
    }

    pub fn with_index(mut self, index: u64) -> Self {
        self.index = index;
        self
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// Sequential capture number (per frame source)
    pub fn index(&self) -> u64 {
        self.index
    }
}

/// Anything that can grab the current screen contents.
pub trait FrameSource: Send {
    fn capture(&mut self, region: &CaptureRegion) -> DeviceResult<Frame>;
}

/// Synthetic keyboard/mouse primitives.
///
/// Implementations apply their own small settle delay after each action.
pub trait InputActuator: Send {
    fn press(&mut self, key: &str) -> DeviceResult<()>;
    fn click(&mut self, button: MouseButton, count: u32, interval_secs: f64) -> DeviceResult<()>;
    fn click_at(&mut self, x: i32, y: i32, button: MouseButton) -> DeviceResult<()>;
    fn move_to(&mut self, x: i32, y: i32) -> DeviceResult<()>;
    fn mouse_down(&mut self, button: MouseButton) -> DeviceResult<()>;
    fn mouse_up(&mut self, button: MouseButton) -> DeviceResult<()>;
    fn key_down(&mut self, key: &str) -> DeviceResult<()>;
    fn key_up(&mut self, key: &str) -> DeviceResult<()>;
    /// Let go of every held key and button.
    fn release_all(&mut self) -> DeviceResult<()>;
}
