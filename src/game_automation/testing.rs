// Test doubles shared by the automation tests
use super::match_image::Template;
use crate::device::{
    CaptureRegion, DeviceError, DeviceResult, Frame, FrameSource, InputActuator, MouseButton,
};
use image::{Rgb, RgbImage};
use std::sync::{Arc, Mutex};

/// Deterministic per-pixel noise; every patch is distinct from its neighbours
pub fn noise_frame(width: u32, height: u32) -> Frame {
    Frame::new(RgbImage::from_fn(width, height, |x, y| {
        let mut z = ((x as u64) << 32 | y as u64).wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        let v = (z ^ (z >> 31)) as u8;
        Rgb([v, v, v])
    }))
}

/// Flat gray frame showing the noise pattern only inside `patches` (x, y, w, h)
pub fn scene(width: u32, height: u32, patches: &[(u32, u32, u32, u32)]) -> Frame {
    let noise = noise_frame(width, height);
    Frame::new(RgbImage::from_fn(width, height, |x, y| {
        let visible = patches
            .iter()
            .any(|&(px, py, w, h)| x >= px && x < px + w && y >= py && y < py + h);
        if visible {
            *noise.rgb().get_pixel(x, y)
        } else {
            Rgb([40, 40, 40])
        }
    }))
}

/// Template cut out of a frame's grayscale plane
pub fn crop_template(frame: &Frame, name: &str, x: u32, y: u32, width: u32, height: u32) -> Template {
    let gray = image::imageops::crop_imm(frame.gray(), x, y, width, height).to_image();
    Template::new(name, gray, None).unwrap()
}

/// Hands out queued frames, then repeats the fallback forever
pub struct ScriptedSource {
    failures: u32,
    queue: Vec<Frame>,
    fallback: Option<Frame>,
}

impl ScriptedSource {
    pub fn repeating(frame: Frame) -> Self {
        Self {
            failures: 0,
            queue: Vec::new(),
            fallback: Some(frame),
        }
    }

    pub fn failing_then(failures: u32, frame: Frame) -> Self {
        Self {
            failures,
            ..Self::repeating(frame)
        }
    }

    /// Frames returned once each, in order, before the fallback
    pub fn sequence(frames: Vec<Frame>, fallback: Frame) -> Self {
        let mut queue = frames;
        queue.reverse();
        Self {
            failures: 0,
            queue,
            fallback: Some(fallback),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn capture(&mut self, _region: &CaptureRegion) -> DeviceResult<Frame> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(DeviceError::CaptureFailed {
                description: "scripted failure".to_string(),
            });
        }
        if let Some(frame) = self.queue.pop() {
            return Ok(frame);
        }
        self.fallback.clone().ok_or_else(|| DeviceError::CaptureFailed {
            description: "no frames".to_string(),
        })
    }
}

/// Records every input primitive; clones share one journal
#[derive(Clone, Default)]
pub struct RecordingActuator {
    calls: Arc<Mutex<Vec<String>>>,
    fail_release: Arc<Mutex<bool>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_release(&self, fail: bool) {
        *self.fail_release.lock().unwrap() = fail;
    }

    fn record(&self, call: String) -> DeviceResult<()> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl InputActuator for RecordingActuator {
    fn press(&mut self, key: &str) -> DeviceResult<()> {
        self.record(format!("press {key}"))
    }

    fn click(&mut self, button: MouseButton, count: u32, _interval_secs: f64) -> DeviceResult<()> {
        self.record(format!("click {button} x{count}"))
    }

    fn click_at(&mut self, x: i32, y: i32, button: MouseButton) -> DeviceResult<()> {
        self.record(format!("click_at {x},{y} {button}"))
    }

    fn move_to(&mut self, x: i32, y: i32) -> DeviceResult<()> {
        self.record(format!("move_to {x},{y}"))
    }

    fn mouse_down(&mut self, button: MouseButton) -> DeviceResult<()> {
        self.record(format!("mouse_down {button}"))
    }

    fn mouse_up(&mut self, button: MouseButton) -> DeviceResult<()> {
        self.record(format!("mouse_up {button}"))
    }

    fn key_down(&mut self, key: &str) -> DeviceResult<()> {
        self.record(format!("key_down {key}"))
    }

    fn key_up(&mut self, key: &str) -> DeviceResult<()> {
        self.record(format!("key_up {key}"))
    }

    fn release_all(&mut self) -> DeviceResult<()> {
        self.record("release_all".to_string())?;
        if *self.fail_release.lock().unwrap() {
            return Err(DeviceError::input("release_all", "scripted failure"));
        }
        Ok(())
    }
}
