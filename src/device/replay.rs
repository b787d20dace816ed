//! Frame source that replays saved screenshots from a directory

use super::error::{DeviceError, DeviceResult};
use super::types::{CaptureRegion, Frame, FrameSource};
use std::path::{Path, PathBuf};

const SCREENSHOT_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Cycles through the screenshots of a directory in file-name order.
///
/// A screenshot that covers the whole desktop is cropped to the capture
/// region; one that is already region-sized is used as is.
pub struct ImageDirSource {
    paths: Vec<PathBuf>,
    next: usize,
    captured: u64,
}

impl ImageDirSource {
    pub fn open(directory: &Path) -> DeviceResult<Self> {
        let entries = std::fs::read_dir(directory).map_err(|source| DeviceError::Io {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_screenshot(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(DeviceError::NoFrames {
                path: directory.to_path_buf(),
            });
        }

        log::info!(
            "📂 Replaying {} screenshots from {}",
            paths.len(),
            directory.display()
        );
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            next: 0,
            captured: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn is_screenshot(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SCREENSHOT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn capture(&mut self, region: &CaptureRegion) -> DeviceResult<Frame> {
        let Some(path) = self.paths.get(self.next).cloned() else {
            return Err(DeviceError::CaptureFailed {
                description: "replay source has no screenshots".to_string(),
            });
        };
        self.next = (self.next + 1) % self.paths.len();

        let image = image::open(&path).map_err(|source| DeviceError::ImageDecode {
            path: path.clone(),
            source,
        })?;
        let rgb = image.to_rgb8();

        let covers_region = region.x >= 0
            && region.y >= 0
            && region.x as u32 + region.width <= rgb.width()
            && region.y as u32 + region.height <= rgb.height();
        let is_region_sized = rgb.width() == region.width && rgb.height() == region.height;

        let rgb = if covers_region && !is_region_sized {
            image::imageops::crop_imm(
                &rgb,
                region.x as u32,
                region.y as u32,
                region.width,
                region.height,
            )
            .to_image()
        } else {
            rgb
        };

        self.captured += 1;
        log::debug!(
            "📸 Replayed {} ({}x{}) as frame #{}",
            path.display(),
            rgb.width(),
            rgb.height(),
            self.captured
        );
        Ok(Frame::new(rgb).with_index(self.captured))
    }
}
