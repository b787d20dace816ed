// ROI visualizer.
// Runs as its own process (`--visualize`) so a slow overlay never stalls the
// bot. The bot process starts and kills it when the '9' hotkey flips the flag.
use crate::device::{CaptureRegion, Frame, FrameSource};
use crate::game_automation::{BotError, BotResult, ControlFlags, RegionTable};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

pub const OVERLAY_FILE: &str = "roi-overlay.png";

const REFRESH: Duration = Duration::from_secs(1);
const SUPERVISOR_POLL: Duration = Duration::from_millis(200);

const PALETTE: [Rgb<u8>; 6] = [
    Rgb([255, 64, 64]),
    Rgb([64, 255, 64]),
    Rgb([64, 160, 255]),
    Rgb([255, 220, 0]),
    Rgb([255, 0, 255]),
    Rgb([0, 255, 255]),
];

/// Copy of the frame with every resolvable ROI outlined. Regions that fall
/// completely outside the frame are skipped.
pub fn draw_overlay(frame: &Frame, regions: &RegionTable) -> RgbImage {
    let mut overlay = frame.rgb().clone();
    for (index, (name, roi)) in regions.resolved().into_iter().enumerate() {
        let Some(visible) = roi.clamp_to(frame.width(), frame.height()) else {
            log::debug!("🔲 ROI '{name}' is outside the frame");
            continue;
        };
        let color = PALETTE[index % PALETTE.len()];
        let rect = Rect::at(visible.x, visible.y).of_size(visible.width as u32, visible.height as u32);
        draw_hollow_rect_mut(&mut overlay, rect, color);
        // Two pixels wide
        if visible.width > 2 && visible.height > 2 {
            let inner = Rect::at(visible.x + 1, visible.y + 1)
                .of_size(visible.width as u32 - 2, visible.height as u32 - 2);
            draw_hollow_rect_mut(&mut overlay, inner, color);
        }
    }
    overlay
}

/// Capture one frame and write the overlay to `output`
pub fn render_once(
    source: &mut dyn FrameSource,
    region: &CaptureRegion,
    regions: &RegionTable,
    output: &Path,
) -> BotResult<()> {
    let frame = source.capture(region)?;
    draw_overlay(&frame, regions)
        .save(output)
        .map_err(|source| BotError::Overlay {
            path: output.to_path_buf(),
            source,
        })
}

/// Body of the `--visualize` process: refresh the overlay until killed
pub async fn run(
    mut source: Box<dyn FrameSource>,
    region: CaptureRegion,
    regions: RegionTable,
    output: PathBuf,
) -> BotResult<()> {
    log::info!(
        "🔲 ROI visualizer writing {} ({} regions)",
        output.display(),
        regions.len()
    );
    loop {
        if let Err(e) = render_once(source.as_mut(), &region, &regions, &output) {
            log::error!("❌ Overlay refresh failed: {e}");
        }
        tokio::time::sleep(REFRESH).await;
    }
}

/// Keeps a visualizer child process alive while the flag is set
pub struct Supervisor {
    flags: ControlFlags,
    program: PathBuf,
    args: Vec<String>,
    child: Option<Child>,
}

impl Supervisor {
    /// `args` are passed to `program` in addition to `--visualize`
    pub fn new(flags: ControlFlags, program: PathBuf, args: Vec<String>) -> Self {
        Self {
            flags,
            program,
            args,
            child: None,
        }
    }

    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                self.sync().await;
                tokio::time::sleep(SUPERVISOR_POLL).await;
            }
        })
    }

    /// Start or kill the child to match the flag; reap a child that exited
    pub async fn sync(&mut self) {
        if let Some(child) = self.child.as_mut()
            && let Ok(Some(status)) = child.try_wait()
        {
            log::warn!("⚠️ ROI visualizer exited: {status}");
            self.child = None;
            self.flags.set_visualizer(false);
        }

        let wanted = self.flags.visualizer_enabled();
        match (wanted, self.child.is_some()) {
            (true, false) => self.start(),
            (false, true) => self.terminate().await,
            _ => {}
        }
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    fn start(&mut self) {
        let spawned = Command::new(&self.program)
            .arg("--visualize")
            .args(&self.args)
            .kill_on_drop(true)
            .spawn();
        match spawned {
            Ok(child) => {
                log::info!("🔲 ROI visualizer started (pid {:?})", child.id());
                self.child = Some(child);
            }
            Err(e) => {
                log::error!("❌ Failed to start ROI visualizer: {e}");
                self.flags.set_visualizer(false);
            }
        }
    }

    pub async fn terminate(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                log::warn!("⚠️ Failed to stop ROI visualizer: {e}");
            } else {
                log::info!("🔲 ROI visualizer closed");
            }
        }
    }
}
