//! Match engine: region-limited template search with ring fallback

use super::{
    config::MatchConfig,
    correlation::{CorrelationPeak, best_match},
    region::{RegionTable, Roi, concentric_offsets},
    template::{Template, TemplateLibrary},
};
use crate::device::{CaptureRegion, Frame};

/// A template found on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Template center in absolute screen coordinates
    pub x: i32,
    pub y: i32,
    pub confidence: f32,
    /// Region that produced the match, in frame coordinates
    pub probe: Roi,
}

pub struct MatchEngine {
    library: TemplateLibrary,
    regions: RegionTable,
    config: MatchConfig,
    origin: CaptureRegion,
}

impl MatchEngine {
    pub fn new(
        library: TemplateLibrary,
        regions: RegionTable,
        config: MatchConfig,
        origin: CaptureRegion,
    ) -> Self {
        Self {
            library,
            regions,
            config,
            origin,
        }
    }

    /// Absolute center of `name` on screen, or `None`.
    ///
    /// With `search_radius > 0` a miss in the configured region is retried
    /// with the region shifted along square rings of growing radius; the
    /// first shift that clears the threshold wins.
    pub fn find(&self, frame: &Frame, name: &str, search_radius: u32) -> Option<(i32, i32)> {
        self.locate(frame, name, search_radius)
            .map(|found| (found.x, found.y))
    }

    /// Same search as [`find`](Self::find), keeping confidence and probe
    pub fn locate(&self, frame: &Frame, name: &str, search_radius: u32) -> Option<MatchResult> {
        let Some(template) = self.library.lookup(name) else {
            log::debug!("🔍 Template '{name}' not loaded");
            return None;
        };

        let base = match self.regions.resolve(name) {
            Some(roi) => roi,
            None => {
                // Whole frame covers every shift, nothing to fall back to
                return self.probe(frame, template, Roi::full_frame(frame.width(), frame.height()));
            }
        };

        if let Some(found) = self.probe(frame, template, base) {
            return Some(found);
        }

        if search_radius == 0 {
            return None;
        }

        let anchor = base.clamp_to(frame.width(), frame.height())?;
        concentric_offsets(search_radius)
            .find_map(|(dx, dy)| self.probe(frame, template, anchor.offset(dx, dy)))
    }

    /// Clamp, crop and correlate one region. `Some` only when the score
    /// clears the precision threshold.
    fn probe(&self, frame: &Frame, template: &Template, region: Roi) -> Option<MatchResult> {
        let area = region.clamp_to(frame.width(), frame.height())?;
        let peak = best_match(frame.gray(), area, template.image(), template.mask())?;
        let matched = self.config.is_match(peak.confidence);

        if self.config.should_report(peak.confidence) {
            log::info!(
                "🔍 {} at ({},{} {}x{}): confidence {:.3}, required {:.3} -> {}",
                template.name(),
                area.x,
                area.y,
                area.width,
                area.height,
                peak.confidence,
                self.config.precision,
                if matched { "MATCH" } else { "NO MATCH" }
            );
        }

        matched.then(|| self.to_screen(template, area, peak))
    }

    fn to_screen(&self, template: &Template, area: Roi, peak: CorrelationPeak) -> MatchResult {
        let (cx, cy) = template.center_offset();
        let (x, y) = self.origin.to_absolute(
            area.x + peak.x as i32 + cx,
            area.y + peak.y as i32 + cy,
        );
        MatchResult {
            x,
            y,
            confidence: peak.confidence,
            probe: area,
        }
    }

    /// Configured region for a template after alias resolution
    pub fn resolve_roi(&self, name: &str) -> Option<Roi> {
        self.regions.resolve(name)
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn capture_region(&self) -> CaptureRegion {
        self.origin
    }
}
