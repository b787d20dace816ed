//! Regions of interest: where each template is searched for

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Rectangle in frame coordinates. Signed so that shifted probes can
/// temporarily fall outside the frame before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Roi {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whole-frame region
    pub fn full_frame(frame_width: u32, frame_height: u32) -> Self {
        Self::new(0, 0, frame_width as i32, frame_height as i32)
    }

    /// Same size, origin moved by (dx, dy)
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }

    /// Clip to the frame. The origin is pulled inside the frame first, then
    /// width and height are cut to what remains to the right and below it.
    /// Returns `None` when nothing is left.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<Roi> {
        let frame_w = frame_width as i32;
        let frame_h = frame_height as i32;

        let x = self.x.min(frame_w - 1).max(0);
        let y = self.y.min(frame_h - 1).max(0);
        let width = self.width.min(frame_w - x);
        let height = self.height.min(frame_h - y);

        (width > 0 && height > 0).then_some(Roi::new(x, y, width, height))
    }

    /// Parse `[x,y,width,height]` embedded in a template file name,
    /// e.g. `continue-[300,1682,50,50].png`
    pub fn parse_from_filename(filename: &str) -> Option<Roi> {
        let start = filename.find('[')?;
        let end = filename.find(']')?;
        if end <= start {
            return None;
        }

        let parts: Vec<i32> = filename[start + 1..end]
            .split(',')
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .ok()?;

        match parts.as_slice() {
            &[x, y, width, height] => Some(Roi::new(x, y, width, height)),
            _ => None,
        }
    }
}

/// One `rois` entry: a rectangle, or the name of another template whose
/// rectangle is shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoiSpec {
    Rect([i32; 4]),
    Alias(String),
}

impl From<Roi> for RoiSpec {
    fn from(roi: Roi) -> Self {
        RoiSpec::Rect([roi.x, roi.y, roi.width, roi.height])
    }
}

/// Search regions keyed by template name
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    regions: HashMap<String, RoiSpec>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(rois: &BTreeMap<String, RoiSpec>) -> Self {
        Self {
            regions: rois
                .iter()
                .map(|(name, spec)| (name.clone(), spec.clone()))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: &str, spec: RoiSpec) {
        self.regions.insert(name.to_string(), spec);
    }

    /// Use the `[x,y,w,h]` of a template file name unless a region is
    /// already configured for that template.
    pub fn insert_from_filename(&mut self, name: &str, filename: &str) -> bool {
        if self.regions.contains_key(name) {
            return false;
        }
        match Roi::parse_from_filename(filename) {
            Some(roi) => {
                self.regions.insert(name.to_string(), roi.into());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&RoiSpec> {
        self.regions.get(name)
    }

    /// Rectangle for a template, following at most one alias.
    /// `None` means "search the whole frame".
    pub fn resolve(&self, name: &str) -> Option<Roi> {
        match self.regions.get(name)? {
            RoiSpec::Rect([x, y, w, h]) => Some(Roi::new(*x, *y, *w, *h)),
            RoiSpec::Alias(target) => match self.regions.get(target) {
                Some(RoiSpec::Rect([x, y, w, h])) => Some(Roi::new(*x, *y, *w, *h)),
                Some(RoiSpec::Alias(_)) => {
                    log::warn!("⚠️ ROI alias '{name}' -> '{target}' points at another alias");
                    None
                }
                None => None,
            },
        }
    }

    /// Every template name with a resolvable rectangle, sorted by name
    pub fn resolved(&self) -> Vec<(String, Roi)> {
        let mut out: Vec<(String, Roi)> = self
            .regions
            .keys()
            .filter_map(|name| self.resolve(name).map(|roi| (name.clone(), roi)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Offsets on the perimeter of the square ring at distance `radius`.
///
/// Top row left to right, bottom row left to right, then the left and right
/// columns top to bottom without the corners: `8 * radius` points.
pub fn ring_offsets(radius: i32) -> impl Iterator<Item = (i32, i32)> {
    let r = radius;
    let top = (-r..=r).map(move |dx| (dx, -r));
    let bottom = (-r..=r).map(move |dx| (dx, r));
    let left = (-r + 1..r).map(move |dy| (-r, dy));
    let right = (-r + 1..r).map(move |dy| (r, dy));
    top.chain(bottom).chain(left).chain(right)
}

/// Largest ring search radius; wider than any screen
pub const MAX_SEARCH_RADIUS: u32 = 10_000;

/// Rings 1..=max_radius, nearest first. Radii above [`MAX_SEARCH_RADIUS`]
/// are cut to it.
pub fn concentric_offsets(max_radius: u32) -> impl Iterator<Item = (i32, i32)> {
    (1..=max_radius.min(MAX_SEARCH_RADIUS) as i32).flat_map(ring_offsets)
}
