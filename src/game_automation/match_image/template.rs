//! Template loading and lookup

use crate::game_automation::error::{BotError, BotResult};
use image::{DynamicImage, GrayImage, Luma};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A named visual cue. Grayscale pixels plus an optional mask of the same
/// size; mask pixels that are non-zero take part in matching.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    image: GrayImage,
    mask: Option<GrayImage>,
}

impl Template {
    pub fn new(name: &str, image: GrayImage, mask: Option<GrayImage>) -> BotResult<Self> {
        if let Some(mask) = &mask
            && mask.dimensions() != image.dimensions()
        {
            return Err(BotError::MaskSizeMismatch {
                name: name.to_string(),
                width: image.width(),
                height: image.height(),
                mask_width: mask.width(),
                mask_height: mask.height(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            image,
            mask,
        })
    }

    /// Build from a decoded image. An alpha channel becomes the mask:
    /// fully transparent pixels are ignored, everything else is matched.
    pub fn from_image(name: &str, image: &DynamicImage) -> BotResult<Self> {
        let mask = image.color().has_alpha().then(|| {
            let rgba = image.to_rgba8();
            GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                let alpha = rgba.get_pixel(x, y)[3];
                Luma([if alpha > 0 { 255 } else { 0 }])
            })
        });
        Self::new(name, image.to_luma8(), mask)
    }

    pub fn load(name: &str, path: &Path) -> BotResult<Self> {
        let image = image::open(path).map_err(|e| BotError::Template {
            name: name.to_string(),
            path: path.to_path_buf(),
            description: e.to_string(),
        })?;
        Self::from_image(name, &image)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn mask(&self) -> Option<&GrayImage> {
        self.mask.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Offset of the template center from its top-left corner
    pub fn center_offset(&self) -> (i32, i32) {
        ((self.width() / 2) as i32, (self.height() / 2) as i32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loaded { width: u32, height: u32, masked: bool },
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadEntry {
    pub name: String,
    pub path: PathBuf,
    pub status: LoadStatus,
}

/// Found/not-found outcome for every declared template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub entries: Vec<LoadEntry>,
}

impl LoadReport {
    pub fn loaded_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, LoadStatus::Loaded { .. }))
            .count()
    }

    /// Names that did not make it into the library
    pub fn missing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !matches!(e.status, LoadStatus::Loaded { .. }))
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.loaded_count() == self.entries.len()
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "📦 Templates: {}/{} loaded",
            self.loaded_count(),
            self.entries.len()
        )?;
        for entry in &self.entries {
            match &entry.status {
                LoadStatus::Loaded { width, height, masked: true } => {
                    writeln!(f, "  ✅ {} ({width}x{height}, with transparency mask)", entry.name)?
                }
                LoadStatus::Loaded { width, height, masked: false } => {
                    writeln!(f, "  ✅ {} ({width}x{height})", entry.name)?
                }
                LoadStatus::NotFound => writeln!(
                    f,
                    "  ❌ {} - not found at '{}'",
                    entry.name,
                    entry.path.display()
                )?,
                LoadStatus::Failed(reason) => {
                    writeln!(f, "  ❌ {} - {reason}", entry.name)?
                }
            }
        }
        Ok(())
    }
}

/// Named templates, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: HashMap<String, Template>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every declared `(name, file)` pair relative to `assets_path`.
    ///
    /// Missing or unreadable files are logged and left out of the library;
    /// the report records the outcome for each name.
    pub fn load<'a, I>(&mut self, assets_path: &Path, declared: I) -> LoadReport
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        log::info!("📦 Loading templates from {}...", assets_path.display());
        let mut report = LoadReport::default();

        for (name, file) in declared {
            let path = assets_path.join(file);
            let status = if !path.is_file() {
                log::warn!("❌ {name} - not found at '{}'", path.display());
                LoadStatus::NotFound
            } else {
                match Template::load(name, &path) {
                    Ok(template) => {
                        let status = LoadStatus::Loaded {
                            width: template.width(),
                            height: template.height(),
                            masked: template.mask().is_some(),
                        };
                        if template.mask().is_some() {
                            log::info!("✅ {name} (with transparency mask)");
                        } else {
                            log::info!("✅ {name}");
                        }
                        self.templates.insert(name.to_string(), template);
                        status
                    }
                    Err(e) => {
                        log::warn!("❌ {e}");
                        LoadStatus::Failed(e.to_string())
                    }
                }
            };

            report.entries.push(LoadEntry {
                name: name.to_string(),
                path,
                status,
            });
        }

        report
    }

    /// Declare every PNG in `directory`, named after its file stem without
    /// a trailing `-[x,y,w,h]` region
    pub fn scan_directory(directory: &Path) -> BotResult<Vec<(String, String)>> {
        let entries = std::fs::read_dir(directory).map_err(|source| BotError::ConfigRead {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut declared: Vec<(String, String)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let is_png = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
                if !(is_png && path.is_file()) {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?;
                let name = match stem.find("-[") {
                    Some(cut) if stem.ends_with(']') => &stem[..cut],
                    _ => stem,
                };
                let file = path.file_name()?.to_str()?.to_string();
                Some((name.to_string(), file))
            })
            .collect();

        // Sort for consistent ordering
        declared.sort();
        Ok(declared)
    }

    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.name().to_string(), template);
    }

    pub fn lookup(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
