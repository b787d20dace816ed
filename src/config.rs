//! Configuration Management

use crate::device::CaptureRegion;
use crate::game_automation::{
    BotError, BotResult, LoopSettings, MatchConfig, RegionTable, RoiSpec, StateId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a bot run is configured with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Minimum correlation for a template to count as found (0.0 to 1.0)
    pub precision: f32,
    /// Loop iterations per second, 0 = unlimited
    pub target_rate: f32,
    /// Log every match attempt with its confidence
    pub debug_mode: bool,
    /// Directory template files are resolved against
    pub assets_path: PathBuf,
    /// Screen area to capture
    pub screen: CaptureRegion,
    /// Template name -> file name under `assets_path`
    pub templates: BTreeMap<String, String>,
    /// Template name -> `[x, y, width, height]` or the name of another template
    pub rois: BTreeMap<String, RoiSpec>,
    /// State id -> seconds; 0 disables the deadline
    pub state_timeouts: BTreeMap<String, f64>,
    /// Fishing bot settings
    pub fishing: FishingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FishingSettings {
    /// Seconds to wait before casting
    pub casting_delay: f64,
    /// Seconds to wait after dismissing the catch screen
    pub finish_wait_delay: f64,
    /// Skip the catch screen with escape
    pub quick_finish_enabled: bool,
}

impl Default for FishingSettings {
    fn default() -> Self {
        Self {
            casting_delay: 0.5,
            finish_wait_delay: 0.5,
            quick_finish_enabled: false,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            precision: 0.8,
            target_rate: 0.0,
            debug_mode: false,
            assets_path: PathBuf::from("assets/templates"),
            screen: CaptureRegion::default(),
            templates: BTreeMap::new(),
            rois: BTreeMap::new(),
            state_timeouts: BTreeMap::new(),
            fishing: FishingSettings::default(),
        }
    }
}

impl BotConfig {
    /// Load config from file, falling back to `defaults` for absent keys
    pub fn load(path: &Path, defaults: BotConfig) -> BotResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| BotError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content, defaults).map_err(|e| match e {
            BotError::ConfigParse { source, .. } => BotError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::info!("⚙️ Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML on top of `defaults`: tables given in the file extend or
    /// override the default tables key by key.
    pub fn from_toml(content: &str, defaults: BotConfig) -> BotResult<Self> {
        let overlay: ConfigOverlay = toml::from_str(content).map_err(|source| BotError::ConfigParse {
            path: PathBuf::new(),
            source,
        })?;
        let config = overlay.apply(defaults);
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> BotResult<String> {
        toml::to_string_pretty(self).map_err(|e| BotError::config(e.to_string()))
    }

    /// Check config values are within acceptable ranges
    pub fn validate(&self) -> BotResult<()> {
        if !(0.0..=1.0).contains(&self.precision) {
            return Err(BotError::config(format!(
                "precision must be in [0, 1], got {}",
                self.precision
            )));
        }
        if !self.target_rate.is_finite() || self.target_rate < 0.0 {
            return Err(BotError::config(format!(
                "target_rate must be >= 0, got {}",
                self.target_rate
            )));
        }
        if self.target_rate > 0.0 {
            check_seconds("target_rate period", 1.0 / self.target_rate as f64)?;
        }
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(BotError::config(format!(
                "screen must have a non-zero size, got {}x{}",
                self.screen.width, self.screen.height
            )));
        }
        for (name, seconds) in &self.state_timeouts {
            if name.parse::<StateId>().is_err() {
                return Err(BotError::config(format!(
                    "state_timeouts: unknown state '{name}'"
                )));
            }
            check_seconds(&format!("state_timeouts.{name}"), *seconds)?;
        }
        for (name, spec) in &self.rois {
            match spec {
                RoiSpec::Rect([_, _, w, h]) if *w < 0 || *h < 0 => {
                    return Err(BotError::config(format!(
                        "rois.{name} has a negative size"
                    )));
                }
                RoiSpec::Alias(target) if !self.rois.contains_key(target) => {
                    log::warn!("⚠️ rois.{name} refers to '{target}', which has no region");
                }
                _ => {}
            }
        }
        for (key, value) in [
            ("casting_delay", self.fishing.casting_delay),
            ("finish_wait_delay", self.fishing.finish_wait_delay),
        ] {
            check_seconds(&format!("fishing.{key}"), value)?;
        }
        Ok(())
    }

    /// Per-state deadlines for the state machine; zero entries mean none
    pub fn state_timeout_table(&self) -> BTreeMap<StateId, Duration> {
        self.state_timeouts
            .iter()
            .filter_map(|(name, seconds)| {
                let id = name.parse::<StateId>().ok()?;
                let limit = Duration::try_from_secs_f64(seconds.max(0.0)).ok()?;
                Some((id, limit))
            })
            .collect()
    }

    /// Add templates found on disk; names already declared keep their file
    pub fn declare_templates<I>(&mut self, found: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, file) in found {
            self.templates.entry(name).or_insert(file);
        }
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig::with_precision(self.precision).debug(self.debug_mode)
    }

    /// Configured regions, plus `[x,y,w,h]` embedded in template file names
    pub fn region_table(&self) -> RegionTable {
        let mut regions = RegionTable::from_config(&self.rois);
        for (name, file) in &self.templates {
            regions.insert_from_filename(name, file);
        }
        regions
    }

    pub fn loop_settings(&self, run_for: Option<Duration>) -> LoopSettings {
        LoopSettings {
            target_rate: self.target_rate,
            run_for,
        }
    }
}

/// Seconds must be non-negative and fit in a `Duration`
fn check_seconds(key: &str, seconds: f64) -> BotResult<()> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(BotError::config(format!("{key} must be >= 0, got {seconds}")));
    }
    if Duration::try_from_secs_f64(seconds).is_err() {
        return Err(BotError::config(format!("{key} is too large: {seconds} s")));
    }
    Ok(())
}

/// A config file as written: every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverlay {
    precision: Option<f32>,
    target_rate: Option<f32>,
    debug_mode: Option<bool>,
    assets_path: Option<PathBuf>,
    screen: Option<CaptureRegion>,
    #[serde(default)]
    templates: BTreeMap<String, String>,
    #[serde(default)]
    rois: BTreeMap<String, RoiSpec>,
    #[serde(default)]
    state_timeouts: BTreeMap<String, f64>,
    fishing: Option<FishingOverlay>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FishingOverlay {
    casting_delay: Option<f64>,
    finish_wait_delay: Option<f64>,
    quick_finish_enabled: Option<bool>,
}

impl ConfigOverlay {
    fn apply(self, mut base: BotConfig) -> BotConfig {
        if let Some(v) = self.precision {
            base.precision = v;
        }
        if let Some(v) = self.target_rate {
            base.target_rate = v;
        }
        if let Some(v) = self.debug_mode {
            base.debug_mode = v;
        }
        if let Some(v) = self.assets_path {
            base.assets_path = v;
        }
        if let Some(v) = self.screen {
            base.screen = v;
        }
        base.templates.extend(self.templates);
        base.rois.extend(self.rois);
        base.state_timeouts.extend(self.state_timeouts);
        if let Some(fishing) = self.fishing {
            if let Some(v) = fishing.casting_delay {
                base.fishing.casting_delay = v;
            }
            if let Some(v) = fishing.finish_wait_delay {
                base.fishing.finish_wait_delay = v;
            }
            if let Some(v) = fishing.quick_finish_enabled {
                base.fishing.quick_finish_enabled = v;
            }
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_automation::Roi;
    use std::io::Write;

    fn defaults() -> BotConfig {
        let mut config = BotConfig::default();
        config
            .templates
            .insert("continue".to_string(), "continue.png".to_string());
        config
            .state_timeouts
            .insert("STARTING".to_string(), 10.0);
        config
    }

    #[test]
    fn test_overlay_extends_defaults() {
        let config = BotConfig::from_toml(
            r#"
                precision = 0.9
                target_rate = 20

                [screen]
                x = 8
                y = 32
                width = 1904
                height = 1041

                [templates]
                ok = "ok-[10,20,30,40].png"

                [rois]
                continue = [1700, 950, 200, 100]
                ok_again = "ok"

                [state_timeouts]
                STARTING = 0
                WAITING_FOR_BITE = 25

                [fishing]
                quick_finish_enabled = true
            "#,
            defaults(),
        )
        .unwrap();

        assert_eq!(config.precision, 0.9);
        assert_eq!(config.target_rate, 20.0);
        assert!(!config.debug_mode);
        assert_eq!(config.screen, CaptureRegion::new(8, 32, 1904, 1041));
        assert_eq!(config.templates.len(), 2);
        assert!(config.fishing.quick_finish_enabled);
        assert_eq!(config.fishing.casting_delay, 0.5);

        let table = config.state_timeout_table();
        assert_eq!(table[&StateId::Starting], Duration::ZERO);
        assert_eq!(table[&StateId::WaitingForBite], Duration::from_secs(25));

        let regions = config.region_table();
        assert_eq!(regions.resolve("continue"), Some(Roi::new(1700, 950, 200, 100)));
        assert_eq!(regions.resolve("ok"), Some(Roi::new(10, 20, 30, 40)));
        assert_eq!(regions.resolve("ok_again"), regions.resolve("ok"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for bad in [
            "precision = 1.5",
            "target_rate = -1",
            "[state_timeouts]\nSLEEPING = 3",
            "[state_timeouts]\nIDLE = -2",
            "[rois]\nx = [0, 0, -5, 10]",
            "[fishing]\ncasting_delay = -0.1",
            "[screen]\nx = 0\ny = 0\nwidth = 0\nheight = 10",
        ] {
            let result = BotConfig::from_toml(bad, BotConfig::default());
            assert!(
                matches!(result, Err(BotError::Config { .. })),
                "accepted: {bad}"
            );
        }
    }

    #[test]
    fn test_validation_rejects_durations_that_overflow() {
        for bad in [
            "[state_timeouts]\nSTARTING = 1e30",
            "target_rate = 1e-30",
            "[fishing]\ncasting_delay = 1e30",
            "[fishing]\nfinish_wait_delay = 1e30",
        ] {
            let result = BotConfig::from_toml(bad, BotConfig::default());
            assert!(
                matches!(result, Err(BotError::Config { .. })),
                "accepted: {bad}"
            );
        }

        // Skipping validation must not panic either
        let mut config = defaults();
        config.state_timeouts.insert("STARTING".to_string(), 1e30);
        assert!(config.state_timeout_table().is_empty());
    }

    #[test]
    fn test_unknown_keys_are_parse_errors() {
        let result = BotConfig::from_toml("precison = 0.9", BotConfig::default());
        assert!(matches!(result, Err(BotError::ConfigParse { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "debug_mode = true").unwrap();

        let config = BotConfig::load(file.path(), defaults()).unwrap();
        assert!(config.debug_mode);
        assert!(config.match_config().debug_enabled);
        assert_eq!(config.templates.len(), 1);

        let missing = BotConfig::load(Path::new("/nonexistent/bot.toml"), defaults());
        assert!(matches!(missing, Err(BotError::ConfigRead { .. })));
    }

    #[test]
    fn test_printed_config_loads_back() {
        let mut config = defaults();
        config
            .rois
            .insert("continue".to_string(), RoiSpec::Rect([1, 2, 3, 4]));
        config
            .rois
            .insert("next".to_string(), RoiSpec::Alias("continue".to_string()));

        let text = config.to_toml().unwrap();
        assert!(text.contains("[state_timeouts]"));
        let reloaded = BotConfig::from_toml(&text, BotConfig::default()).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_declared_templates_keep_configured_file() {
        let mut config = defaults();
        config.declare_templates([
            ("continue".to_string(), "continue-[1,2,3,4].png".to_string()),
            ("ok".to_string(), "ok-[10,20,30,40].png".to_string()),
        ]);

        assert_eq!(config.templates["continue"], "continue.png");
        assert_eq!(config.templates["ok"], "ok-[10,20,30,40].png");
        assert_eq!(config.region_table().resolve("ok"), Some(Roi::new(10, 20, 30, 40)));
    }

    #[test]
    fn test_loop_settings() {
        let config = BotConfig {
            target_rate: 4.0,
            ..BotConfig::default()
        };
        let settings = config.loop_settings(Some(Duration::from_secs(3)));
        assert_eq!(settings.frame_period(), Some(Duration::from_millis(250)));
        assert_eq!(settings.run_for, Some(Duration::from_secs(3)));
        assert_eq!(BotConfig::default().loop_settings(None).frame_period(), None);

        let crawling = LoopSettings {
            target_rate: 1e-30,
            run_for: None,
        };
        assert_eq!(crawling.frame_period(), None);
    }
}
