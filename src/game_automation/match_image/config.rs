//! Configuration for image matching operations

#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Minimum normalized correlation for a match (0.0 to 1.0)
    pub precision: f32,
    /// Report every attempt above `debug_report_floor`
    pub debug_enabled: bool,
    /// Attempts scoring below this are too far off to be worth logging
    pub debug_report_floor: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            precision: 0.8,
            debug_enabled: false,
            debug_report_floor: 0.3,
        }
    }
}

impl MatchConfig {
    pub fn with_precision(precision: f32) -> Self {
        Self {
            precision,
            ..Self::default()
        }
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    pub fn is_match(&self, confidence: f32) -> bool {
        confidence >= self.precision
    }

    pub fn should_report(&self, confidence: f32) -> bool {
        self.debug_enabled && confidence >= self.debug_report_floor
    }
}
