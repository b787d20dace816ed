//! Image matching module for game automation
//!
//! Named templates, per-template search regions and the match engine that
//! looks them up in captured frames.

pub mod config;
pub mod correlation;
pub mod detector;
pub mod region;
pub mod template;


// Re-export main types and functions
pub use config::MatchConfig;
pub use correlation::{CorrelationPeak, best_match};
pub use detector::{MatchEngine, MatchResult};
pub use region::{MAX_SEARCH_RADIUS, RegionTable, Roi, RoiSpec, concentric_offsets, ring_offsets};
pub use template::{LoadReport, LoadStatus, Template, TemplateLibrary};
