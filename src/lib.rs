pub mod args;
pub mod bots;
pub mod config;
pub mod device;
pub mod game_automation;
pub mod hotkeys;
pub mod visualizer;

pub use config::BotConfig;
pub use game_automation::{BotError, BotResult, ControlLoop};
