//! Bot registry
//!
//! Every bot is listed here with its metadata, default configuration and
//! constructor. Looking a bot up never builds one.

pub mod fishing;

use crate::config::BotConfig;
use crate::game_automation::{Bot, BotError, BotResult};

pub struct BotDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub default_config: fn() -> BotConfig,
    pub build: fn(&BotConfig) -> Bot,
}

pub static BOT_REGISTRY: &[BotDescriptor] = &[BotDescriptor {
    name: fishing::NAME,
    description: fishing::DESCRIPTION,
    default_config: fishing::default_config,
    build: fishing::build,
}];

pub fn bot_names() -> Vec<&'static str> {
    BOT_REGISTRY.iter().map(|bot| bot.name).collect()
}

pub fn find_bot(name: &str) -> BotResult<&'static BotDescriptor> {
    BOT_REGISTRY
        .iter()
        .find(|bot| bot.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| BotError::UnknownBot {
            name: name.to_string(),
            available: bot_names().join(", "),
        })
}

/// Resolve a menu answer: a 1-based index or a bot name
pub fn select_bot(answer: &str) -> BotResult<&'static BotDescriptor> {
    let answer = answer.trim();
    match answer.parse::<usize>() {
        Ok(index) if (1..=BOT_REGISTRY.len()).contains(&index) => Ok(&BOT_REGISTRY[index - 1]),
        _ => find_bot(answer),
    }
}

/// Numbered list of bots for the selection menu
pub fn menu_text() -> String {
    let mut text = String::from("🤖 Available bots:\n");
    for (i, bot) in BOT_REGISTRY.iter().enumerate() {
        text.push_str(&format!("  {}. {:<10} {}\n", i + 1, bot.name, bot.description));
    }
    text
}
