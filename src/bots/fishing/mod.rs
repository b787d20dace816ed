//! Fishing bot: finds a fishing spot, keeps the rod in shape, casts, waits
//! for a bite and plays the reel minigame.

pub mod interceptors;
pub mod states;


use crate::config::BotConfig;
use crate::game_automation::{
    Bot, BotContext, BotHooks, Counters, InterceptorChain, RoiSpec, StateId, StateMachine,
};
use interceptors::ReconnectDialog;
use states::{
    CastingBaitState, CheckingRodState, FinishingState, PlayingMinigameState, StartingState,
    WaitingForBiteState,
};
use std::collections::BTreeMap;

pub const NAME: &str = "fishing";
pub const DESCRIPTION: &str =
    "Automated fishing bot that detects bites, plays minigames, and manages equipment";

pub const FISH_CAUGHT: &str = "fish_caught";
pub const FISH_ESCAPED: &str = "fish_escaped";
pub const ROD_BREAKS: &str = "rod_breaks";

/// Interceptor priorities; higher runs first
const RECONNECT_PRIORITY: i32 = 10;

const TEMPLATES: [&str; 12] = [
    "fishing_spot_btn",
    "level_check",
    "connect_server",
    "flex_rod",
    "sturdy_rod",
    "reg_rod",
    "exclamation",
    "left_arrow",
    "right_arrow",
    "success",
    "failure",
    "continue",
];

pub fn default_config() -> BotConfig {
    let templates: BTreeMap<String, String> = TEMPLATES
        .iter()
        .map(|name| (name.to_string(), format!("{name}.png")))
        .collect();

    let rect = |x, y, w, h| RoiSpec::Rect([x, y, w, h]);
    let alias = |target: &str| RoiSpec::Alias(target.to_string());
    let rois: BTreeMap<String, RoiSpec> = [
        ("fishing_spot_btn", rect(1400, 480, 300, 200)),
        ("level_check", rect(1600, 980, 300, 100)),
        ("connect_server", rect(700, 400, 520, 280)),
        ("flex_rod", rect(1580, 980, 160, 100)),
        ("sturdy_rod", alias("flex_rod")),
        ("reg_rod", alias("flex_rod")),
        ("exclamation", rect(860, 340, 200, 200)),
        ("left_arrow", rect(700, 480, 200, 120)),
        ("right_arrow", rect(1020, 480, 200, 120)),
        ("success", rect(760, 160, 400, 160)),
        ("failure", alias("success")),
        ("continue", rect(1560, 960, 340, 100)),
    ]
    .into_iter()
    .map(|(name, spec)| (name.to_string(), spec))
    .collect();

    let state_timeouts: BTreeMap<String, f64> = [
        (StateId::Starting, 10.0),
        (StateId::CheckingRod, 15.0),
        (StateId::CastingBait, 15.0),
        (StateId::WaitingForBite, 25.0),
        (StateId::PlayingMinigame, 30.0),
        (StateId::Finishing, 10.0),
    ]
    .into_iter()
    .map(|(id, secs)| (id.to_string(), secs))
    .collect();

    BotConfig {
        templates,
        rois,
        state_timeouts,
        ..BotConfig::default()
    }
}

pub fn build(config: &BotConfig) -> Bot {
    let mut machine =
        StateMachine::new(StateId::Starting).with_default_timeouts(config.state_timeout_table());
    machine.add_state(StateId::Starting, Box::new(StartingState::new(config.debug_mode)));
    machine.add_state(StateId::CheckingRod, Box::new(CheckingRodState));
    machine.add_state(
        StateId::CastingBait,
        Box::new(CastingBaitState::new(config.fishing.casting_delay)),
    );
    machine.add_state(StateId::WaitingForBite, Box::new(WaitingForBiteState::default()));
    machine.add_state(
        StateId::PlayingMinigame,
        Box::new(PlayingMinigameState::new(config.fishing.quick_finish_enabled)),
    );
    machine.add_state(
        StateId::Finishing,
        Box::new(FinishingState::new(config.fishing.finish_wait_delay)),
    );

    let mut interceptors = InterceptorChain::new();
    interceptors.add(RECONNECT_PRIORITY, Box::new(ReconnectDialog));

    let mut stats = Counters::new();
    stats.add_stat(FISH_CAUGHT);
    stats.add_stat(FISH_ESCAPED);
    stats.add_stat(ROD_BREAKS);

    Bot {
        name: NAME,
        machine,
        interceptors,
        stats,
        hooks: Box::new(FishingHooks {
            precision: config.precision,
            target_rate: config.target_rate,
        }),
    }
}

struct FishingHooks {
    precision: f32,
    target_rate: f32,
}

impl BotHooks for FishingHooks {
    fn on_start(&mut self, ctx: &mut BotContext<'_>) {
        log::info!("🎣 Fishing bot ready!");
        log::info!("⚠️ IMPORTANT: Keep the game in FOCUS (active window)");
        log::info!("⚙️ Accuracy: {:.0}%", self.precision * 100.0);
        if self.target_rate > 0.0 {
            log::info!("⚙️ Target rate: {} fps", self.target_rate);
        } else {
            log::info!("⚙️ Target rate: MAX");
        }
        log::info!("⚠️ Warming up detection system...");
        ctx.pause(1.0);
    }
}
