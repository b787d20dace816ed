// States of the fishing bot
use super::{FISH_CAUGHT, FISH_ESCAPED, ROD_BREAKS};
use crate::device::{Frame, MouseButton};
use crate::game_automation::stats::CYCLES;
use crate::game_automation::{BotContext, BotResult, State, StateId};
use std::time::{Duration, Instant};

const SEARCH_LOG_INTERVAL: Duration = Duration::from_secs(2);
const WAIT_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Rod replacement slot in the inventory, relative to the capture region
const ROD_SLOT: (i32, i32) = (1650, 580);

const ROD_TEMPLATES: [&str; 3] = ["flex_rod", "sturdy_rod", "reg_rod"];

/// True when `last` is unset or older than `interval`; records `now` if so
fn throttle(last: &mut Option<Instant>, now: Instant, interval: Duration) -> bool {
    let due = last.is_none_or(|at| now.saturating_duration_since(at) > interval);
    if due {
        *last = Some(now);
    }
    due
}

/// Looks for the fishing spot and enters fishing mode
pub struct StartingState {
    debug: bool,
    last_search_log: Option<Instant>,
}

impl StartingState {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            last_search_log: None,
        }
    }

    /// Small step back and forth so the interaction button shows up again
    fn wiggle(ctx: &mut BotContext<'_>) -> BotResult<()> {
        ctx.input.key_down("s")?;
        ctx.input.key_down("d")?;
        ctx.pause(0.1);
        ctx.input.key_up("s")?;
        ctx.input.key_up("d")?;
        Ok(())
    }
}

impl State for StartingState {
    fn handle(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<StateId> {
        if let Some(pos) = ctx.find(frame, "fishing_spot_btn", 5) {
            log::info!("✅ Fishing spot detected at {pos:?}, pressing 'F'");
            ctx.pause(0.5);
            ctx.input.press("f")?;
            log::info!("🎣 Entering fishing mode");
            ctx.pause(2.0);
            return Ok(StateId::CheckingRod);
        }

        if ctx.find(frame, "level_check", 5).is_some() {
            log::info!("🎣 Already in fishing mode, skipping interaction");
            return Ok(StateId::CheckingRod);
        }

        if throttle(&mut self.last_search_log, ctx.clock.now(), SEARCH_LOG_INTERVAL) {
            log::info!("🔍 Searching for fishing spot...");
            Self::wiggle(ctx)?;
            if self.debug {
                log::debug!("🔍 Neither fishing_spot_btn nor level_check matched");
            }
        }

        Ok(StateId::Starting)
    }
}

/// Replaces the rod when none of the known rods is equipped
pub struct CheckingRodState;

impl CheckingRodState {
    fn replace_rod(ctx: &mut BotContext<'_>) -> BotResult<()> {
        log::warn!("⚠️ Broken rod! Replacing...");
        ctx.stats.increment(ROD_BREAKS);
        ctx.pause(1.0);

        ctx.input.press("m")?;
        ctx.pause(1.0);

        let (x, y) = ctx.absolute(ROD_SLOT.0, ROD_SLOT.1);
        ctx.input.move_to(x, y)?;
        ctx.pause(0.5);
        ctx.input.move_to(x, y)?;
        ctx.pause(0.5);
        ctx.input.click(MouseButton::Left, 1, 0.0)?;
        ctx.pause(1.0);

        log::info!("✅ Rod replaced");
        Ok(())
    }
}

impl State for CheckingRodState {
    fn handle(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<StateId> {
        log::info!("🎣 Checking rod...");
        ctx.pause(1.0);

        let has_rod = ROD_TEMPLATES
            .iter()
            .any(|rod| ctx.find(frame, rod, 5).is_some());

        if has_rod {
            ctx.pause(1.0);
            log::info!("✅ Rod OK");
        } else {
            Self::replace_rod(ctx)?;
        }

        Ok(StateId::CastingBait)
    }
}

/// Focuses the game window and casts
pub struct CastingBaitState {
    casting_delay: f64,
}

impl CastingBaitState {
    pub fn new(casting_delay: f64) -> Self {
        Self { casting_delay }
    }
}

impl State for CastingBaitState {
    fn handle(&mut self, _frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<StateId> {
        log::info!("🎣 Waiting {} seconds...", self.casting_delay);
        ctx.pause(self.casting_delay);

        let (x, y) = ctx.region().center();
        log::info!("📍 Moving mouse to center of screen ({x}, {y})");
        ctx.input.move_to(x, y)?;
        ctx.pause(1.0);

        log::info!("🖱️ Clicking to ensure focus...");
        ctx.input.click_at(x, y, MouseButton::Left)?;
        ctx.pause(0.5);

        log::info!("🎣 Casting bait...");
        ctx.input.mouse_down(MouseButton::Left)?;
        ctx.pause(0.1);
        ctx.input.mouse_up(MouseButton::Left)?;
        ctx.pause(2.0);

        Ok(StateId::WaitingForBite)
    }
}

/// Waits for the bite marker and hooks the fish
#[derive(Default)]
pub struct WaitingForBiteState {
    last_wait_log: Option<Instant>,
}

impl State for WaitingForBiteState {
    fn handle(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<StateId> {
        if ctx.find(frame, "exclamation", 1).is_some() {
            log::info!("❗ Fish hooked!");
            ctx.input.mouse_down(MouseButton::Left)?;
            return Ok(StateId::PlayingMinigame);
        }

        if throttle(&mut self.last_wait_log, ctx.clock.now(), WAIT_LOG_INTERVAL) {
            log::info!("⏳ Waiting for fish...");
        }
        Ok(StateId::WaitingForBite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    fn arrow(self) -> &'static str {
        match self {
            Direction::Left => "left_arrow",
            Direction::Right => "right_arrow",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Direction::Left => "a",
            Direction::Right => "d",
        }
    }

    fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Steers the reel bar with the arrow keys until the fish is caught or lost
pub struct PlayingMinigameState {
    quick_finish: bool,
    switch_delay: f64,
    holding: Option<Direction>,
}

impl PlayingMinigameState {
    pub fn new(quick_finish: bool) -> Self {
        Self {
            quick_finish,
            switch_delay: 0.5,
            holding: None,
        }
    }

    pub fn holding(&self) -> Option<Direction> {
        self.holding
    }

    /// Switching sides takes two frames: release the held key, then press
    /// the new one once the arrow is seen again.
    fn steer(
        &mut self,
        direction: Direction,
        frame: &Frame,
        ctx: &mut BotContext<'_>,
    ) -> BotResult<()> {
        if ctx.find(frame, direction.arrow(), 0).is_none() {
            return Ok(());
        }

        if self.holding.is_none() {
            log::info!(
                "▶️ Moving to the {direction:?} (holding '{}')",
                direction.key()
            );
            ctx.input.key_down(direction.key())?;
            self.holding = Some(direction);
            ctx.pause(self.switch_delay);
        }

        let opposite = direction.opposite();
        if self.holding == Some(opposite) {
            log::info!(
                "◀️ Switching to the {direction:?} (releasing '{}')",
                opposite.key()
            );
            ctx.input.key_up(opposite.key())?;
            self.holding = None;
            ctx.pause(self.switch_delay);
        }
        Ok(())
    }
}

impl State for PlayingMinigameState {
    fn handle(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<StateId> {
        let caught = if ctx.find(frame, "success", 1).is_some() {
            log::info!("🐟 Fish caught!");
            ctx.stats.increment(FISH_CAUGHT);
            Some(true)
        } else if ctx.find(frame, "failure", 1).is_some() {
            log::info!("🐟 Fish got away!");
            ctx.stats.increment(FISH_ESCAPED);
            Some(false)
        } else {
            None
        };

        if let Some(caught) = caught {
            ctx.input.release_all()?;
            self.holding = None;

            if self.quick_finish {
                log::info!("⏩ Quick finishing...");
                ctx.input.press("esc")?;
                ctx.pause(0.5);
                return Ok(StateId::Starting);
            }
            if caught {
                return Ok(StateId::Finishing);
            }
            ctx.pause(2.0);
            return Ok(StateId::CheckingRod);
        }

        self.steer(Direction::Left, frame, ctx)?;
        self.steer(Direction::Right, frame, ctx)?;
        Ok(StateId::PlayingMinigame)
    }

    fn enter(&mut self, _ctx: &mut BotContext<'_>) -> BotResult<()> {
        self.holding = None;
        Ok(())
    }
}

/// Dismisses the catch screen and counts the cycle
pub struct FinishingState {
    finish_wait_delay: f64,
}

impl FinishingState {
    pub fn new(finish_wait_delay: f64) -> Self {
        Self { finish_wait_delay }
    }
}

impl State for FinishingState {
    fn handle(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<StateId> {
        if let Some((x, y)) = ctx.find(frame, "continue", 5) {
            log::info!("🖱️ Clicking 'Continue'...");
            ctx.input.move_to(x, y)?;
            ctx.pause(0.5);
            ctx.input.move_to(x, y)?;
            ctx.pause(1.0);
            ctx.input.click(MouseButton::Left, 1, 0.0)?;
            ctx.pause(self.finish_wait_delay);

            ctx.stats.increment(CYCLES);
            return Ok(StateId::CheckingRod);
        }

        if ctx.find(frame, "fishing_spot_btn", 1).is_some() {
            return Ok(StateId::Starting);
        }

        Ok(StateId::Finishing)
    }
}
