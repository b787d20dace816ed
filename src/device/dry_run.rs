//! Input actuator that only logs what it would do

use super::error::DeviceResult;
use super::types::{InputActuator, MouseButton};
use crate::game_automation::clock::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const PRESS_SETTLE: Duration = Duration::from_millis(100);
const CLICK_SETTLE: Duration = Duration::from_millis(150);
const MOVE_SETTLE: Duration = Duration::from_millis(100);
const BUTTON_SETTLE: Duration = Duration::from_millis(100);

/// Logs every primitive and keeps track of what is held down, so
/// `release_all` can report exactly what a real backend would let go of.
pub struct DryRunActuator {
    clock: Arc<dyn Clock>,
    held_keys: BTreeSet<String>,
    held_buttons: BTreeSet<MouseButton>,
    cursor: (i32, i32),
    actions: u64,
}

impl DryRunActuator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            held_keys: BTreeSet::new(),
            held_buttons: BTreeSet::new(),
            cursor: (0, 0),
            actions: 0,
        }
    }

    pub fn held_keys(&self) -> impl Iterator<Item = &str> {
        self.held_keys.iter().map(String::as_str)
    }

    pub fn held_buttons(&self) -> impl Iterator<Item = MouseButton> + '_ {
        self.held_buttons.iter().copied()
    }

    pub fn cursor(&self) -> (i32, i32) {
        self.cursor
    }

    /// Number of primitives executed so far
    pub fn action_count(&self) -> u64 {
        self.actions
    }

    fn settle(&mut self, delay: Duration) {
        self.actions += 1;
        if !delay.is_zero() {
            self.clock.sleep(delay);
        }
    }
}

impl InputActuator for DryRunActuator {
    fn press(&mut self, key: &str) -> DeviceResult<()> {
        log::info!("🔘 Pressing key: {key}");
        self.settle(PRESS_SETTLE);
        Ok(())
    }

    fn click(&mut self, button: MouseButton, count: u32, interval_secs: f64) -> DeviceResult<()> {
        log::info!("🖱️ Clicking: {button} ({count}x)");
        if count > 1 && interval_secs > 0.0 {
            self.clock
                .sleep(Duration::from_secs_f64(interval_secs) * (count - 1));
        }
        self.settle(CLICK_SETTLE);
        Ok(())
    }

    fn click_at(&mut self, x: i32, y: i32, button: MouseButton) -> DeviceResult<()> {
        log::info!("🖱️ Clicking {button} at ({x}, {y})");
        self.cursor = (x, y);
        self.settle(CLICK_SETTLE);
        Ok(())
    }

    fn move_to(&mut self, x: i32, y: i32) -> DeviceResult<()> {
        log::info!("📍 Moving mouse to: ({x}, {y})");
        self.cursor = (x, y);
        self.settle(MOVE_SETTLE);
        Ok(())
    }

    fn mouse_down(&mut self, button: MouseButton) -> DeviceResult<()> {
        log::info!("🖱️ ⬇️ Holding mouse: {button}");
        self.held_buttons.insert(button);
        self.settle(BUTTON_SETTLE);
        Ok(())
    }

    fn mouse_up(&mut self, button: MouseButton) -> DeviceResult<()> {
        log::info!("🖱️ ⬆️ Releasing mouse: {button}");
        self.held_buttons.remove(&button);
        self.settle(BUTTON_SETTLE);
        Ok(())
    }

    fn key_down(&mut self, key: &str) -> DeviceResult<()> {
        log::info!("🔘 ⬇️ Holding key: {key}");
        self.held_keys.insert(key.to_string());
        self.settle(Duration::ZERO);
        Ok(())
    }

    fn key_up(&mut self, key: &str) -> DeviceResult<()> {
        log::info!("🔘 ⬆️ Releasing key: {key}");
        self.held_keys.remove(key);
        self.settle(Duration::ZERO);
        Ok(())
    }

    fn release_all(&mut self) -> DeviceResult<()> {
        log::warn!("⚠️ Releasing all controls...");
        let mut buttons: BTreeSet<MouseButton> = std::mem::take(&mut self.held_buttons);
        buttons.insert(MouseButton::Left);
        buttons.insert(MouseButton::Right);
        for button in buttons {
            self.mouse_up(button)?;
        }

        let keys: Vec<String> = std::mem::take(&mut self.held_keys).into_iter().collect();
        for key in keys {
            self.key_up(&key)?;
        }
        Ok(())
    }
}
