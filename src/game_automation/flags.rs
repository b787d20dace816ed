// Flags shared between the hotkey listener and the control loop.
// The loop reads them once per iteration, so a change is seen at most one
// iteration (or one 100 ms pause poll) late.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct ControlFlags {
    paused: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    return_to_menu: Arc<AtomicBool>,
    visualizer: Arc<AtomicBool>,
}

impl ControlFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Flip pause; returns the new value
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn request_menu(&self) {
        self.return_to_menu.store(true, Ordering::SeqCst);
    }

    pub fn menu_requested(&self) -> bool {
        self.return_to_menu.load(Ordering::SeqCst)
    }

    /// Flip the visualizer request; returns the new value
    pub fn toggle_visualizer(&self) -> bool {
        !self.visualizer.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn visualizer_enabled(&self) -> bool {
        self.visualizer.load(Ordering::SeqCst)
    }

    pub fn set_visualizer(&self, enabled: bool) {
        self.visualizer.store(enabled, Ordering::SeqCst);
    }

    /// Clear the menu request before the next bot starts. A stop request
    /// ends the process and is never cleared; the visualizer request
    /// outlives a single run.
    pub fn reset_for_run(&self, start_paused: bool) {
        self.return_to_menu.store(false, Ordering::SeqCst);
        self.paused.store(start_paused, Ordering::SeqCst);
    }
}
