// Finite State Machine implementation for game automation
use super::clock::Clock;
use super::error::{BotError, BotResult};
use super::match_image::MatchEngine;
use super::stats::{Counters, TIMEOUTS};
use super::types::StateId;
use crate::device::{CaptureRegion, Frame, InputActuator};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Pause after the escape key of a timeout recovery
const RECOVERY_SETTLE: Duration = Duration::from_millis(500);

/// Everything a state or interceptor may use while handling a frame
pub struct BotContext<'a> {
    pub engine: &'a MatchEngine,
    pub input: &'a mut dyn InputActuator,
    pub stats: &'a mut Counters,
    pub clock: &'a dyn Clock,
}

impl BotContext<'_> {
    pub fn find(&self, frame: &Frame, template: &str, search_radius: u32) -> Option<(i32, i32)> {
        self.engine.find(frame, template, search_radius)
    }

    pub fn pause(&self, secs: f64) {
        self.clock.sleep_secs(secs);
    }

    pub fn region(&self) -> CaptureRegion {
        self.engine.capture_region()
    }

    /// Point relative to the capture region, in absolute coordinates
    pub fn absolute(&self, x: i32, y: i32) -> (i32, i32) {
        self.region().to_absolute(x, y)
    }
}

/// One state of a bot.
///
/// States are built once and live as long as the machine, so anything kept
/// in `self` survives leaving and re-entering the state.
pub trait State: Send {
    /// Inspect the frame, act, and return the next state (`self`'s id to stay)
    fn handle(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<StateId>;

    /// Maximum time the state may stay active. `None` defers to the
    /// configured per-state table.
    fn timeout_limit(&self) -> Option<Duration> {
        None
    }

    fn enter(&mut self, _ctx: &mut BotContext<'_>) -> BotResult<()> {
        Ok(())
    }

    fn exit(&mut self, _ctx: &mut BotContext<'_>) -> BotResult<()> {
        Ok(())
    }
}

/// What one call to [`StateMachine::handle`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The active state handled the frame
    Handled,
    /// The active state overran its deadline and the machine was reset
    TimedOut,
    /// No state is active yet
    Inactive,
}

pub struct StateMachine {
    states: HashMap<StateId, Box<dyn State>>,
    initial: StateId,
    default_timeouts: BTreeMap<StateId, Duration>,
    current: Option<StateId>,
    entered_at: Option<Instant>,
}

impl StateMachine {
    /// `initial` is where the machine starts and where every timeout returns to
    pub fn new(initial: StateId) -> Self {
        Self {
            states: HashMap::new(),
            initial,
            default_timeouts: BTreeMap::new(),
            current: None,
            entered_at: None,
        }
    }

    /// Limits for states that do not declare their own. Zero disables.
    pub fn with_default_timeouts(mut self, timeouts: BTreeMap<StateId, Duration>) -> Self {
        self.default_timeouts = timeouts;
        self
    }

    /// Register a state; a second registration under the same id replaces the first
    pub fn add_state(&mut self, id: StateId, state: Box<dyn State>) {
        if self.states.insert(id, state).is_some() {
            log::debug!("🎮 State {id} re-registered");
        }
    }

    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    pub fn initial(&self) -> StateId {
        self.initial
    }

    pub fn is_registered(&self, id: StateId) -> bool {
        self.states.contains_key(&id)
    }

    /// Activate the initial state
    pub fn start(&mut self, ctx: &mut BotContext<'_>) -> BotResult<()> {
        self.set_state(self.initial, false, ctx).map(|_| ())
    }

    /// Switch to `id`. Returns `Ok(false)` when already there and not forced.
    /// An unregistered id is logged and refused; the current state is kept.
    pub fn set_state(
        &mut self,
        id: StateId,
        force: bool,
        ctx: &mut BotContext<'_>,
    ) -> BotResult<bool> {
        if !force && self.current == Some(id) {
            return Ok(false);
        }

        if !self.states.contains_key(&id) {
            log::error!("❌ Attempted to switch to unknown state: {id}");
            return Err(BotError::UnknownState(id));
        }

        if let Some(previous) = self.current
            && let Some(state) = self.states.get_mut(&previous)
            && let Err(e) = state.exit(ctx)
        {
            log::warn!("⚠️ Exit hook of {previous} failed: {e}");
        }

        match self.current {
            None => log::info!("🎮 Starting state machine in: {id}"),
            Some(previous) if previous != id => {
                log::info!("🎮 Changing state: {previous} -> {id}")
            }
            Some(_) => log::info!("🎮 Forcing state reset: {id}"),
        }

        self.current = Some(id);
        self.entered_at = Some(ctx.clock.now());

        if let Some(state) = self.states.get_mut(&id)
            && let Err(e) = state.enter(ctx)
        {
            log::warn!("⚠️ Enter hook of {id} failed: {e}");
        }

        Ok(true)
    }

    /// Effective deadline of a state, if any
    pub fn timeout_for(&self, id: StateId) -> Option<Duration> {
        self.states
            .get(&id)
            .and_then(|state| state.timeout_limit())
            .or_else(|| self.default_timeouts.get(&id).copied())
            .filter(|limit| !limit.is_zero())
    }

    /// Time spent in the current state so far
    pub fn time_in_state(&self, clock: &dyn Clock) -> Option<Duration> {
        self.entered_at
            .map(|entered| clock.now().saturating_duration_since(entered))
    }

    /// Check the deadline, then let the active state handle the frame
    pub fn handle(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> Tick {
        let Some(id) = self.current else {
            return Tick::Inactive;
        };

        if self.check_timeout(id, ctx) {
            return Tick::TimedOut;
        }

        let Some(state) = self.states.get_mut(&id) else {
            return Tick::Inactive;
        };

        let next = match state.handle(frame, ctx) {
            Ok(next) => next,
            Err(e) => {
                log::error!("❌ State {id} failed: {e}");
                return Tick::Handled;
            }
        };

        // Refusals are already logged; staying put is the recovery
        let _ = self.set_state(next, false, ctx);
        Tick::Handled
    }

    fn check_timeout(&mut self, id: StateId, ctx: &mut BotContext<'_>) -> bool {
        let Some(limit) = self.timeout_for(id) else {
            return false;
        };
        let Some(elapsed) = self.time_in_state(ctx.clock) else {
            return false;
        };
        if elapsed <= limit {
            return false;
        }

        log::warn!(
            "🚨 State '{id}' exceeded {:.1}s! Releasing controls and pressing 'esc' to reset",
            limit.as_secs_f64()
        );

        if let Err(e) = ctx.input.release_all() {
            log::error!("❌ Failed to release controls: {e}");
        }
        if let Err(e) = ctx.input.press("esc") {
            log::error!("❌ Failed to press 'esc': {e}");
        }
        ctx.clock.sleep(RECOVERY_SETTLE);
        ctx.stats.increment(TIMEOUTS);

        if self.set_state(self.initial, true, ctx).is_err() {
            // Restart the deadline so the failed recovery is not repeated every frame
            self.entered_at = Some(ctx.clock.now());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_automation::clock::ManualClock;
    use crate::game_automation::match_image::{MatchConfig, RegionTable, TemplateLibrary};
    use crate::game_automation::testing::{RecordingActuator, noise_frame};
    use std::sync::{Arc, Mutex};

    /// Returns a fixed next state and records hook calls
    struct Scripted {
        name: &'static str,
        next: StateId,
        limit: Option<Duration>,
        journal: Arc<Mutex<Vec<String>>>,
        handled: u32,
    }

    impl Scripted {
        fn boxed(
            name: &'static str,
            next: StateId,
            limit: Option<Duration>,
            journal: &Arc<Mutex<Vec<String>>>,
        ) -> Box<dyn State> {
            Box::new(Self {
                name,
                next,
                limit,
                journal: Arc::clone(journal),
                handled: 0,
            })
        }
    }

    impl State for Scripted {
        fn handle(&mut self, _frame: &Frame, _ctx: &mut BotContext<'_>) -> BotResult<StateId> {
            self.handled += 1;
            self.journal
                .lock()
                .unwrap()
                .push(format!("handle {} #{}", self.name, self.handled));
            Ok(self.next)
        }

        fn timeout_limit(&self) -> Option<Duration> {
            self.limit
        }

        fn enter(&mut self, _ctx: &mut BotContext<'_>) -> BotResult<()> {
            self.journal.lock().unwrap().push(format!("enter {}", self.name));
            Ok(())
        }

        fn exit(&mut self, _ctx: &mut BotContext<'_>) -> BotResult<()> {
            self.journal.lock().unwrap().push(format!("exit {}", self.name));
            Ok(())
        }
    }

    struct Harness {
        engine: MatchEngine,
        input: RecordingActuator,
        stats: Counters,
        clock: ManualClock,
        frame: Frame,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                engine: MatchEngine::new(
                    TemplateLibrary::new(),
                    RegionTable::new(),
                    MatchConfig::default(),
                    CaptureRegion::default(),
                ),
                input: RecordingActuator::new(),
                stats: Counters::new(),
                clock: ManualClock::new(),
                frame: noise_frame(8, 8),
            }
        }

        fn ctx(&mut self) -> BotContext<'_> {
            BotContext {
                engine: &self.engine,
                input: &mut self.input,
                stats: &mut self.stats,
                clock: &self.clock,
            }
        }
    }

    fn handle(machine: &mut StateMachine, h: &mut Harness) -> Tick {
        let frame = h.frame.clone();
        let mut ctx = h.ctx();
        machine.handle(&frame, &mut ctx)
    }

    #[test]
    fn test_set_state_hooks_and_same_state_rule() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut h = Harness::new();
        let mut machine = StateMachine::new(StateId::Starting);
        machine.add_state(StateId::Starting, Scripted::boxed("a", StateId::Idle, None, &journal));
        machine.add_state(StateId::Idle, Scripted::boxed("b", StateId::Idle, None, &journal));
        assert_eq!(machine.current(), None);

        machine.start(&mut h.ctx()).unwrap();
        assert!(!machine.set_state(StateId::Starting, false, &mut h.ctx()).unwrap());
        assert!(machine.set_state(StateId::Idle, false, &mut h.ctx()).unwrap());
        assert!(machine.set_state(StateId::Idle, true, &mut h.ctx()).unwrap());

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["enter a", "exit a", "enter b", "exit b", "enter b"]
        );
        assert_eq!(machine.current(), Some(StateId::Idle));
    }

    #[test]
    fn test_unknown_state_is_refused() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut h = Harness::new();
        let mut machine = StateMachine::new(StateId::Starting);
        machine.add_state(
            StateId::Starting,
            Scripted::boxed("a", StateId::PlayingMinigame, None, &journal),
        );
        machine.start(&mut h.ctx()).unwrap();

        let err = machine.set_state(StateId::CastingBait, false, &mut h.ctx());
        assert!(matches!(err, Err(BotError::UnknownState(StateId::CastingBait))));

        // Handler asks for an unregistered state: stay
        assert_eq!(handle(&mut machine, &mut h), Tick::Handled);
        assert_eq!(machine.current(), Some(StateId::Starting));
        assert_eq!(*journal.lock().unwrap(), vec!["enter a", "handle a #1"]);
    }

    #[test]
    fn test_unregistered_initial_state_cannot_start() {
        let mut h = Harness::new();
        let mut machine = StateMachine::new(StateId::Starting);
        assert!(machine.start(&mut h.ctx()).is_err());
        assert_eq!(handle(&mut machine, &mut h), Tick::Inactive);
    }

    #[test]
    fn test_timeout_fires_once_per_event() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut h = Harness::new();
        let mut machine = StateMachine::new(StateId::Starting);
        machine.add_state(
            StateId::Starting,
            Scripted::boxed("start", StateId::WaitingForBite, None, &journal),
        );
        machine.add_state(
            StateId::WaitingForBite,
            Scripted::boxed("wait", StateId::WaitingForBite, Some(Duration::from_secs(5)), &journal),
        );
        machine.start(&mut h.ctx()).unwrap();

        assert_eq!(handle(&mut machine, &mut h), Tick::Handled);
        assert_eq!(machine.current(), Some(StateId::WaitingForBite));

        h.clock.advance(Duration::from_secs(5));
        assert_eq!(handle(&mut machine, &mut h), Tick::Handled);
        assert_eq!(h.stats.get(TIMEOUTS), 0);

        h.clock.advance(Duration::from_millis(1));
        assert_eq!(handle(&mut machine, &mut h), Tick::TimedOut);
        assert_eq!(machine.current(), Some(StateId::Starting));
        assert_eq!(h.stats.get(TIMEOUTS), 1);
        assert_eq!(h.input.calls(), vec!["release_all", "press esc"]);
        assert_eq!(h.clock.total_slept(), RECOVERY_SETTLE);

        // Back in the initial state, the handler runs normally again
        assert_eq!(handle(&mut machine, &mut h), Tick::Handled);
        assert_eq!(h.stats.get(TIMEOUTS), 1);
        assert_eq!(machine.current(), Some(StateId::WaitingForBite));
        let handled_wait = journal
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.starts_with("handle wait"))
            .count();
        assert_eq!(handled_wait, 1);
    }

    #[test]
    fn test_forced_reset_of_initial_state_restarts_its_deadline() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut h = Harness::new();
        let mut machine = StateMachine::new(StateId::Starting);
        machine.add_state(
            StateId::Starting,
            Scripted::boxed("start", StateId::Starting, Some(Duration::from_secs(10)), &journal),
        );
        machine.start(&mut h.ctx()).unwrap();

        h.clock.advance(Duration::from_secs(11));
        assert_eq!(handle(&mut machine, &mut h), Tick::TimedOut);
        for _ in 0..20 {
            h.clock.advance(Duration::from_millis(100));
            assert_eq!(handle(&mut machine, &mut h), Tick::Handled);
        }
        assert_eq!(h.stats.get(TIMEOUTS), 1);
        assert_eq!(machine.current(), Some(StateId::Starting));
        assert_eq!(
            journal.lock().unwrap()[..3],
            ["enter start", "exit start", "enter start"]
        );
    }

    #[test]
    fn test_configured_timeouts_apply_to_undeclared_states() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut machine = StateMachine::new(StateId::Starting).with_default_timeouts(BTreeMap::from([
            (StateId::Starting, Duration::from_secs(3)),
            (StateId::Idle, Duration::ZERO),
            (StateId::Finishing, Duration::from_secs(9)),
        ]));
        machine.add_state(StateId::Starting, Scripted::boxed("s", StateId::Starting, None, &journal));
        machine.add_state(StateId::Idle, Scripted::boxed("i", StateId::Idle, None, &journal));
        machine.add_state(
            StateId::Finishing,
            Scripted::boxed("f", StateId::Finishing, Some(Duration::from_secs(2)), &journal),
        );

        assert_eq!(machine.timeout_for(StateId::Starting), Some(Duration::from_secs(3)));
        assert_eq!(machine.timeout_for(StateId::Idle), None);
        assert_eq!(machine.timeout_for(StateId::Finishing), Some(Duration::from_secs(2)));
        assert_eq!(machine.timeout_for(StateId::CastingBait), None);
    }

    #[test]
    fn test_state_without_deadline_never_times_out() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut h = Harness::new();
        let mut machine = StateMachine::new(StateId::Idle);
        machine.add_state(StateId::Idle, Scripted::boxed("idle", StateId::Idle, None, &journal));
        machine.start(&mut h.ctx()).unwrap();

        h.clock.advance(Duration::from_secs(3600));
        assert_eq!(handle(&mut machine, &mut h), Tick::Handled);
        assert_eq!(h.stats.get(TIMEOUTS), 0);
    }

    #[test]
    fn test_recovery_continues_when_release_fails() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut h = Harness::new();
        h.input.fail_release(true);
        let mut machine = StateMachine::new(StateId::Starting);
        machine.add_state(
            StateId::Starting,
            Scripted::boxed("s", StateId::Starting, Some(Duration::from_secs(1)), &journal),
        );
        machine.start(&mut h.ctx()).unwrap();

        h.clock.advance(Duration::from_secs(2));
        assert_eq!(handle(&mut machine, &mut h), Tick::TimedOut);
        assert_eq!(h.stats.get(TIMEOUTS), 1);
        assert_eq!(h.input.calls(), vec!["release_all", "press esc"]);
    }
}
