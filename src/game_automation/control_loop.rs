// Control loop: capture -> interceptors -> state machine -> pacing
use super::clock::Clock;
use super::error::BotResult;
use super::flags::ControlFlags;
use super::fsm::{BotContext, StateMachine, Tick};
use super::interceptor::InterceptorChain;
use super::match_image::MatchEngine;
use super::stats::Counters;
use crate::device::{FrameSource, InputActuator};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often flags are re-read while paused
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Bot-specific start and stop behaviour
pub trait BotHooks: Send {
    fn on_start(&mut self, _ctx: &mut BotContext<'_>) {}

    /// Runs once when the loop stops
    fn on_stop(&mut self, stats: &Counters) {
        println!("{stats}");
    }
}

/// Everything that makes up one bot, ready to be driven by a [`ControlLoop`]
pub struct Bot {
    pub name: &'static str,
    pub machine: StateMachine,
    pub interceptors: InterceptorChain,
    pub stats: Counters,
    pub hooks: Box<dyn BotHooks>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopSettings {
    /// Iterations per second, 0 for as fast as possible
    pub target_rate: f32,
    /// Stop on our own after this long
    pub run_for: Option<Duration>,
}

impl LoopSettings {
    pub fn frame_period(&self) -> Option<Duration> {
        if self.target_rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / self.target_rate as f64).ok()
        } else {
            None
        }
    }
}

/// Outcome of a single iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// An interceptor consumed the frame
    Intercepted,
    /// The state machine saw the frame
    Handled(Tick),
    /// No frame this time; the error was logged
    CaptureFailed,
    /// The loop has already been stopped
    Stopped,
}

/// Why [`ControlLoop::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Stopped,
    ReturnToMenu,
    TimeLimit,
}

pub struct ControlLoop {
    bot: Bot,
    engine: MatchEngine,
    source: Box<dyn FrameSource>,
    input: Box<dyn InputActuator>,
    clock: Arc<dyn Clock>,
    flags: ControlFlags,
    settings: LoopSettings,
    started: bool,
    stopped: bool,
}

impl ControlLoop {
    pub fn new(
        bot: Bot,
        engine: MatchEngine,
        source: Box<dyn FrameSource>,
        input: Box<dyn InputActuator>,
        clock: Arc<dyn Clock>,
        flags: ControlFlags,
        settings: LoopSettings,
    ) -> Self {
        Self {
            bot,
            engine,
            source,
            input,
            clock,
            flags,
            settings,
            started: false,
            stopped: false,
        }
    }

    /// Run the start hook and enter the initial state. Called by `run`;
    /// only needed directly when driving the loop with `run_once`.
    pub fn start(&mut self) -> BotResult<()> {
        if self.started {
            return Ok(());
        }
        log::info!("🤖 {} bot ready!", self.bot.name);

        let Bot {
            machine,
            stats,
            hooks,
            ..
        } = &mut self.bot;
        let mut ctx = BotContext {
            engine: &self.engine,
            input: self.input.as_mut(),
            stats,
            clock: self.clock.as_ref(),
        };
        hooks.on_start(&mut ctx);
        machine.start(&mut ctx)?;
        self.started = true;
        Ok(())
    }

    /// One iteration: capture, offer the frame to the interceptors, let the
    /// state machine handle it if none took it, then sleep out the rest of
    /// the frame period.
    pub fn run_once(&mut self) -> Iteration {
        if self.stopped {
            return Iteration::Stopped;
        }
        let began = self.clock.now();

        let region = self.engine.capture_region();
        let outcome = match self.source.capture(&region) {
            Ok(frame) => {
                let Bot {
                    machine,
                    interceptors,
                    stats,
                    ..
                } = &mut self.bot;
                let mut ctx = BotContext {
                    engine: &self.engine,
                    input: self.input.as_mut(),
                    stats,
                    clock: self.clock.as_ref(),
                };

                if interceptors.dispatch(&frame, &mut ctx) {
                    log::debug!("🛡️ Frame #{} consumed by an interceptor", frame.index());
                    Iteration::Intercepted
                } else {
                    Iteration::Handled(machine.handle(&frame, &mut ctx))
                }
            }
            Err(e) => {
                log::error!("❌ Capture failed: {e}");
                Iteration::CaptureFailed
            }
        };

        self.pace(began);
        outcome
    }

    fn pace(&self, began: Instant) {
        let Some(period) = self.settings.frame_period() else {
            return;
        };
        let spent = self.clock.now().saturating_duration_since(began);
        let remaining = period.saturating_sub(spent);
        if !remaining.is_zero() {
            self.clock.sleep(remaining);
        }
    }

    /// Drive the bot until a stop, a return to the menu, or the time limit.
    /// Flags are read once per iteration.
    pub fn run(&mut self) -> BotResult<LoopExit> {
        self.start()?;
        let began = self.clock.now();

        let exit = loop {
            if self.flags.stop_requested() {
                break LoopExit::Stopped;
            }
            if self.flags.menu_requested() {
                break LoopExit::ReturnToMenu;
            }
            if let Some(limit) = self.settings.run_for
                && self.clock.now().saturating_duration_since(began) >= limit
            {
                log::info!("⏰ Time limit of {}s reached", limit.as_secs());
                break LoopExit::TimeLimit;
            }
            if self.flags.is_paused() {
                self.clock.sleep(PAUSE_POLL);
                continue;
            }
            if self.run_once() == Iteration::Stopped {
                break LoopExit::Stopped;
            }
        };

        self.stop();
        Ok(exit)
    }

    /// Stop the bot. Only the first call has any effect: it runs the stop
    /// hook, then releases every held input. A failing release is logged.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        log::info!("🛑 Shutting down {} bot...", self.bot.name);
        self.stopped = true;
        self.bot.hooks.on_stop(&self.bot.stats);

        if let Err(e) = self.input.release_all() {
            log::error!("❌ Failed to release controls: {e}");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn stats(&self) -> &Counters {
        &self.bot.stats
    }

    pub fn machine(&self) -> &StateMachine {
        &self.bot.machine
    }

    pub fn interceptors_mut(&mut self) -> &mut InterceptorChain {
        &mut self.bot.interceptors
    }

    pub fn flags(&self) -> &ControlFlags {
        &self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::CaptureRegion;
    use crate::game_automation::clock::ManualClock;
    use crate::game_automation::error::BotError;
    use crate::game_automation::fsm::State;
    use crate::game_automation::interceptor::Interceptor;
    use crate::game_automation::match_image::{MatchConfig, RegionTable, TemplateLibrary};
    use crate::game_automation::testing::{RecordingActuator, ScriptedSource, noise_frame};
    use crate::game_automation::types::StateId;
    use crate::device::Frame;
    use std::sync::Mutex;

    /// Stays put and counts how often it handled a frame; optionally burns time
    struct Busy {
        cost: Duration,
        seen: Arc<Mutex<u32>>,
    }

    impl State for Busy {
        fn handle(&mut self, _frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<StateId> {
            *self.seen.lock().unwrap() += 1;
            ctx.clock.sleep(self.cost);
            Ok(StateId::Starting)
        }
    }

    struct Always {
        executed: Arc<Mutex<u32>>,
    }

    impl Interceptor for Always {
        fn name(&self) -> &str {
            "always"
        }

        fn check(&mut self, _frame: &Frame, _ctx: &mut BotContext<'_>) -> bool {
            true
        }

        fn execute(&mut self, _frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<()> {
            *self.executed.lock().unwrap() += 1;
            ctx.input.press("enter")?;
            Ok(())
        }
    }

    struct CountingHooks {
        stops: Arc<Mutex<Vec<u64>>>,
    }

    impl BotHooks for CountingHooks {
        fn on_stop(&mut self, stats: &Counters) {
            self.stops.lock().unwrap().push(stats.get("cycles"));
        }
    }

    struct Fixture {
        clock: Arc<ManualClock>,
        input: RecordingActuator,
        seen: Arc<Mutex<u32>>,
        stops: Arc<Mutex<Vec<u64>>>,
        flags: ControlFlags,
    }

    fn fixture() -> Fixture {
        Fixture {
            clock: Arc::new(ManualClock::new()),
            input: RecordingActuator::new(),
            seen: Arc::new(Mutex::new(0)),
            stops: Arc::new(Mutex::new(Vec::new())),
            flags: ControlFlags::new(),
        }
    }

    fn build(f: &Fixture, cost: Duration, settings: LoopSettings, source: ScriptedSource) -> ControlLoop {
        let mut machine = StateMachine::new(StateId::Starting);
        machine.add_state(
            StateId::Starting,
            Box::new(Busy {
                cost,
                seen: Arc::clone(&f.seen),
            }),
        );
        let bot = Bot {
            name: "test",
            machine,
            interceptors: InterceptorChain::new(),
            stats: Counters::new(),
            hooks: Box::new(CountingHooks {
                stops: Arc::clone(&f.stops),
            }),
        };
        let engine = MatchEngine::new(
            TemplateLibrary::new(),
            RegionTable::new(),
            MatchConfig::default(),
            CaptureRegion::new(0, 0, 16, 16),
        );
        let clock: Arc<dyn Clock> = f.clock.clone();
        ControlLoop::new(
            bot,
            engine,
            Box::new(source),
            Box::new(f.input.clone()),
            clock,
            f.flags.clone(),
            settings,
        )
    }

    fn frames() -> ScriptedSource {
        ScriptedSource::repeating(noise_frame(16, 16))
    }

    #[test]
    fn test_paces_to_target_rate() {
        let f = fixture();
        let settings = LoopSettings {
            target_rate: 10.0,
            run_for: None,
        };
        let mut bot = build(&f, Duration::from_millis(30), settings, frames());
        bot.start().unwrap();

        assert_eq!(bot.run_once(), Iteration::Handled(Tick::Handled));
        // 30 ms of work, 70 ms of sleep
        assert_eq!(f.clock.total_slept(), Duration::from_millis(100));
    }

    #[test]
    fn test_overrun_does_not_sleep() {
        let f = fixture();
        let settings = LoopSettings {
            target_rate: 10.0,
            run_for: None,
        };
        let mut bot = build(&f, Duration::from_millis(250), settings, frames());
        bot.start().unwrap();

        bot.run_once();
        assert_eq!(f.clock.total_slept(), Duration::from_millis(250));
    }

    #[test]
    fn test_unlimited_rate_never_sleeps() {
        let f = fixture();
        let mut bot = build(&f, Duration::ZERO, LoopSettings::default(), frames());
        bot.start().unwrap();

        for _ in 0..5 {
            bot.run_once();
        }
        assert_eq!(*f.seen.lock().unwrap(), 5);
        assert_eq!(f.clock.total_slept(), Duration::ZERO);
    }

    #[test]
    fn test_interceptor_hides_frame_from_state_machine() {
        let f = fixture();
        let mut bot = build(&f, Duration::ZERO, LoopSettings::default(), frames());
        let executed = Arc::new(Mutex::new(0));
        bot.interceptors_mut().add(
            10,
            Box::new(Always {
                executed: Arc::clone(&executed),
            }),
        );
        bot.start().unwrap();

        assert_eq!(bot.run_once(), Iteration::Intercepted);
        assert_eq!(*executed.lock().unwrap(), 1);
        assert_eq!(*f.seen.lock().unwrap(), 0);
        assert_eq!(f.input.calls(), vec!["press enter"]);
    }

    #[test]
    fn test_capture_failure_is_not_fatal() {
        let f = fixture();
        let source = ScriptedSource::failing_then(2, noise_frame(16, 16));
        let mut bot = build(&f, Duration::ZERO, LoopSettings::default(), source);
        bot.start().unwrap();

        assert_eq!(bot.run_once(), Iteration::CaptureFailed);
        assert_eq!(bot.run_once(), Iteration::CaptureFailed);
        assert_eq!(bot.run_once(), Iteration::Handled(Tick::Handled));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let f = fixture();
        let mut bot = build(&f, Duration::ZERO, LoopSettings::default(), frames());
        bot.start().unwrap();
        bot.run_once();

        bot.stop();
        bot.stop();

        assert!(bot.is_stopped());
        assert_eq!(*f.stops.lock().unwrap(), vec![0]);
        assert_eq!(f.input.calls(), vec!["release_all"]);
        assert_eq!(bot.run_once(), Iteration::Stopped);
    }

    #[test]
    fn test_stop_completes_when_release_fails() {
        let f = fixture();
        f.input.fail_release(true);
        let mut bot = build(&f, Duration::ZERO, LoopSettings::default(), frames());

        bot.stop();
        assert!(bot.is_stopped());
        assert_eq!(f.stops.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_run_honours_time_limit() {
        let f = fixture();
        let settings = LoopSettings {
            target_rate: 10.0,
            run_for: Some(Duration::from_secs(1)),
        };
        let mut bot = build(&f, Duration::ZERO, settings, frames());

        assert_eq!(bot.run().unwrap(), LoopExit::TimeLimit);
        assert_eq!(*f.seen.lock().unwrap(), 10);
        assert!(bot.is_stopped());
        assert_eq!(f.stops.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_run_stays_idle_while_paused() {
        let f = fixture();
        f.flags.set_paused(true);
        let settings = LoopSettings {
            target_rate: 0.0,
            run_for: Some(Duration::from_secs(2)),
        };
        let mut bot = build(&f, Duration::ZERO, settings, frames());

        assert_eq!(bot.run().unwrap(), LoopExit::TimeLimit);
        assert_eq!(*f.seen.lock().unwrap(), 0);
        assert_eq!(f.clock.total_slept(), Duration::from_secs(2));
    }

    #[test]
    fn test_run_exits_on_flags() {
        let f = fixture();
        f.flags.request_menu();
        let mut bot = build(&f, Duration::ZERO, LoopSettings::default(), frames());
        assert_eq!(bot.run().unwrap(), LoopExit::ReturnToMenu);

        let f = fixture();
        f.flags.request_stop();
        let mut bot = build(&f, Duration::ZERO, LoopSettings::default(), frames());
        assert_eq!(bot.run().unwrap(), LoopExit::Stopped);
        assert_eq!(*f.seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_run_fails_without_initial_state() {
        let f = fixture();
        let mut bot = build(&f, Duration::ZERO, LoopSettings::default(), frames());
        bot.bot.machine = StateMachine::new(StateId::Idle);
        assert!(matches!(bot.run(), Err(BotError::UnknownState(StateId::Idle))));
    }
}
