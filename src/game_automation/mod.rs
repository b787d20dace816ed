// Game automation module
// Template matching, the timeout-aware state machine, priority interceptors
// and the control loop that drives them frame by frame.

pub mod clock;
pub mod control_loop;
pub mod error;
pub mod flags;
pub mod fsm;
pub mod interceptor;
pub mod match_image;
pub mod stats;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the main types and functions for easy access
pub use clock::{Clock, ManualClock, SystemClock};
pub use control_loop::{Bot, BotHooks, ControlLoop, Iteration, LoopExit, LoopSettings};
pub use error::{BotError, BotResult};
pub use flags::ControlFlags;
pub use fsm::{BotContext, State, StateMachine, Tick};
pub use interceptor::{Interceptor, InterceptorChain, InterceptorId};
pub use match_image::{
    LoadReport, MAX_SEARCH_RADIUS, MatchConfig, MatchEngine, MatchResult, RegionTable, Roi,
    RoiSpec, Template, TemplateLibrary,
};
pub use stats::Counters;
pub use types::StateId;
