// Priority interceptors: conditions that take over a frame before the active state sees it
use super::error::BotResult;
use super::fsm::BotContext;
use crate::device::Frame;

pub trait Interceptor: Send {
    fn name(&self) -> &str;

    /// Whether this interceptor wants the frame
    fn check(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> bool;

    /// Act on a frame `check` accepted
    fn execute(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> BotResult<()>;
}

/// Handle returned by [`InterceptorChain::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

struct Entry {
    id: InterceptorId,
    priority: i32,
    enabled: bool,
    interceptor: Box<dyn Interceptor>,
}

/// Interceptors kept sorted by descending priority. Equal priorities stay
/// in the order they were added.
#[derive(Default)]
pub struct InterceptorChain {
    entries: Vec<Entry>,
    next_id: u64,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, priority: i32, interceptor: Box<dyn Interceptor>) -> InterceptorId {
        let id = InterceptorId(self.next_id);
        self.next_id += 1;

        log::debug!("🛡️ Interceptor '{}' added (priority {priority})", interceptor.name());
        let at = self.entries.partition_point(|entry| entry.priority >= priority);
        self.entries.insert(
            at,
            Entry {
                id,
                priority,
                enabled: true,
                interceptor,
            },
        );
        id
    }

    pub fn remove(&mut self, id: InterceptorId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn set_enabled(&mut self, id: InterceptorId, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: InterceptorId) -> Option<bool> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.enabled)
    }

    /// Names in evaluation order
    pub fn names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.interceptor.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offer the frame to enabled interceptors, highest priority first.
    /// The first whose check passes executes and the frame counts as handled,
    /// even when its action fails.
    pub fn dispatch(&mut self, frame: &Frame, ctx: &mut BotContext<'_>) -> bool {
        for entry in self.entries.iter_mut().filter(|entry| entry.enabled) {
            if !entry.interceptor.check(frame, ctx) {
                continue;
            }

            log::debug!("🛡️ Interceptor '{}' took the frame", entry.interceptor.name());
            if let Err(e) = entry.interceptor.execute(frame, ctx) {
                log::error!("❌ Interceptor '{}' failed: {e}", entry.interceptor.name());
            }
            return true;
        }
        false
    }
}
