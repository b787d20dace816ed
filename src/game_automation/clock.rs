// Time source for the control loop.
// Every pause the bot takes (frame pacing, settle delays, timeout recovery)
// goes through a Clock so the whole loop can be driven deterministically.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);

    fn sleep_secs(&self, secs: f64) {
        if secs > 0.0
            && let Ok(duration) = Duration::try_from_secs_f64(secs)
        {
            self.sleep(duration);
        }
    }
}

/// Wall clock backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when told to. Sleeping advances it instantly.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed_nanos: AtomicU64,
    slept_nanos: AtomicU64,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed_nanos: AtomicU64::new(0),
            slept_nanos: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.elapsed_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Total time spent in `sleep` calls
    pub fn total_slept(&self) -> Duration {
        Duration::from_nanos(self.slept_nanos.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.slept_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_moves_on_sleep_and_advance() {
        let clock = ManualClock::new();
        let t0 = clock.now();

        clock.sleep(Duration::from_millis(250));
        clock.advance(Duration::from_secs(1));

        assert_eq!(clock.now() - t0, Duration::from_millis(1250));
        assert_eq!(clock.total_slept(), Duration::from_millis(250));
    }

    #[test]
    fn test_sleep_secs_ignores_unrepresentable_values() {
        let clock = ManualClock::new();
        clock.sleep_secs(0.0);
        clock.sleep_secs(-1.0);
        clock.sleep_secs(f64::NAN);
        clock.sleep_secs(1e30);
        assert_eq!(clock.total_slept(), Duration::ZERO);
    }
}
