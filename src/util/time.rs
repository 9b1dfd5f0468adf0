//! Time utilities for combat validation

use std::time::Instant;

/// Server start time for uptime tracking and the monotonic combat clock
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Source of monotonic time in seconds.
///
/// Fire timing, cooldowns and the client desync check all read from the
/// same clock so they can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Seconds elapsed since `init_server_time`
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        SERVER_START.get_or_init(Instant::now).elapsed().as_secs_f64()
    }
}

/// Manually advanced clock
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock {
    now: parking_lot::Mutex<f64>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: parking_lot::Mutex::new(start),
        }
    }

    pub fn set(&self, t: f64) {
        *self.now.lock() = t;
    }

    pub fn advance(&self, dt: f64) {
        *self.now.lock() += dt;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(10.0);
        clock.advance(0.25);
        assert!((clock.now() - 10.25).abs() < 1e-9);
        clock.set(3.0);
        assert_eq!(clock.now(), 3.0);
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        init_server_time();
        let a = MonotonicClock.now();
        let b = MonotonicClock.now();
        assert!(b >= a);
    }
}
