//! Time sources for block timestamps and challenge expiry

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current Unix time in whole seconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock that only moves when told to. Used to exercise the challenge
/// window to the second.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    seconds: AtomicI64,
}

impl ManualTimeSource {
    pub fn new(start: i64) -> Self {
        Self {
            seconds: AtomicI64::new(start),
        }
    }

    pub fn set(&self, seconds: i64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> i64 {
        self.seconds.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_time_source() {
        let clock = ManualTimeSource::new(1_000);
        assert_eq!(clock.now(), 1_000);
        clock.advance(300);
        assert_eq!(clock.now(), 1_300);
        clock.set(5);
        assert_eq!(clock.now(), 5);
    }

    #[test]
    fn test_system_time_is_after_2020() {
        assert!(SystemTimeSource.now() > 1_577_836_800);
    }
}
