/// Time sources for the host driver
///
/// The registry never reads a clock itself; the driver samples a `Clock`
/// and advances the registry by the elapsed delta.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// Source of the host's notion of "now", in seconds since the clock's origin
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send {
    fn now(&self) -> f64;
}

/// Real monotonic time
///
/// Built on `tokio::time::Instant` so a paused tokio runtime controls it.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock for deterministic replays
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the driver.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward; negative or non-finite steps are ignored
    pub fn advance(&self, secs: f64) {
        if !secs.is_finite() || secs <= 0.0 {
            return;
        }
        let next = self.now() + secs;
        self.bits.store(next.to_bits(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();

        clock.advance(1.5);
        other.advance(0.5);

        assert_eq!(clock.now(), 2.0);
        assert_eq!(other.now(), 2.0);
    }

    #[test]
    fn test_manual_clock_ignores_backwards_steps() {
        let clock = ManualClock::new();
        clock.advance(3.0);
        clock.advance(-1.0);
        clock.advance(f64::NAN);

        assert_eq!(clock.now(), 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_clock_follows_tokio_time() {
        let clock = MonotonicClock::new();
        tokio::time::advance(std::time::Duration::from_millis(1500)).await;

        let now = clock.now();
        assert!((now - 1.5).abs() < 1e-6, "got {}", now);
    }
}
