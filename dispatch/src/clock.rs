//! Latency measurement.
//!
//! The dispatcher reads the clock exactly twice per completed call: once
//! before running the implementation and once after. A call whose
//! implementation fails never takes the second reading.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Source of elapsed-time measurements.
pub trait Clock {
    /// Opaque start reading.
    type Stamp;

    /// Take a start reading.
    fn now(&mut self) -> Self::Stamp;

    /// Time elapsed since `since`.
    fn elapsed(&mut self, since: Self::Stamp) -> Duration;
}

/// Monotonic wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Stamp = Instant;

    fn now(&mut self) -> Instant {
        Instant::now()
    }

    fn elapsed(&mut self, since: Instant) -> Duration {
        since.elapsed()
    }
}

/// Replays a fixed sequence of latencies.
///
/// Each completed call consumes one entry. Once the script runs out, every
/// further call measures `fallback` (zero unless set).
#[derive(Debug, Clone, Default)]
pub struct ScriptedClock {
    script: VecDeque<Duration>,
    fallback: Duration,
}

impl ScriptedClock {
    pub fn new(latencies: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            script: latencies.into_iter().collect(),
            fallback: Duration::ZERO,
        }
    }

    /// Script from whole milliseconds.
    pub fn from_millis(latencies: impl IntoIterator<Item = u64>) -> Self {
        Self::new(latencies.into_iter().map(Duration::from_millis))
    }

    /// Every call measures `latency`.
    pub fn constant(latency: Duration) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: latency,
        }
    }

    /// Latency reported after the script is exhausted.
    pub fn with_fallback(mut self, latency: Duration) -> Self {
        self.fallback = latency;
        self
    }

    /// Append latencies to the end of the script.
    pub fn push(&mut self, latencies: impl IntoIterator<Item = Duration>) {
        self.script.extend(latencies);
    }

    /// Scripted entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Clock for ScriptedClock {
    type Stamp = ();

    fn now(&mut self) {}

    fn elapsed(&mut self, _since: ()) -> Duration {
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_clock_replays_in_order() {
        let mut clock = ScriptedClock::from_millis([3, 5]);
        clock.now();
        assert_eq!(clock.elapsed(()), Duration::from_millis(3));
        assert_eq!(clock.elapsed(()), Duration::from_millis(5));
        assert_eq!(clock.elapsed(()), Duration::ZERO);
        assert_eq!(clock.remaining(), 0);
    }

    #[test]
    fn test_scripted_clock_fallback() {
        let mut clock = ScriptedClock::from_millis([1]).with_fallback(Duration::from_millis(9));
        assert_eq!(clock.elapsed(()), Duration::from_millis(1));
        assert_eq!(clock.elapsed(()), Duration::from_millis(9));
        assert_eq!(clock.elapsed(()), Duration::from_millis(9));

        let mut constant = ScriptedClock::constant(Duration::from_millis(2));
        assert_eq!(constant.elapsed(()), Duration::from_millis(2));
    }

    #[test]
    fn test_scripted_clock_push() {
        let mut clock = ScriptedClock::default();
        clock.push([Duration::from_millis(7)]);
        assert_eq!(clock.remaining(), 1);
        assert_eq!(clock.elapsed(()), Duration::from_millis(7));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let mut clock = SystemClock;
        let start = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.elapsed(start) >= Duration::from_millis(2));
    }
}
