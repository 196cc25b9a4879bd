// Timer primitives for the manager: a fixed-period interval (like
// setInterval) and a handle for the single pending frame (like
// requestAnimationFrame). Nothing here sleeps; the host loop supplies `now`.

use std::time::{Duration, Instant};

/// Fires every `period`, first at `started + period`. A late poll fires
/// once for all the ticks it missed (like a browser's setInterval) and the
/// schedule keeps its original phase.
#[derive(Clone, Debug)]
pub struct IntervalTimer {
    period: Duration,
    next_due: Instant,
}

impl IntervalTimer {
    /// Periods under 1 ms are raised to 1 ms.
    pub fn start(period: Duration, now: Instant) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self { period, next_due: now + period }
    }

    /// When the next tick is due.
    pub fn peek(&self) -> Instant {
        self.next_due
    }

    /// If a tick is due at or before `now`, consume it (and any older missed
    /// ones) and return the latest due time.
    pub fn poll(&mut self, now: Instant) -> Option<Instant> {
        if self.next_due > now {
            return None;
        }
        let missed = (now - self.next_due).as_nanos() / self.period.as_nanos();
        let skipped = Duration::from_nanos(u64::try_from(missed * self.period.as_nanos()).unwrap_or(u64::MAX));
        let at = self.next_due + skipped;
        self.next_due = at + self.period;
        Some(at)
    }
}

/// Handle for the one scheduled frame. Dropping it cancels the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRequest(u64);

impl FrameRequest {
    /// The request that follows this one.
    pub fn next(self) -> Self {
        FrameRequest(self.0.wrapping_add(1))
    }

    pub fn first() -> Self {
        FrameRequest(1)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}
