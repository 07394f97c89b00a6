use std::cell::Cell;
use std::time::Instant;

/// A monotonic millisecond counter.
///
/// The counter is 32 bits wide and wraps after roughly 49.7 days. Consumers
/// must only ever compare `now.wrapping_sub(earlier)`, never absolute values.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Milliseconds from `earlier` to `now`, correct across one wraparound.
#[inline]
pub fn elapsed_ms(earlier: u32, now: u32) -> u32 {
    now.wrapping_sub(earlier)
}

/// Clock backed by [`std::time::Instant`], counting from its creation.
#[derive(Clone, Copy, Debug)]
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
    fn now_ms(&self) -> u32 {
        // Truncation is the intended 32-bit wraparound.
        self.origin.elapsed().as_millis() as u32
    }
}

/// Clock that only moves when told to. Lets a harness step the scheduler
/// deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    pub fn starting_at(now_ms: u32) -> Self {
        Self {
            now: Cell::new(now_ms),
        }
    }

    pub fn advance(&self, ms: u32) -> u32 {
        let now = self.now.get().wrapping_add(ms);
        self.now.set(now);
        now
    }

    pub fn set(&self, now_ms: u32) {
        self.now.set(now_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}
