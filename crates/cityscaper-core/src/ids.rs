//! Identity and time services the session depends on.
//!
//! Hosts can substitute their own implementations; the defaults are a
//! process-local counter and the system clock.

use chrono::{DateTime, SubsecRound, Utc};

// ─── Id generation ───────────────────────────────────────────────────────────

/// Source of node ids that are unique within a session.
pub trait IdGenerator {
  fn generate(&mut self) -> String;

  /// Note an id that entered the session from outside (e.g. a save file) so
  /// that future ids never collide with it.
  fn observe(&mut self, _id: &str) {}
}

/// Strictly increasing decimal ids, starting at 1.
#[derive(Debug, Clone)]
pub struct CounterIdGenerator {
  next: u64,
}

impl Default for CounterIdGenerator {
  fn default() -> Self { Self { next: 1 } }
}

impl CounterIdGenerator {
  pub fn starting_at(next: u64) -> Self { Self { next } }
}

impl IdGenerator for CounterIdGenerator {
  fn generate(&mut self) -> String {
    let id = self.next;
    self.next += 1;
    id.to_string()
  }

  fn observe(&mut self, id: &str) {
    if let Ok(n) = id.parse::<u64>()
      && n >= self.next
    {
      self.next = n + 1;
    }
  }
}

// ─── Clock ───────────────────────────────────────────────────────────────────

pub trait Clock {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, truncated to the 100 ns resolution of persisted ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now().trunc_subsecs(7) }
}

/// A clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> { self.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counter_is_strictly_increasing() {
    let mut ids = CounterIdGenerator::default();
    assert_eq!(ids.generate(), "1");
    assert_eq!(ids.generate(), "2");
  }

  #[test]
  fn observe_skips_past_loaded_ids() {
    let mut ids = CounterIdGenerator::default();
    ids.observe("41");
    ids.observe("c1");
    ids.observe("7");
    assert_eq!(ids.generate(), "42");
  }

  #[test]
  fn system_clock_has_tick_resolution() {
    let now = SystemClock.now();
    assert_eq!(now.timestamp_subsec_nanos() % 100, 0);
  }
}
