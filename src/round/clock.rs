//! Round clock: phase transitions driven strictly by elapsed time.
//!
//! The clock is pure so lifecycle behavior is a testable state machine
//! rather than a web of timer callbacks. The engine actor drives it from
//! a single `tokio::time` interval; the clock only decides what the
//! deadline implies.

use super::entities::RoundPhase;
use chrono::{DateTime, Utc};

/// What the clock wants done with the round at this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockVerdict {
    /// Nothing due yet.
    Hold,
    /// Betting window expired with stakes present: lock and resolve.
    Lock,
    /// Betting window expired with no stakes: discard the round and open
    /// a fresh one. No result, no settlement broadcast.
    Discard,
}

/// Pure deadline arithmetic for a round's lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct RoundClock;

impl RoundClock {
    /// Judge an open round against its deadline.
    ///
    /// Rounds past `Open` are owned by their engine's resolution path and
    /// never produce a verdict here.
    pub fn on_tick(
        phase: RoundPhase,
        phase_deadline: DateTime<Utc>,
        has_stakes: bool,
        now: DateTime<Utc>,
    ) -> ClockVerdict {
        if phase != RoundPhase::Open || now < phase_deadline {
            return ClockVerdict::Hold;
        }

        if has_stakes {
            ClockVerdict::Lock
        } else {
            ClockVerdict::Discard
        }
    }

    /// Seconds until the deadline, zero once passed.
    pub fn seconds_remaining(phase_deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
        (phase_deadline - now).num_seconds().max(0) as u64
    }
}
