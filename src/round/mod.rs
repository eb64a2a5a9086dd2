//! Round core: entities, clock, fairness, and the two game engines.
//!
//! Everything here is pure, synchronous state. The engines never touch
//! channels, sockets, or the ledger; they are driven by the actor in
//! [`crate::engine`], which owns the single active round per game type
//! and serializes every mutation through its event loop.

pub mod clock;
pub mod crash;
pub mod entities;
pub mod errors;
pub mod fairness;
pub mod jackpot;

pub use clock::{ClockVerdict, RoundClock};
pub use crash::{CashoutOutcome, CrashRound, CrashTick};
pub use entities::{
    Entry, GameType, Multiplier, Participant, Payout, RoundCore, RoundId, RoundPhase, RoundResult,
    RoundView, StakeView,
};
pub use errors::RoundError;
pub use fairness::{RoundRng, SeededRng};
pub use jackpot::{JackpotOutcome, JackpotRound};
