//! Round engine error types.

use crate::ledger::LedgerError;
use thiserror::Error;

/// Errors surfaced by round operations.
#[derive(Debug, Error)]
pub enum RoundError {
    /// Stake amount failed validation (non-positive, below minimum,
    /// above maximum, or too small to buy a single ticket)
    #[error("invalid stake: {0}")]
    InvalidStake(i64),

    /// Round is not accepting entries/bets
    #[error("round is closed")]
    RoundClosed,

    /// Cashout arrived at or after the crash
    #[error("too late, round already crashed")]
    TooLate,

    /// User already cashed out this round
    #[error("already cashed out")]
    AlreadyCashedOut,

    /// User has no position in this round
    #[error("no active bet")]
    NoActiveBet,

    /// User already holds a position in this round
    #[error("already joined this round")]
    AlreadyJoined,

    /// Ledger rejected the debit
    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Ledger dependency failure; safe to retry
    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    /// Internal consistency failure; resolution is aborted and the round
    /// frozen for inspection
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Engine actor has shut down
    #[error("engine closed")]
    EngineClosed,
}

impl From<LedgerError> for RoundError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                available,
                required,
            } => RoundError::InsufficientBalance {
                available,
                required,
            },
            other => RoundError::Ledger(other),
        }
    }
}

impl RoundError {
    /// Whether the error is an expected state conflict rather than a
    /// dependency or internal failure.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            RoundError::RoundClosed
                | RoundError::TooLate
                | RoundError::AlreadyCashedOut
                | RoundError::NoActiveBet
                | RoundError::AlreadyJoined
        )
    }
}
