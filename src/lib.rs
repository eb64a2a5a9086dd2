//! # Skinpot
//!
//! A round engine for skin-stake jackpot and crash games, built around a
//! per-game-type actor that owns the active round and serializes every
//! mutation through its inbox.
//!
//! ## Round lifecycle
//!
//! Every round moves forward-only through four phases:
//!
//! - **Open**: the betting window; joins and bets are accepted
//! - **Locked**: no new stakes; crash rounds fly, jackpot rounds draw
//! - **Resolving**: the outcome is fixed, payouts are being applied
//! - **Settled**: the result is recorded and announced
//!
//! Jackpot stakes buy contiguous half-open ticket ranges in join order
//! and a seeded draw picks the winning ticket. Crash rounds commit their
//! crash point at creation from the same seeded RNG and pay each
//! participant at the multiplier they cashed out at, or nothing.
//!
//! ## Core Modules
//!
//! - [`round`]: Pure round state machines, clock verdicts, and fairness
//! - [`engine`]: Round actors, the registry, and engine configuration
//! - [`ledger`]: Idempotent double-entry stake accounting
//! - [`broadcast`]: Per-game-type event fan-out to subscribers
//!
//! ## Example
//!
//! ```no_run
//! use skinpot::{EngineConfig, GameType, MemoryLedger, MemorySink, RoundRegistry};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), skinpot::RoundError> {
//! let registry = RoundRegistry::new(
//!     EngineConfig::default(),
//!     Arc::new(MemoryLedger::new()),
//!     Arc::new(MemorySink::new()),
//! )
//! .expect("default config is valid");
//!
//! let receipt = registry.join(GameType::Jackpot, 1, 1_000).await?;
//! println!("bought tickets {:?}", receipt.tickets);
//! # Ok(())
//! # }
//! ```

/// Event fan-out to round subscribers.
pub mod broadcast;
pub use broadcast::{RoundBroadcaster, RoundEvent, SubscriberId};

/// Round actors, registry, and configuration.
pub mod engine;
pub use engine::{CashoutReceipt, EngineConfig, JoinReceipt, RoundHandle, RoundRegistry};

/// Stake accounting with idempotent debits and credits.
pub mod ledger;
pub use ledger::{
    Cents, EntryContext, EntryKind, LedgerError, MemoryLedger, PgLedger, StakeLedger, UserId,
};

/// Skin valuation at stake time.
pub mod pricing;
pub use pricing::{SkinPricing, StakeItem, StaticPriceSheet};

/// Pure round state machines and fairness primitives.
pub mod round;
pub use round::{
    CrashRound, JackpotRound, RoundClock, RoundError, RoundView, SeededRng,
    entities::{GameType, RoundId, RoundPhase, RoundResult},
};

/// Settled-round persistence.
pub mod sink;
pub use sink::{MemorySink, PgSink, ResultSink};
