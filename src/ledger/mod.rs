//! Stake ledger module providing balance management for round stakes.
//!
//! This module implements:
//! - The `StakeLedger` adapter trait consumed by the round engine
//! - Idempotency keys to prevent duplicate debits/credits
//! - A Postgres reference adapter with a double-entry journal
//! - An in-memory adapter for tests and demos
//!
//! ## Example
//!
//! ```
//! use skinpot::ledger::{EntryContext, EntryKind, MemoryLedger, StakeLedger};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = MemoryLedger::new();
//!     ledger.deposit(1, 10_000).await;
//!
//!     let ctx = EntryContext::new(Uuid::new_v4(), EntryKind::Stake, "stake_key".to_string());
//!     let new_balance = ledger.debit(1, 2_500, ctx).await?;
//!     assert_eq!(new_balance, 7_500);
//!
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;

pub use adapter::{EntryContext, StakeLedger};
pub use errors::{LedgerError, LedgerResult};
pub use memory::MemoryLedger;
pub use models::{Account, Cents, EntryDirection, EntryKind, LedgerEntry, UserId};
pub use postgres::PgLedger;
