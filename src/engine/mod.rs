//! Actor-based round engine.
//!
//! Each game type gets one long-lived actor that owns the active round,
//! drives its clock, settles it through the ledger, and broadcasts state
//! to subscribers. The [`RoundRegistry`] spawns actors on demand and is
//! the entry point callers should hold.

pub mod actor;
pub mod config;
pub mod messages;
pub mod registry;

pub use actor::{RoundActor, RoundHandle, RoundHistory};
pub use config::EngineConfig;
pub use messages::{CashoutReceipt, JoinReceipt, RoundMessage};
pub use registry::RoundRegistry;
