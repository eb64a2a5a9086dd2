//! Stake ledger adapter trait.

use super::{
    errors::LedgerResult,
    models::{Cents, EntryKind, UserId},
};
use async_trait::async_trait;
use uuid::Uuid;

/// Balance effect of a round operation, passed through to the journal.
#[derive(Debug, Clone)]
pub struct EntryContext {
    pub round_id: Option<Uuid>,
    pub kind: EntryKind,
    pub idempotency_key: String,
    pub description: Option<String>,
}

impl EntryContext {
    pub fn new(round_id: Uuid, kind: EntryKind, idempotency_key: String) -> Self {
        Self {
            round_id: Some(round_id),
            kind,
            idempotency_key,
            description: None,
        }
    }
}

/// Stake ledger adapter.
///
/// The round engine debits a user's balance before recording their
/// entry/participant, and credits winnings/cashouts after the mutation
/// commits. Implementations must apply each call atomically: either the
/// balance change and its journal entry both land, or neither does. The
/// idempotency key guards against double application under retry.
#[async_trait]
pub trait StakeLedger: Send + Sync {
    /// Debit `amount` cents from the user's balance.
    ///
    /// Returns the new balance. Fails with `InsufficientBalance` without
    /// applying any change when the balance cannot cover the amount.
    async fn debit(&self, user_id: UserId, amount: Cents, ctx: EntryContext)
    -> LedgerResult<Cents>;

    /// Credit `amount` cents to the user's balance.
    ///
    /// Returns the new balance. Fails with `BalanceOverflow` when the
    /// resulting balance would exceed `i64::MAX`.
    async fn credit(
        &self,
        user_id: UserId,
        amount: Cents,
        ctx: EntryContext,
    ) -> LedgerResult<Cents>;

    /// Get the user's current balance.
    async fn balance(&self, user_id: UserId) -> LedgerResult<Cents>;
}
