//! In-memory stake ledger for tests and demos.

use super::{
    adapter::{EntryContext, StakeLedger},
    errors::{LedgerError, LedgerResult},
    models::{Cents, UserId},
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    balances: HashMap<UserId, Cents>,
    used_keys: HashSet<String>,
}

/// In-memory ledger with the same atomicity and idempotency contract as
/// the Postgres adapter. Accounts are created on first deposit.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's balance directly (test setup).
    pub async fn deposit(&self, user_id: UserId, amount: Cents) {
        let mut state = self.state.lock().await;
        *state.balances.entry(user_id).or_insert(0) += amount;
    }
}

#[async_trait]
impl StakeLedger for MemoryLedger {
    async fn debit(
        &self,
        user_id: UserId,
        amount: Cents,
        ctx: EntryContext,
    ) -> LedgerResult<Cents> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut state = self.state.lock().await;
        if state.used_keys.contains(&ctx.idempotency_key) {
            return Err(LedgerError::DuplicateTransaction(ctx.idempotency_key));
        }

        let balance = state
            .balances
            .get(&user_id)
            .copied()
            .ok_or(LedgerError::AccountNotFound(user_id))?;

        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                available: balance,
                required: amount,
            });
        }

        let new_balance = balance - amount;
        state.balances.insert(user_id, new_balance);
        state.used_keys.insert(ctx.idempotency_key);

        Ok(new_balance)
    }

    async fn credit(
        &self,
        user_id: UserId,
        amount: Cents,
        ctx: EntryContext,
    ) -> LedgerResult<Cents> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut state = self.state.lock().await;
        if state.used_keys.contains(&ctx.idempotency_key) {
            return Err(LedgerError::DuplicateTransaction(ctx.idempotency_key));
        }

        let balance = state
            .balances
            .get(&user_id)
            .copied()
            .ok_or(LedgerError::AccountNotFound(user_id))?;

        let new_balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        state.balances.insert(user_id, new_balance);
        state.used_keys.insert(ctx.idempotency_key);

        Ok(new_balance)
    }

    async fn balance(&self, user_id: UserId) -> LedgerResult<Cents> {
        let state = self.state.lock().await;
        state
            .balances
            .get(&user_id)
            .copied()
            .ok_or(LedgerError::AccountNotFound(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::models::EntryKind;
    use uuid::Uuid;

    fn ctx(key: &str) -> EntryContext {
        EntryContext::new(Uuid::new_v4(), EntryKind::Stake, key.to_string())
    }

    #[tokio::test]
    async fn debit_requires_sufficient_balance() {
        let ledger = MemoryLedger::new();
        ledger.deposit(1, 500).await;

        let err = ledger.debit(1, 1_000, ctx("k1")).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                available: 500,
                required: 1_000
            }
        ));

        // Failed debit leaves the balance untouched
        assert_eq!(ledger.balance(1).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn idempotency_key_rejects_replay() {
        let ledger = MemoryLedger::new();
        ledger.deposit(1, 1_000).await;

        ledger.debit(1, 100, ctx("dup")).await.unwrap();
        let err = ledger.debit(1, 100, ctx("dup")).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateTransaction(_)));
        assert_eq!(ledger.balance(1).await.unwrap(), 900);
    }

    #[tokio::test]
    async fn credit_checks_overflow() {
        let ledger = MemoryLedger::new();
        ledger.deposit(1, i64::MAX - 10).await;

        let err = ledger.credit(1, 100, ctx("over")).await.unwrap_err();
        assert!(matches!(err, LedgerError::BalanceOverflow));
    }
}
