//! Postgres stake ledger adapter with a double-entry journal.
#![allow(clippy::needless_raw_string_hashes)]

use super::{
    adapter::{EntryContext, StakeLedger},
    errors::{LedgerError, LedgerResult},
    models::{Account, Cents, EntryDirection, LedgerEntry, UserId},
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;

/// Postgres-backed stake ledger.
///
/// Debits use a conditional UPDATE so the balance check and the deduction
/// are a single atomic statement; every balance change writes a journal
/// entry keyed by the caller's idempotency key.
#[derive(Clone)]
pub struct PgLedger {
    pool: Arc<PgPool>,
}

impl PgLedger {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Get full account information for a user
    pub async fn get_account(&self, user_id: UserId) -> LedgerResult<Account> {
        let row = sqlx::query(
            r#"
            SELECT user_id, balance, currency, created_at, updated_at
            FROM accounts
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(LedgerError::AccountNotFound(user_id))?;

        Ok(Account {
            user_id: row.get("user_id"),
            balance: row.get("balance"),
            currency: row.get("currency"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    /// Get journal entries for a user, newest first
    pub async fn get_entries(&self, user_id: UserId, limit: i64) -> LedgerResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, round_id, amount, balance_after, direction, kind, idempotency_key, description, created_at
            FROM ledger_entries
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        let entries = rows
            .into_iter()
            .map(|row| LedgerEntry {
                id: row.get("id"),
                user_id: row.get("user_id"),
                round_id: row.get("round_id"),
                amount: row.get("amount"),
                balance_after: row.get("balance_after"),
                direction: match row.get::<String, _>("direction").as_str() {
                    "debit" => EntryDirection::Debit,
                    _ => EntryDirection::Credit,
                },
                kind: match row.get::<String, _>("kind").as_str() {
                    "stake" => super::models::EntryKind::Stake,
                    "winnings" => super::models::EntryKind::Winnings,
                    "cashout" => super::models::EntryKind::Cashout,
                    "deposit" => super::models::EntryKind::Deposit,
                    "withdrawal" => super::models::EntryKind::Withdrawal,
                    _ => super::models::EntryKind::AdminAdjust,
                },
                idempotency_key: row.get("idempotency_key"),
                description: row.get("description"),
                created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            })
            .collect();

        Ok(entries)
    }

    async fn check_idempotency(
        tx: &mut Transaction<'_, Postgres>,
        key: &str,
    ) -> LedgerResult<()> {
        let existing = sqlx::query("SELECT id FROM ledger_entries WHERE idempotency_key = $1")
            .bind(key)
            .fetch_optional(&mut **tx)
            .await?;

        if existing.is_some() {
            return Err(LedgerError::DuplicateTransaction(key.to_string()));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_entry(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        amount: Cents,
        balance_after: Cents,
        direction: EntryDirection,
        ctx: &EntryContext,
    ) -> LedgerResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_entries (user_id, round_id, amount, balance_after, direction, kind, idempotency_key, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(ctx.round_id)
        .bind(amount)
        .bind(balance_after)
        .bind(direction.to_string())
        .bind(ctx.kind.to_string())
        .bind(&ctx.idempotency_key)
        .bind(&ctx.description)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.get("id"))
    }
}

#[async_trait]
impl StakeLedger for PgLedger {
    async fn debit(
        &self,
        user_id: UserId,
        amount: Cents,
        ctx: EntryContext,
    ) -> LedgerResult<Cents> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut tx = self.pool.begin().await?;

        Self::check_idempotency(&mut tx, &ctx.idempotency_key).await?;

        // Atomic balance check and deduction in a single statement
        let result = sqlx::query(
            "UPDATE accounts
             SET balance = balance - $1, updated_at = NOW()
             WHERE user_id = $2 AND balance >= $1
             RETURNING balance",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let new_balance: Cents = match result {
            Some(row) => row.get("balance"),
            None => {
                // Either the account doesn't exist or the balance is short
                let check = sqlx::query("SELECT balance FROM accounts WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;

                match check {
                    Some(row) => {
                        return Err(LedgerError::InsufficientBalance {
                            available: row.get("balance"),
                            required: amount,
                        });
                    }
                    None => return Err(LedgerError::AccountNotFound(user_id)),
                }
            }
        };

        Self::create_entry(
            &mut tx,
            user_id,
            -amount,
            new_balance,
            EntryDirection::Debit,
            &ctx,
        )
        .await?;

        tx.commit().await?;

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

        let mut tx = self.pool.begin().await?;

        Self::check_idempotency(&mut tx, &ctx.idempotency_key).await?;

        // Row lock so the overflow check and the update see the same balance
        let current = sqlx::query("SELECT balance FROM accounts WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::AccountNotFound(user_id))?;

        let current_balance: Cents = current.get("balance");
        let new_balance = current_balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;

        sqlx::query("UPDATE accounts SET balance = $1, updated_at = NOW() WHERE user_id = $2")
            .bind(new_balance)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        Self::create_entry(
            &mut tx,
            user_id,
            amount,
            new_balance,
            EntryDirection::Credit,
            &ctx,
        )
        .await?;

        tx.commit().await?;

        Ok(new_balance)
    }

    async fn balance(&self, user_id: UserId) -> LedgerResult<Cents> {
        Ok(self.get_account(user_id).await?.balance)
    }
}
