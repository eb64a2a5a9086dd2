//! Result sink seam.
//!
//! Settled rounds are handed to a `ResultSink` for durable storage. The
//! engine treats recording as best-effort: a sink failure is logged and
//! surfaced for reconciliation, never allowed to stall settlement.

use crate::round::entities::RoundResult;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Persists completed-round results.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn record(&self, result: &RoundResult) -> anyhow::Result<()>;
}

/// In-memory sink for tests and demos.
#[derive(Default)]
pub struct MemorySink {
    results: Mutex<Vec<RoundResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self) -> Vec<RoundResult> {
        self.results.lock().await.clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn record(&self, result: &RoundResult) -> anyhow::Result<()> {
        self.results.lock().await.push(result.clone());
        Ok(())
    }
}

/// Postgres sink writing one row per settled round, payouts as JSON.
#[derive(Clone)]
pub struct PgSink {
    pool: Arc<PgPool>,
}

impl PgSink {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultSink for PgSink {
    async fn record(&self, result: &RoundResult) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO round_results (round_id, game_type, sequence, total_stake, payouts, settled_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(result.round_id)
        .bind(result.game_type.to_string())
        .bind(result.sequence as i64)
        .bind(result.total_stake)
        .bind(serde_json::to_value(&result.payouts)?)
        .bind(result.settled_at.naive_utc())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
