//! Engine configuration models.

use crate::round::entities::GameType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Round engine configuration, shared by both game types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Betting window for jackpot rounds, seconds
    pub jackpot_window_secs: u64,

    /// Betting window for crash rounds, seconds
    pub crash_window_secs: u64,

    /// Cooldown between a settled round and the next open round, seconds
    pub cooldown_secs: u64,

    /// Jackpot clock tick interval, milliseconds
    pub jackpot_tick_ms: u64,

    /// Crash clock tick interval (multiplier advance), milliseconds
    pub crash_tick_ms: u64,

    /// Jackpot tickets per whole currency unit (100 cents)
    pub tickets_per_unit: u64,

    /// Crash house edge in basis points (400 = 4%)
    pub house_edge_bps: u16,

    /// Crash multiplier growth rate per second of flying time
    pub growth_rate: f64,

    /// Minimum stake in cents
    pub min_stake: i64,

    /// Maximum stake in cents
    pub max_stake: i64,

    /// Per-subscriber broadcast channel capacity
    pub broadcast_capacity: usize,

    /// Settled rounds retained in the in-memory history
    pub history_capacity: usize,

    /// Server nonce mixed into every per-round fairness seed
    pub seed_nonce: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            jackpot_window_secs: 30,
            crash_window_secs: 15,
            cooldown_secs: 5,
            jackpot_tick_ms: 1_000,
            crash_tick_ms: 100,
            tickets_per_unit: 100,
            house_edge_bps: 400,
            growth_rate: 0.06,
            min_stake: 10,
            max_stake: 10_000_00,
            broadcast_capacity: 64,
            history_capacity: 256,
            seed_nonce: "change-me".to_string(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.jackpot_window_secs == 0 || self.crash_window_secs == 0 {
            return Err("Betting windows must be positive".to_string());
        }

        if self.jackpot_tick_ms == 0 || self.crash_tick_ms == 0 {
            return Err("Tick intervals must be positive".to_string());
        }

        if self.tickets_per_unit == 0 {
            return Err("Tickets per unit must be positive".to_string());
        }

        if self.house_edge_bps > 1_000 {
            return Err("House edge must be at most 10%".to_string());
        }

        if self.growth_rate <= 0.0 {
            return Err("Growth rate must be positive".to_string());
        }

        if self.min_stake <= 0 || self.max_stake < self.min_stake {
            return Err("Stake limits must satisfy 0 < min <= max".to_string());
        }

        if self.broadcast_capacity == 0 || self.history_capacity == 0 {
            return Err("Capacities must be positive".to_string());
        }

        Ok(())
    }

    /// Betting window for a game type
    pub fn betting_window(&self, game_type: GameType) -> chrono::Duration {
        match game_type {
            GameType::Jackpot => chrono::Duration::seconds(self.jackpot_window_secs as i64),
            GameType::Crash => chrono::Duration::seconds(self.crash_window_secs as i64),
        }
    }

    /// Clock tick interval for a game type
    pub fn tick_interval(&self, game_type: GameType) -> Duration {
        match game_type {
            GameType::Jackpot => Duration::from_millis(self.jackpot_tick_ms),
            GameType::Crash => Duration::from_millis(self.crash_tick_ms),
        }
    }

    /// Check a stake against the configured limits
    pub fn validate_stake(&self, stake: i64) -> Result<(), crate::round::RoundError> {
        if stake < self.min_stake || stake > self.max_stake {
            return Err(crate::round::RoundError::InvalidStake(stake));
        }
        Ok(())
    }
}
