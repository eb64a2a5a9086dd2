//! Round entities shared by the jackpot and crash engines.

use crate::ledger::{Cents, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Round ID type
pub type RoundId = Uuid;

/// Fixed-point multiplier in hundredths (100 = 1.00x)
pub type Multiplier = u64;

/// Game type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Jackpot,
    Crash,
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::Jackpot => write!(f, "jackpot"),
            GameType::Crash => write!(f, "crash"),
        }
    }
}

/// Round lifecycle phase. Transitions are forward-only:
/// Open -> Locked -> Resolving -> Settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Open,
    Locked,
    Resolving,
    Settled,
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundPhase::Open => write!(f, "open"),
            RoundPhase::Locked => write!(f, "locked"),
            RoundPhase::Resolving => write!(f, "resolving"),
            RoundPhase::Settled => write!(f, "settled"),
        }
    }
}

/// State shared by every round regardless of game type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundCore {
    pub id: RoundId,
    pub game_type: GameType,
    pub phase: RoundPhase,
    /// Monotonic per game type, assigned at creation, never reused.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub phase_deadline: DateTime<Utc>,
    /// Hex digest of the per-round fairness seed, revealed for audit.
    pub seed_digest: String,
}

impl RoundCore {
    pub fn new(
        id: RoundId,
        game_type: GameType,
        sequence: u64,
        created_at: DateTime<Utc>,
        phase_deadline: DateTime<Utc>,
        seed_digest: String,
    ) -> Self {
        Self {
            id,
            game_type,
            phase: RoundPhase::Open,
            sequence,
            created_at,
            phase_deadline,
            seed_digest,
        }
    }

    pub fn is_open(&self) -> bool {
        self.phase == RoundPhase::Open
    }
}

/// One jackpot stake, mapped to a contiguous half-open ticket range
/// `[ticket_start, ticket_end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub user_id: UserId,
    pub stake: Cents,
    pub ticket_start: u64,
    pub ticket_end: u64,
}

impl Entry {
    pub fn ticket_count(&self) -> u64 {
        self.ticket_end - self.ticket_start
    }

    pub fn contains(&self, ticket: u64) -> bool {
        ticket >= self.ticket_start && ticket < self.ticket_end
    }
}

/// One crash position. `cashout` is unset until the user cashes out and
/// immutable once set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub stake: Cents,
    pub cashout: Option<Multiplier>,
}

impl Participant {
    pub fn payout(&self) -> Cents {
        match self.cashout {
            Some(multiplier) => self.stake * multiplier as i64 / 100,
            None => 0,
        }
    }
}

/// One user's payout in a settled round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub user_id: UserId,
    pub amount: Cents,
}

/// Persisted record of a settled round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    pub round_id: RoundId,
    pub game_type: GameType,
    pub sequence: u64,
    pub total_stake: Cents,
    pub payouts: Vec<Payout>,
    pub settled_at: DateTime<Utc>,
}

impl RoundResult {
    pub fn total_payout(&self) -> Cents {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}

/// Read-only projection of a round for clients.
///
/// Never carries the crash point of a live round or any seed material
/// beyond the digest; the digest is only populated once settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundView {
    pub round_id: RoundId,
    pub game_type: GameType,
    pub phase: RoundPhase,
    pub sequence: u64,
    pub total_stake: Cents,
    /// Seconds until the phase deadline, zero once passed.
    pub seconds_remaining: u64,
    /// Jackpot only: total tickets issued so far.
    pub total_tickets: Option<u64>,
    /// Crash only: current multiplier in hundredths.
    pub multiplier: Option<Multiplier>,
    /// Crash only, settled rounds only: the revealed crash point.
    pub crash_point: Option<Multiplier>,
    /// Jackpot only, settled rounds only.
    pub winner: Option<UserId>,
    /// Participating users and their stakes, in join order.
    pub stakes: Vec<StakeView>,
    /// Fairness seed digest, populated once settled.
    pub seed_digest: Option<String>,
}

/// One user's visible stake in a round view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeView {
    pub user_id: UserId,
    pub stake: Cents,
    /// Crash only: the multiplier the user cashed out at, if any.
    pub cashout: Option<Multiplier>,
}
