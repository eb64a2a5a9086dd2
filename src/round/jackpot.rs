//! Jackpot round engine.
//!
//! Accumulates weighted stakes during the betting window and selects a
//! single winner when the clock expires. Each join buys a contiguous
//! ticket range proportional to the stake; the winner is the entry whose
//! range contains a ticket drawn uniformly from the per-round seeded RNG.
//!
//! This type is pure state: no channels, no ledger calls, no sockets.
//! The engine actor owns it and serializes all access.

use super::{
    clock::RoundClock,
    entities::{Entry, GameType, Payout, RoundCore, RoundPhase, RoundResult, RoundView, StakeView},
    errors::RoundError,
    fairness::RoundRng,
};
use crate::ledger::{Cents, UserId};
use chrono::{DateTime, Utc};

/// Outcome of a jackpot resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JackpotOutcome {
    pub winner: UserId,
    pub winning_ticket: u64,
    pub pot: Cents,
}

/// A single jackpot round.
#[derive(Debug)]
pub struct JackpotRound {
    pub core: RoundCore,
    entries: Vec<Entry>,
    total_stake: Cents,
    total_tickets: u64,
    tickets_per_unit: u64,
    winning_ticket: Option<u64>,
    winner: Option<UserId>,
}

impl JackpotRound {
    pub fn new(
        id: super::entities::RoundId,
        sequence: u64,
        now: DateTime<Utc>,
        betting_window: chrono::Duration,
        tickets_per_unit: u64,
        seed_digest: String,
    ) -> Self {
        Self {
            core: RoundCore::new(
                id,
                GameType::Jackpot,
                sequence,
                now,
                now + betting_window,
                seed_digest,
            ),
            entries: Vec::new(),
            total_stake: 0,
            total_tickets: 0,
            tickets_per_unit,
            winning_ticket: None,
            winner: None,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn total_stake(&self) -> Cents {
        self.total_stake
    }

    pub fn total_tickets(&self) -> u64 {
        self.total_tickets
    }

    pub fn winner(&self) -> Option<UserId> {
        self.winner
    }

    pub fn has_stakes(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Tickets bought by a stake: `tickets_per_unit` per whole currency
    /// unit, floor-rounded.
    pub fn tickets_for(&self, stake: Cents) -> u64 {
        (stake as u64) * self.tickets_per_unit / 100
    }

    /// Append an entry for a debited stake.
    ///
    /// The caller must have debited the ledger already; a failed debit
    /// never reaches this point. A join after the deadline fails
    /// `RoundClosed` even if the lock tick has not yet run, so no entry
    /// can slip into a logically locked round.
    pub fn join(&mut self, user_id: UserId, stake: Cents, now: DateTime<Utc>) -> Result<Entry, RoundError> {
        if !self.core.is_open() || now >= self.core.phase_deadline {
            return Err(RoundError::RoundClosed);
        }
        if stake <= 0 {
            return Err(RoundError::InvalidStake(stake));
        }
        let tickets = self.tickets_for(stake);
        if tickets == 0 {
            return Err(RoundError::InvalidStake(stake));
        }

        // Ticket ranges are assigned contiguously in join order. A user
        // joining twice holds two separate entries; win probability stays
        // proportional to total stake either way.
        let entry = Entry {
            user_id,
            stake,
            ticket_start: self.total_tickets,
            ticket_end: self.total_tickets + tickets,
        };
        self.entries.push(entry.clone());
        self.total_stake += stake;
        self.total_tickets += tickets;

        log::debug!(
            "jackpot round {} seq {}: user {} staked {} for tickets [{}, {})",
            self.core.id,
            self.core.sequence,
            user_id,
            stake,
            entry.ticket_start,
            entry.ticket_end
        );

        Ok(entry)
    }

    /// Close the betting window. Open -> Locked.
    pub fn lock(&mut self) -> Result<(), RoundError> {
        if self.core.phase != RoundPhase::Open {
            return Err(RoundError::RoundClosed);
        }
        self.core.phase = RoundPhase::Locked;
        Ok(())
    }

    /// Draw the winning ticket and settle.
    ///
    /// Requires `Locked` and at least one entry. Verifies the ticket-sum
    /// invariant before drawing; a violation aborts resolution with the
    /// round left frozen in `Locked` for inspection.
    pub fn resolve(&mut self, rng: &mut dyn RoundRng) -> Result<JackpotOutcome, RoundError> {
        if self.core.phase != RoundPhase::Locked {
            return Err(RoundError::RoundClosed);
        }
        if self.entries.is_empty() {
            return Err(RoundError::InvariantViolation(
                "resolve called with zero entries".to_string(),
            ));
        }
        self.check_ticket_invariant()?;

        self.core.phase = RoundPhase::Resolving;

        let winning_ticket = rng.draw_ticket(self.total_tickets);

        // Binary search over cumulative ranges; entries are in join order
        // so ticket_end is strictly increasing.
        let idx = self
            .entries
            .partition_point(|e| e.ticket_end <= winning_ticket);
        let winner_entry = self.entries.get(idx).ok_or_else(|| {
            RoundError::InvariantViolation(format!(
                "winning ticket {winning_ticket} outside issued range 0..{}",
                self.total_tickets
            ))
        })?;
        debug_assert!(winner_entry.contains(winning_ticket));

        let winner = winner_entry.user_id;
        self.winning_ticket = Some(winning_ticket);
        self.winner = Some(winner);
        self.core.phase = RoundPhase::Settled;

        log::info!(
            "jackpot round {} seq {}: ticket {} of {} wins pot {} for user {}",
            self.core.id,
            self.core.sequence,
            winning_ticket,
            self.total_tickets,
            self.total_stake,
            winner
        );

        Ok(JackpotOutcome {
            winner,
            winning_ticket,
            pot: self.total_stake,
        })
    }

    /// Build the persisted result. Only valid once settled.
    pub fn result(&self, settled_at: DateTime<Utc>) -> Option<RoundResult> {
        let winner = self.winner?;
        Some(RoundResult {
            round_id: self.core.id,
            game_type: GameType::Jackpot,
            sequence: self.core.sequence,
            total_stake: self.total_stake,
            payouts: vec![Payout {
                user_id: winner,
                amount: self.total_stake,
            }],
            settled_at,
        })
    }

    /// Client-facing projection.
    pub fn view(&self, now: DateTime<Utc>) -> RoundView {
        let settled = self.core.phase == RoundPhase::Settled;
        RoundView {
            round_id: self.core.id,
            game_type: GameType::Jackpot,
            phase: self.core.phase,
            sequence: self.core.sequence,
            total_stake: self.total_stake,
            seconds_remaining: RoundClock::seconds_remaining(self.core.phase_deadline, now),
            total_tickets: Some(self.total_tickets),
            multiplier: None,
            crash_point: None,
            winner: self.winner,
            stakes: self
                .entries
                .iter()
                .map(|e| StakeView {
                    user_id: e.user_id,
                    stake: e.stake,
                    cashout: None,
                })
                .collect(),
            seed_digest: settled.then(|| self.core.seed_digest.clone()),
        }
    }

    fn check_ticket_invariant(&self) -> Result<(), RoundError> {
        let mut expected_start = 0;
        let mut stake_sum = 0;
        for entry in &self.entries {
            if entry.ticket_start != expected_start || entry.ticket_end <= entry.ticket_start {
                return Err(RoundError::InvariantViolation(format!(
                    "non-contiguous ticket range [{}, {}) at expected start {}",
                    entry.ticket_start, entry.ticket_end, expected_start
                )));
            }
            expected_start = entry.ticket_end;
            stake_sum += entry.stake;
        }
        if expected_start != self.total_tickets {
            return Err(RoundError::InvariantViolation(format!(
                "ticket ranges cover 0..{expected_start} but {} tickets issued",
                self.total_tickets
            )));
        }
        if stake_sum != self.total_stake {
            return Err(RoundError::InvariantViolation(format!(
                "entry stakes sum to {stake_sum} but total stake is {}",
                self.total_stake
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    struct FixedTicket(u64);

    impl RoundRng for FixedTicket {
        fn draw_ticket(&mut self, _total: u64) -> u64 {
            self.0
        }
        fn unit_ratio(&mut self) -> f64 {
            0.0
        }
    }

    fn open_round() -> (JackpotRound, DateTime<Utc>) {
        let now = Utc::now();
        let round = JackpotRound::new(
            uuid::Uuid::new_v4(),
            1,
            now,
            Duration::seconds(30),
            100,
            "seed".to_string(),
        );
        (round, now)
    }

    #[test]
    fn joins_assign_contiguous_ranges() {
        let (mut round, now) = open_round();
        round.join(1, 1_000, now).unwrap();
        round.join(2, 3_000, now).unwrap();
        round.join(3, 6_000, now).unwrap();

        let entries = round.entries();
        assert_eq!(entries[0].ticket_start, 0);
        assert_eq!(entries[0].ticket_end, 1_000);
        assert_eq!(entries[1].ticket_start, 1_000);
        assert_eq!(entries[1].ticket_end, 4_000);
        assert_eq!(entries[2].ticket_start, 4_000);
        assert_eq!(entries[2].ticket_end, 10_000);
        assert_eq!(round.total_stake(), 10_000);
        assert_eq!(round.total_tickets(), 10_000);
    }

    #[test]
    fn winning_ticket_4500_pays_third_joiner() {
        // Scenario: A stakes 10, B stakes 30, C stakes 60; ticket 4500 -> C
        let (mut round, now) = open_round();
        round.join(100, 1_000, now).unwrap();
        round.join(200, 3_000, now).unwrap();
        round.join(300, 6_000, now).unwrap();
        round.lock().unwrap();

        let outcome = round.resolve(&mut FixedTicket(4_500)).unwrap();
        assert_eq!(outcome.winner, 300);
        assert_eq!(outcome.winning_ticket, 4_500);
        assert_eq!(outcome.pot, 10_000);

        let result = round.result(now).unwrap();
        assert_eq!(result.payouts.len(), 1);
        assert_eq!(result.payouts[0].user_id, 300);
        assert_eq!(result.payouts[0].amount, 10_000);
    }

    #[test]
    fn join_after_deadline_fails_round_closed() {
        let (mut round, now) = open_round();
        round.join(1, 1_000, now).unwrap();

        // Deadline passed but the lock tick hasn't run yet
        let late = now + Duration::seconds(31);
        assert!(matches!(
            round.join(2, 1_000, late),
            Err(RoundError::RoundClosed)
        ));
    }

    #[test]
    fn repeat_joins_stay_separate_entries() {
        let (mut round, now) = open_round();
        round.join(1, 500, now).unwrap();
        round.join(2, 500, now).unwrap();
        round.join(1, 500, now).unwrap();

        assert_eq!(round.entries().len(), 3);
        assert_eq!(round.entries()[2].user_id, 1);
        assert_eq!(round.entries()[2].ticket_start, 1_000);
    }

    #[test]
    fn zero_or_dust_stake_is_invalid() {
        let (mut round, now) = open_round();
        assert!(matches!(
            round.join(1, 0, now),
            Err(RoundError::InvalidStake(0))
        ));
        assert!(matches!(
            round.join(1, -50, now),
            Err(RoundError::InvalidStake(-50))
        ));
    }

    #[test]
    fn resolve_requires_lock() {
        let (mut round, now) = open_round();
        round.join(1, 1_000, now).unwrap();
        assert!(matches!(
            round.resolve(&mut FixedTicket(0)),
            Err(RoundError::RoundClosed)
        ));
    }

    #[test]
    fn resolve_is_deterministic_for_a_seed() {
        use crate::round::fairness::SeededRng;

        let id = uuid::Uuid::new_v4();
        let build = || {
            let now = Utc::now();
            let mut r =
                JackpotRound::new(id, 5, now, Duration::seconds(30), 100, "s".to_string());
            r.join(1, 1_000, now).unwrap();
            r.join(2, 2_500, now).unwrap();
            r.join(3, 900, now).unwrap();
            r.lock().unwrap();
            r
        };

        let mut a = build();
        let mut b = build();
        let out_a = a.resolve(&mut SeededRng::from_seed([9u8; 32])).unwrap();
        let out_b = b.resolve(&mut SeededRng::from_seed([9u8; 32])).unwrap();
        assert_eq!(out_a.winner, out_b.winner);
        assert_eq!(out_a.winning_ticket, out_b.winning_ticket);
    }

    #[test]
    fn boundary_tickets_map_to_owners() {
        let (mut round, now) = open_round();
        round.join(1, 1_000, now).unwrap();
        round.join(2, 1_000, now).unwrap();
        round.lock().unwrap();

        // First ticket of the second range belongs to the second entry
        let outcome = round.resolve(&mut FixedTicket(1_000)).unwrap();
        assert_eq!(outcome.winner, 2);
    }

    #[test]
    fn corrupted_totals_freeze_resolution() {
        let (mut round, now) = open_round();
        round.join(1, 1_000, now).unwrap();
        round.lock().unwrap();
        round.total_stake += 1;

        let err = round.resolve(&mut FixedTicket(0)).unwrap_err();
        assert!(matches!(err, RoundError::InvariantViolation(_)));
        // Frozen in Locked, no winner announced
        assert_eq!(round.core.phase, RoundPhase::Locked);
        assert_eq!(round.winner(), None);
    }

    #[test]
    fn view_hides_seed_until_settled() {
        let (mut round, now) = open_round();
        round.join(1, 1_000, now).unwrap();
        assert!(round.view(now).seed_digest.is_none());

        round.lock().unwrap();
        round.resolve(&mut FixedTicket(10)).unwrap();
        let view = round.view(now);
        assert_eq!(view.seed_digest.as_deref(), Some("seed"));
        assert_eq!(view.winner, Some(1));
    }
}
