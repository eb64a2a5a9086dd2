//! Crash round engine.
//!
//! A crash round commits its crash point at creation from the per-round
//! seeded RNG, accepts bets during the betting window, then "flies": the
//! multiplier grows along an exponential curve until it reaches the crash
//! point. Participants may cash out exactly once while the round is
//! flying; whoever is still in when it crashes loses their stake.
//!
//! Pure state, owned and serialized by the engine actor. The actor's
//! event loop is what makes the core race well-defined: a cashout message
//! ordered after the crash tick observes `Resolving`/`Settled` and fails
//! `TooLate`, no matter what the wall clock would say.

use super::{
    clock::RoundClock,
    entities::{
        GameType, Multiplier, Participant, Payout, RoundCore, RoundPhase, RoundResult, RoundView,
        StakeView,
    },
    errors::RoundError,
    fairness::{self, RoundRng},
};
use crate::ledger::{Cents, UserId};
use chrono::{DateTime, Utc};

/// Result of a multiplier advance tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashTick {
    /// Still flying at the given multiplier.
    Flying(Multiplier),
    /// The crash point was reached; the round is now `Resolving` and must
    /// be settled.
    Crashed(Multiplier),
}

/// A successful cashout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashoutOutcome {
    pub multiplier: Multiplier,
    pub payout: Cents,
}

/// A single crash round.
#[derive(Debug)]
pub struct CrashRound {
    pub core: RoundCore,
    /// Committed before the betting window closes, revealed at settlement.
    crash_point: Multiplier,
    multiplier: Multiplier,
    growth_rate: f64,
    locked_at: Option<DateTime<Utc>>,
    participants: Vec<Participant>,
    total_stake: Cents,
}

impl CrashRound {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: super::entities::RoundId,
        sequence: u64,
        now: DateTime<Utc>,
        betting_window: chrono::Duration,
        house_edge_bps: u16,
        growth_rate: f64,
        rng: &mut dyn RoundRng,
        seed_digest: String,
    ) -> Self {
        // The crash point is fixed here, before any bet or cashout can
        // exist, and never leaves this struct until settlement.
        let crash_point = fairness::crash_point_from_ratio(rng.unit_ratio(), house_edge_bps);

        Self {
            core: RoundCore::new(
                id,
                GameType::Crash,
                sequence,
                now,
                now + betting_window,
                seed_digest,
            ),
            crash_point,
            multiplier: 100,
            growth_rate,
            locked_at: None,
            participants: Vec::new(),
            total_stake: 0,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn total_stake(&self) -> Cents {
        self.total_stake
    }

    pub fn multiplier(&self) -> Multiplier {
        self.multiplier
    }

    pub fn has_stakes(&self) -> bool {
        !self.participants.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn crash_point(&self) -> Multiplier {
        self.crash_point
    }

    /// Record a bet for a debited stake. One position per user per round.
    pub fn place_bet(
        &mut self,
        user_id: UserId,
        stake: Cents,
        now: DateTime<Utc>,
    ) -> Result<Participant, RoundError> {
        if !self.core.is_open() || now >= self.core.phase_deadline {
            return Err(RoundError::RoundClosed);
        }
        if stake <= 0 {
            return Err(RoundError::InvalidStake(stake));
        }
        if self.participants.iter().any(|p| p.user_id == user_id) {
            return Err(RoundError::AlreadyJoined);
        }

        let participant = Participant {
            user_id,
            stake,
            cashout: None,
        };
        self.participants.push(participant.clone());
        self.total_stake += stake;

        log::debug!(
            "crash round {} seq {}: user {} bet {}",
            self.core.id,
            self.core.sequence,
            user_id,
            stake
        );

        Ok(participant)
    }

    /// Close the betting window and start flying. Open -> Locked.
    pub fn lock(&mut self, now: DateTime<Utc>) -> Result<(), RoundError> {
        if self.core.phase != RoundPhase::Open {
            return Err(RoundError::RoundClosed);
        }
        self.core.phase = RoundPhase::Locked;
        self.locked_at = Some(now);
        Ok(())
    }

    /// Shift the flight origin forward so a paused span does not count
    /// as elapsed flying time.
    pub fn exclude_pause(&mut self, paused_for: chrono::Duration) {
        if let Some(locked_at) = self.locked_at.as_mut() {
            *locked_at += paused_for;
        }
    }

    /// Advance the multiplier along the growth curve.
    ///
    /// The multiplier never decreases and never exceeds the crash point.
    /// Reaching the crash point moves the round to `Resolving`.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<CrashTick, RoundError> {
        let locked_at = match (self.core.phase, self.locked_at) {
            (RoundPhase::Locked, Some(at)) => at,
            _ => return Err(RoundError::RoundClosed),
        };

        let elapsed_ms = (now - locked_at).num_milliseconds().max(0) as u64;
        let curve = fairness::multiplier_at(elapsed_ms, self.growth_rate);
        self.multiplier = self.multiplier.max(curve).min(self.crash_point);

        if self.multiplier >= self.crash_point {
            self.multiplier = self.crash_point;
            self.core.phase = RoundPhase::Resolving;
            log::info!(
                "crash round {} seq {}: crashed at {}x/100 with {} still in",
                self.core.id,
                self.core.sequence,
                self.crash_point,
                self.participants.iter().filter(|p| p.cashout.is_none()).count()
            );
            return Ok(CrashTick::Crashed(self.crash_point));
        }

        Ok(CrashTick::Flying(self.multiplier))
    }

    /// Cash a participant out at the current multiplier.
    ///
    /// A cashout ordered after the crash tick fails `TooLate` even if the
    /// wall-clock multiplier would still mathematically allow it.
    pub fn cashout(&mut self, user_id: UserId) -> Result<CashoutOutcome, RoundError> {
        match self.core.phase {
            RoundPhase::Locked => {}
            RoundPhase::Resolving | RoundPhase::Settled => return Err(RoundError::TooLate),
            RoundPhase::Open => return Err(RoundError::RoundClosed),
        }
        if self.multiplier >= self.crash_point {
            return Err(RoundError::TooLate);
        }

        let multiplier = self.multiplier;
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(RoundError::NoActiveBet)?;

        if participant.cashout.is_some() {
            return Err(RoundError::AlreadyCashedOut);
        }

        participant.cashout = Some(multiplier);
        let payout = participant.payout();

        log::info!(
            "crash round {} seq {}: user {} cashed out at {}x/100 for {}",
            self.core.id,
            self.core.sequence,
            user_id,
            multiplier,
            payout
        );

        Ok(CashoutOutcome { multiplier, payout })
    }

    /// Finalize payouts. Resolving -> Settled.
    ///
    /// Participants who never cashed out pay out zero; their stake is not
    /// returned.
    pub fn settle(&mut self, settled_at: DateTime<Utc>) -> Result<RoundResult, RoundError> {
        if self.core.phase != RoundPhase::Resolving {
            return Err(RoundError::RoundClosed);
        }
        self.core.phase = RoundPhase::Settled;

        Ok(RoundResult {
            round_id: self.core.id,
            game_type: GameType::Crash,
            sequence: self.core.sequence,
            total_stake: self.total_stake,
            payouts: self
                .participants
                .iter()
                .map(|p| Payout {
                    user_id: p.user_id,
                    amount: p.payout(),
                })
                .collect(),
            settled_at,
        })
    }

    /// Client-facing projection. The crash point appears only once
    /// settled.
    pub fn view(&self, now: DateTime<Utc>) -> RoundView {
        let settled = self.core.phase == RoundPhase::Settled;
        RoundView {
            round_id: self.core.id,
            game_type: GameType::Crash,
            phase: self.core.phase,
            sequence: self.core.sequence,
            total_stake: self.total_stake,
            seconds_remaining: RoundClock::seconds_remaining(self.core.phase_deadline, now),
            total_tickets: None,
            multiplier: Some(self.multiplier),
            crash_point: settled.then_some(self.crash_point),
            winner: None,
            stakes: self
                .participants
                .iter()
                .map(|p| StakeView {
                    user_id: p.user_id,
                    stake: p.stake,
                    cashout: p.cashout,
                })
                .collect(),
            seed_digest: settled.then(|| self.core.seed_digest.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    struct FixedRatio(f64);

    impl RoundRng for FixedRatio {
        fn draw_ticket(&mut self, _total: u64) -> u64 {
            0
        }
        fn unit_ratio(&mut self) -> f64 {
            self.0
        }
    }

    /// Round with crash point 2.50x
    fn round_at_250() -> (CrashRound, DateTime<Utc>) {
        let now = Utc::now();
        let round = CrashRound::new(
            uuid::Uuid::new_v4(),
            1,
            now,
            Duration::seconds(15),
            400,
            0.06,
            &mut FixedRatio(0.6258),
            "seed".to_string(),
        );
        assert_eq!(round.crash_point(), 250);
        (round, now)
    }

    #[test]
    fn cashout_before_crash_pays_stake_times_multiplier() {
        // Scenario: crash at 2.50; X bets 20, cashes out at 1.80 -> 36.00;
        // Y bets 10, never cashes out -> 0.
        let (mut round, now) = round_at_250();
        round.place_bet(10, 2_000, now).unwrap();
        round.place_bet(20, 1_000, now).unwrap();
        round.lock(now).unwrap();

        // Advance to 1.80x: e^(0.06 * 9.8) ~= 1.8003
        let tick = round.advance(now + Duration::milliseconds(9_800)).unwrap();
        assert_eq!(tick, CrashTick::Flying(180));

        let outcome = round.cashout(10).unwrap();
        assert_eq!(outcome.multiplier, 180);
        assert_eq!(outcome.payout, 3_600);

        // Fly past the crash point
        let tick = round.advance(now + Duration::seconds(60)).unwrap();
        assert_eq!(tick, CrashTick::Crashed(250));

        let result = round.settle(now + Duration::seconds(60)).unwrap();
        assert_eq!(result.total_stake, 3_000);
        assert_eq!(result.total_payout(), 3_600);
        let busted = result.payouts.iter().find(|p| p.user_id == 20).unwrap();
        assert_eq!(busted.amount, 0);
    }

    #[test]
    fn cashout_after_crash_is_too_late() {
        let (mut round, now) = round_at_250();
        round.place_bet(1, 1_000, now).unwrap();
        round.lock(now).unwrap();
        round.advance(now + Duration::seconds(60)).unwrap();

        assert!(matches!(round.cashout(1), Err(RoundError::TooLate)));
    }

    #[test]
    fn cashout_is_idempotent_failure_on_repeat() {
        let (mut round, now) = round_at_250();
        round.place_bet(1, 1_000, now).unwrap();
        round.lock(now).unwrap();
        round.advance(now + Duration::seconds(5)).unwrap();

        round.cashout(1).unwrap();
        assert!(matches!(round.cashout(1), Err(RoundError::AlreadyCashedOut)));
        assert!(matches!(round.cashout(1), Err(RoundError::AlreadyCashedOut)));
    }

    #[test]
    fn cashout_without_bet_fails() {
        let (mut round, now) = round_at_250();
        round.place_bet(1, 1_000, now).unwrap();
        round.lock(now).unwrap();
        round.advance(now + Duration::seconds(2)).unwrap();

        assert!(matches!(round.cashout(99), Err(RoundError::NoActiveBet)));
    }

    #[test]
    fn one_position_per_user() {
        let (mut round, now) = round_at_250();
        round.place_bet(1, 1_000, now).unwrap();
        assert!(matches!(
            round.place_bet(1, 500, now),
            Err(RoundError::AlreadyJoined)
        ));
        assert_eq!(round.total_stake(), 1_000);
    }

    #[test]
    fn bet_after_deadline_fails_round_closed() {
        let (mut round, now) = round_at_250();
        let late = now + Duration::seconds(16);
        assert!(matches!(
            round.place_bet(1, 1_000, late),
            Err(RoundError::RoundClosed)
        ));
    }

    #[test]
    fn multiplier_never_decreases() {
        let (mut round, now) = round_at_250();
        round.place_bet(1, 1_000, now).unwrap();
        round.lock(now).unwrap();

        let mut last = 0;
        for ms in (0..20_000).step_by(100) {
            match round.advance(now + Duration::milliseconds(ms)).unwrap() {
                CrashTick::Flying(m) | CrashTick::Crashed(m) => {
                    assert!(m >= last);
                    last = m;
                }
            }
            if round.core.phase != RoundPhase::Locked {
                break;
            }
        }
        assert_eq!(last, 250);
    }

    #[test]
    fn excluded_pause_does_not_advance_the_flight() {
        let (mut round, now) = round_at_250();
        round.place_bet(1, 1_000, now).unwrap();
        round.lock(now).unwrap();

        let before = round.advance(now + Duration::seconds(5)).unwrap();

        // A 10s pause shifts the origin; the curve resumes where it left off
        round.exclude_pause(Duration::seconds(10));
        let after = round.advance(now + Duration::seconds(15)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn recorded_cashout_is_bounded_by_crash_point() {
        let (mut round, now) = round_at_250();
        round.place_bet(1, 1_000, now).unwrap();
        round.lock(now).unwrap();
        round.advance(now + Duration::milliseconds(9_000)).unwrap();

        let outcome = round.cashout(1).unwrap();
        assert!(outcome.multiplier < 250);

        let participant = &round.participants()[0];
        assert!(participant.cashout.unwrap() <= 250);
    }

    #[test]
    fn view_hides_crash_point_until_settled() {
        let (mut round, now) = round_at_250();
        round.place_bet(1, 1_000, now).unwrap();
        assert!(round.view(now).crash_point.is_none());

        round.lock(now).unwrap();
        round.advance(now + Duration::seconds(5)).unwrap();
        assert!(round.view(now).crash_point.is_none());

        round.advance(now + Duration::seconds(60)).unwrap();
        round.settle(now + Duration::seconds(60)).unwrap();
        assert_eq!(round.view(now).crash_point, Some(250));
    }

    #[test]
    fn settle_requires_a_crash() {
        let (mut round, now) = round_at_250();
        round.place_bet(1, 1_000, now).unwrap();
        round.lock(now).unwrap();
        assert!(round.settle(now).is_err());
    }
}
