/// Property-based tests for round resolution using proptest
///
/// These tests verify the ticket accounting and payout invariants of
/// the jackpot draw and the committed crash curve across a wide range
/// of randomly generated stakes and seeds.
use chrono::{Duration, Utc};
use proptest::prelude::*;
use skinpot::{
    JackpotRound, SeededRng,
    round::fairness::{crash_point_from_ratio, multiplier_at},
};
use uuid::Uuid;

// Strategy to generate a valid stake in cents (1 cent to 1000 units)
fn stake_strategy() -> impl Strategy<Value = i64> {
    1i64..=100_000
}

// Strategy to generate a list of (user, stake) joins
fn joins_strategy() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((1i64..=50, stake_strategy()), 1..=40)
}

// Helper to build a locked round from a list of joins
fn locked_round(joins: &[(i64, i64)]) -> JackpotRound {
    let now = Utc::now();
    let mut round = JackpotRound::new(
        Uuid::new_v4(),
        1,
        now,
        Duration::seconds(30),
        100,
        "prop-seed".to_string(),
    );
    for (user_id, stake) in joins {
        round
            .join(*user_id, *stake, now)
            .unwrap_or_else(|e| panic!("join of {stake} failed: {e}"));
    }
    round.lock().unwrap_or_else(|e| panic!("lock failed: {e}"));
    round
}

proptest! {
    #[test]
    fn ticket_ranges_are_contiguous_and_sum_to_total(joins in joins_strategy()) {
        let round = locked_round(&joins);

        let mut expected_start = 0u64;
        for entry in round.entries() {
            prop_assert_eq!(entry.ticket_start, expected_start);
            prop_assert!(entry.ticket_end > entry.ticket_start);
            expected_start = entry.ticket_end;
        }
        prop_assert_eq!(expected_start, round.total_tickets());

        // At 100 tickets per unit every cent is exactly one ticket
        let stake_sum: i64 = joins.iter().map(|(_, s)| s).sum();
        prop_assert_eq!(round.total_tickets(), stake_sum as u64);
    }

    #[test]
    fn winner_owns_the_winning_ticket(joins in joins_strategy(), seed in any::<[u8; 32]>()) {
        let mut round = locked_round(&joins);
        let mut rng = SeededRng::from_seed(seed);

        let outcome = round.resolve(&mut rng).unwrap();

        prop_assert!(outcome.winning_ticket < round.total_tickets());
        let owner = round
            .entries()
            .iter()
            .find(|e| e.contains(outcome.winning_ticket))
            .map(|e| e.user_id);
        prop_assert_eq!(owner, Some(outcome.winner));
    }

    #[test]
    fn pot_equals_total_stake_and_pays_exactly_once(joins in joins_strategy(), seed in any::<[u8; 32]>()) {
        let mut round = locked_round(&joins);
        let stake_sum: i64 = joins.iter().map(|(_, s)| s).sum();

        let outcome = round.resolve(&mut SeededRng::from_seed(seed)).unwrap();
        prop_assert_eq!(outcome.pot, stake_sum);

        let result = round.result(Utc::now()).unwrap();
        prop_assert_eq!(result.payouts.len(), 1);
        prop_assert_eq!(result.total_payout(), stake_sum);
        prop_assert_eq!(result.payouts[0].user_id, outcome.winner);
    }

    #[test]
    fn same_seed_same_winner(joins in joins_strategy(), seed in any::<[u8; 32]>()) {
        let mut a = locked_round(&joins);
        let mut b = locked_round(&joins);

        let out_a = a.resolve(&mut SeededRng::from_seed(seed)).unwrap();
        let out_b = b.resolve(&mut SeededRng::from_seed(seed)).unwrap();

        prop_assert_eq!(out_a.winner, out_b.winner);
        prop_assert_eq!(out_a.winning_ticket, out_b.winning_ticket);
    }

    #[test]
    fn crash_point_never_below_the_floor(ratio in 0.0f64..1.0, edge in 0u16..=1_000) {
        let point = crash_point_from_ratio(ratio, edge);
        prop_assert!(point >= 100);
    }

    #[test]
    fn crash_curve_is_monotone(elapsed in 0u64..120_000, step in 1u64..5_000) {
        let rate = 0.06;
        let before = multiplier_at(elapsed, rate);
        let after = multiplier_at(elapsed + step, rate);
        prop_assert!(after >= before);
        prop_assert!(before >= 100);
    }
}
