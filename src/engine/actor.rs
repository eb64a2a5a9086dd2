//! Round actor with async message handling.
//!
//! One actor per game type owns the single active round and serializes
//! every mutation through its inbox. The round clock is a `tokio::time`
//! interval multiplexed with the inbox in the same `select!` loop, so
//! timer-driven phase transitions and user operations never race: the
//! order messages leave the inbox is the order used for ticket assignment
//! and for deciding who cashed out before the crash.

use super::{
    config::EngineConfig,
    messages::{CashoutReceipt, JoinReceipt, RoundMessage},
};
use crate::{
    broadcast::{RoundBroadcaster, RoundEvent, SubscriberId},
    ledger::{Cents, EntryContext, EntryKind, StakeLedger, UserId},
    round::{
        ClockVerdict, CrashRound, CrashTick, JackpotRound, RoundClock, RoundError, RoundView,
        SeededRng,
        entities::{GameType, RoundCore, RoundPhase, RoundResult},
    },
    sink::ResultSink,
};
use chrono::{DateTime, Utc};
use std::{collections::VecDeque, sync::Arc};
use tokio::sync::{RwLock, mpsc, oneshot};
use uuid::Uuid;

/// Shared bounded history of settled rounds.
pub type RoundHistory = Arc<RwLock<VecDeque<RoundResult>>>;

/// Handle for sending messages to a round actor.
#[derive(Clone)]
pub struct RoundHandle {
    sender: mpsc::Sender<RoundMessage>,
    game_type: GameType,
}

impl RoundHandle {
    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    /// Join the active round with a debited stake.
    pub async fn join(&self, user_id: UserId, stake: Cents) -> Result<JoinReceipt, RoundError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoundMessage::Join {
                user_id,
                stake,
                response: tx,
            })
            .await
            .map_err(|_| RoundError::EngineClosed)?;
        rx.await.map_err(|_| RoundError::EngineClosed)?
    }

    /// Cash out of the active crash round.
    pub async fn cashout(&self, user_id: UserId) -> Result<CashoutReceipt, RoundError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoundMessage::Cashout {
                user_id,
                response: tx,
            })
            .await
            .map_err(|_| RoundError::EngineClosed)?;
        rx.await.map_err(|_| RoundError::EngineClosed)?
    }

    /// Snapshot of the active round.
    pub async fn view(&self) -> Result<RoundView, RoundError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoundMessage::GetView { response: tx })
            .await
            .map_err(|_| RoundError::EngineClosed)?;
        rx.await.map_err(|_| RoundError::EngineClosed)
    }

    /// Subscribe to the game type's event stream.
    pub async fn subscribe(
        &self,
    ) -> Result<(SubscriberId, mpsc::Receiver<RoundEvent>), RoundError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RoundMessage::Subscribe { response: tx })
            .await
            .map_err(|_| RoundError::EngineClosed)?;
        rx.await.map_err(|_| RoundError::EngineClosed)
    }

    /// Drop a subscription. Best effort.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        let _ = self.sender.send(RoundMessage::Unsubscribe { id }).await;
    }

    pub async fn pause(&self) -> Result<(), RoundError> {
        self.control(|tx| RoundMessage::Pause { response: tx }).await
    }

    pub async fn resume(&self) -> Result<(), RoundError> {
        self.control(|tx| RoundMessage::Resume { response: tx })
            .await
    }

    pub async fn close(&self) -> Result<(), RoundError> {
        self.control(|tx| RoundMessage::Close { response: tx }).await
    }

    async fn control<F>(&self, message: F) -> Result<(), RoundError>
    where
        F: FnOnce(oneshot::Sender<()>) -> RoundMessage,
    {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .await
            .map_err(|_| RoundError::EngineClosed)?;
        rx.await.map_err(|_| RoundError::EngineClosed)
    }
}

/// The game-specific round owned by an actor.
enum ActiveGame {
    Jackpot(JackpotRound),
    Crash(CrashRound),
}

impl ActiveGame {
    fn core(&self) -> &RoundCore {
        match self {
            ActiveGame::Jackpot(round) => &round.core,
            ActiveGame::Crash(round) => &round.core,
        }
    }

    fn has_stakes(&self) -> bool {
        match self {
            ActiveGame::Jackpot(round) => round.has_stakes(),
            ActiveGame::Crash(round) => round.has_stakes(),
        }
    }

    fn view(&self, now: DateTime<Utc>) -> RoundView {
        match self {
            ActiveGame::Jackpot(round) => round.view(now),
            ActiveGame::Crash(round) => round.view(now),
        }
    }
}

/// Round actor managing the active round of a single game type.
pub struct RoundActor {
    game_type: GameType,
    config: EngineConfig,
    inbox: mpsc::Receiver<RoundMessage>,
    ledger: Arc<dyn StakeLedger>,
    sink: Arc<dyn ResultSink>,
    history: RoundHistory,
    broadcaster: RoundBroadcaster,
    game: ActiveGame,
    /// Per-round RNG; replaced whenever a fresh round opens.
    rng: SeededRng,
    /// Monotonic per game type; the next round's sequence number.
    next_sequence: u64,
    /// Set after settlement; a fresh round opens once this passes.
    reopen_at: Option<DateTime<Utc>>,
    is_paused: bool,
    /// When the current pause began; cleared on resume after excluding
    /// the paused span from crash flight time.
    paused_at: Option<DateTime<Utc>>,
    /// Set when resolution hit an invariant violation; the round is
    /// frozen for manual inspection and the clock stops.
    is_halted: bool,
    is_closed: bool,
}

impl RoundActor {
    /// Create a new round actor with an open first round.
    pub fn new(
        game_type: GameType,
        config: EngineConfig,
        ledger: Arc<dyn StakeLedger>,
        sink: Arc<dyn ResultSink>,
        history: RoundHistory,
    ) -> (Self, RoundHandle) {
        let (sender, inbox) = mpsc::channel(100);

        let now = Utc::now();
        let sequence = 1;
        let (game, rng) = Self::fresh_game(game_type, &config, sequence, now);

        let broadcaster = RoundBroadcaster::new(config.broadcast_capacity);

        let actor = Self {
            game_type,
            config,
            inbox,
            ledger,
            sink,
            history,
            broadcaster,
            game,
            rng,
            next_sequence: sequence + 1,
            reopen_at: None,
            is_paused: false,
            paused_at: None,
            is_halted: false,
            is_closed: false,
        };

        let handle = RoundHandle { sender, game_type };

        (actor, handle)
    }

    /// Run the actor event loop.
    pub async fn run(mut self) {
        log::info!(
            "{} engine starting with round {} seq {}",
            self.game_type,
            self.game.core().id,
            self.game.core().sequence
        );

        let mut tick_interval = tokio::time::interval(self.config.tick_interval(self.game_type));

        loop {
            tokio::select! {
                Some(message) = self.inbox.recv() => {
                    self.handle_message(message).await;

                    if self.is_closed {
                        break;
                    }
                }

                _ = tick_interval.tick() => {
                    if !self.is_paused && !self.is_halted && !self.is_closed {
                        self.tick().await;
                    }
                }
            }
        }

        log::info!("{} engine closed", self.game_type);
    }

    async fn handle_message(&mut self, message: RoundMessage) {
        match message {
            RoundMessage::Join {
                user_id,
                stake,
                response,
            } => {
                let result = self.handle_join(user_id, stake).await;
                let _ = response.send(result);
            }

            RoundMessage::Cashout { user_id, response } => {
                let result = self.handle_cashout(user_id).await;
                let _ = response.send(result);
            }

            RoundMessage::GetView { response } => {
                let _ = response.send(self.game.view(Utc::now()));
            }

            RoundMessage::Subscribe { response } => {
                let _ = response.send(self.broadcaster.subscribe());
            }

            RoundMessage::Unsubscribe { id } => {
                self.broadcaster.unsubscribe(id);
            }

            RoundMessage::Pause { response } => {
                if !self.is_paused {
                    self.is_paused = true;
                    self.paused_at = Some(Utc::now());
                }
                let _ = response.send(());
            }

            RoundMessage::Resume { response } => {
                // Paused time must not count as flying time, otherwise the
                // multiplier jumps on resume
                if let Some(paused_at) = self.paused_at.take()
                    && let ActiveGame::Crash(round) = &mut self.game
                {
                    round.exclude_pause(Utc::now() - paused_at);
                }
                self.is_paused = false;
                let _ = response.send(());
            }

            RoundMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }
        }
    }

    /// Handle a join/bet request.
    ///
    /// The ledger debit completes before the entry/participant is
    /// recorded; a failed debit records nothing, and a failed record
    /// rolls the debit back so no stake is ever held without a matching
    /// position.
    async fn handle_join(
        &mut self,
        user_id: UserId,
        stake: Cents,
    ) -> Result<JoinReceipt, RoundError> {
        if self.is_paused || self.is_halted {
            return Err(RoundError::RoundClosed);
        }
        self.config.validate_stake(stake)?;

        let now = Utc::now();

        // Cheap prechecks before touching the ledger, so a stake is not
        // debited just to be rolled back
        let core = self.game.core();
        if !core.is_open() || now >= core.phase_deadline {
            return Err(RoundError::RoundClosed);
        }
        if let ActiveGame::Crash(round) = &self.game
            && round.participants().iter().any(|p| p.user_id == user_id)
        {
            return Err(RoundError::AlreadyJoined);
        }

        let round_id = core.id;
        let idempotency_key = format!(
            "stake_{}_{}_{}",
            user_id,
            now.timestamp_millis(),
            Uuid::new_v4()
        );
        let balance_after = self
            .ledger
            .debit(
                user_id,
                stake,
                EntryContext::new(round_id, EntryKind::Stake, idempotency_key),
            )
            .await?;

        let recorded = match &mut self.game {
            ActiveGame::Jackpot(round) => round
                .join(user_id, stake, now)
                .map(|entry| (Some((entry.ticket_start, entry.ticket_end)), round.core.sequence)),
            ActiveGame::Crash(round) => round
                .place_bet(user_id, stake, now)
                .map(|_| (None, round.core.sequence)),
        };

        match recorded {
            Ok((tickets, sequence)) => {
                let view = self.game.view(now);
                self.broadcaster
                    .publish(&RoundEvent::StateUpdated { view });

                Ok(JoinReceipt {
                    round_id,
                    sequence,
                    user_id,
                    stake,
                    tickets,
                    balance_after,
                })
            }
            Err(err) => {
                // The debit landed but the position didn't; return the
                // stake so no money is held without a position
                let rollback_key = format!(
                    "stake_rollback_{}_{}_{}",
                    user_id,
                    Utc::now().timestamp_millis(),
                    Uuid::new_v4()
                );
                if let Err(rollback_err) = self
                    .ledger
                    .credit(
                        user_id,
                        stake,
                        EntryContext::new(round_id, EntryKind::AdminAdjust, rollback_key),
                    )
                    .await
                {
                    log::error!(
                        "CRITICAL: failed to roll back stake debit of {} for user {} on round {}: {}",
                        stake,
                        user_id,
                        round_id,
                        rollback_err
                    );
                }

                Err(err)
            }
        }
    }

    /// Handle a crash cashout request. Rejected while paused: the flight
    /// clock is frozen and the multiplier is stale.
    async fn handle_cashout(&mut self, user_id: UserId) -> Result<CashoutReceipt, RoundError> {
        if self.is_paused || self.is_halted {
            return Err(RoundError::RoundClosed);
        }

        let round = match &mut self.game {
            ActiveGame::Crash(round) => round,
            ActiveGame::Jackpot(_) => return Err(RoundError::NoActiveBet),
        };

        let round_id = round.core.id;
        let outcome = round.cashout(user_id)?;

        // One cashout per user per round makes this key naturally
        // idempotent
        let idempotency_key = format!("cashout_{round_id}_{user_id}");
        if let Err(err) = self
            .ledger
            .credit(
                user_id,
                outcome.payout,
                EntryContext::new(round_id, EntryKind::Cashout, idempotency_key),
            )
            .await
        {
            // The cashout stands; the missing credit is reconciled
            // out-of-band from the round result
            log::error!(
                "cashout credit of {} for user {} on round {} failed: {}",
                outcome.payout,
                user_id,
                round_id,
                err
            );
        }

        let now = Utc::now();
        let view = self.game.view(now);
        self.broadcaster
            .publish(&RoundEvent::StateUpdated { view });

        Ok(CashoutReceipt {
            round_id,
            multiplier: outcome.multiplier,
            payout: outcome.payout,
        })
    }

    /// Advance the round lifecycle (called on the clock tick).
    async fn tick(&mut self) {
        let now = Utc::now();

        // Cooldown after settlement: open the next round once it passes
        if let Some(reopen_at) = self.reopen_at {
            if now >= reopen_at {
                self.reopen_at = None;
                self.open_round(now);
            }
            return;
        }

        let core = self.game.core();
        match core.phase {
            RoundPhase::Open => {
                match RoundClock::on_tick(
                    core.phase,
                    core.phase_deadline,
                    self.game.has_stakes(),
                    now,
                ) {
                    ClockVerdict::Hold => {}
                    ClockVerdict::Discard => {
                        // Nobody staked: no result, no settlement event
                        log::debug!(
                            "{} round {} seq {} expired empty, recreating",
                            self.game_type,
                            core.id,
                            core.sequence
                        );
                        self.open_round(now);
                    }
                    ClockVerdict::Lock => self.lock_round(now).await,
                }
            }
            RoundPhase::Locked => {
                if matches!(self.game, ActiveGame::Crash(_)) {
                    self.advance_crash(now).await;
                }
            }
            RoundPhase::Resolving | RoundPhase::Settled => {}
        }
    }

    /// Close the betting window; jackpot rounds resolve immediately.
    async fn lock_round(&mut self, now: DateTime<Utc>) {
        let locked = match &mut self.game {
            ActiveGame::Jackpot(round) => round.lock(),
            ActiveGame::Crash(round) => round.lock(now),
        };
        if locked.is_err() {
            return;
        }

        let view = self.game.view(now);
        self.broadcaster.publish(&RoundEvent::RoundLocked { view });

        if let ActiveGame::Jackpot(_) = self.game {
            self.resolve_jackpot(now).await;
        }
    }

    /// Draw the jackpot winner, credit the pot, and retire the round.
    async fn resolve_jackpot(&mut self, now: DateTime<Utc>) {
        let outcome = match &mut self.game {
            ActiveGame::Jackpot(round) => round.resolve(&mut self.rng),
            ActiveGame::Crash(_) => return,
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                // Frozen for inspection; no winner is announced
                log::error!(
                    "{} round {} resolution aborted, engine halted: {}",
                    self.game_type,
                    self.game.core().id,
                    err
                );
                self.is_halted = true;
                return;
            }
        };

        let round_id = self.game.core().id;
        let idempotency_key = format!("winnings_{round_id}");
        if let Err(err) = self
            .ledger
            .credit(
                outcome.winner,
                outcome.pot,
                EntryContext::new(round_id, EntryKind::Winnings, idempotency_key),
            )
            .await
        {
            // The result still records the intended payout; the round
            // must not get stuck on a failed credit
            log::error!(
                "winnings credit of {} for user {} on round {} failed: {}",
                outcome.pot,
                outcome.winner,
                round_id,
                err
            );
        }

        let result = match &self.game {
            ActiveGame::Jackpot(round) => round.result(now),
            ActiveGame::Crash(_) => None,
        };
        match result {
            Some(result) => self.retire(result, now).await,
            None => {
                log::error!(
                    "{} round {} settled without a result record",
                    self.game_type,
                    round_id
                );
            }
        }
    }

    /// Advance the crash multiplier; settle when the crash point is hit.
    async fn advance_crash(&mut self, now: DateTime<Utc>) {
        let tick = match &mut self.game {
            ActiveGame::Crash(round) => round.advance(now),
            ActiveGame::Jackpot(_) => return,
        };

        match tick {
            Ok(CrashTick::Flying(_)) => {
                let view = self.game.view(now);
                self.broadcaster
                    .publish(&RoundEvent::StateUpdated { view });
            }
            Ok(CrashTick::Crashed(_)) => {
                let result = match &mut self.game {
                    ActiveGame::Crash(round) => round.settle(now),
                    ActiveGame::Jackpot(_) => return,
                };
                match result {
                    Ok(result) => self.retire(result, now).await,
                    Err(err) => {
                        log::error!(
                            "{} round {} settlement failed, engine halted: {}",
                            self.game_type,
                            self.game.core().id,
                            err
                        );
                        self.is_halted = true;
                    }
                }
            }
            Err(err) => {
                log::error!("{} round advance failed: {}", self.game_type, err);
            }
        }
    }

    /// Record the result, announce settlement, and start the cooldown.
    async fn retire(&mut self, result: RoundResult, now: DateTime<Utc>) {
        {
            let mut history = self.history.write().await;
            history.push_front(result.clone());
            history.truncate(self.config.history_capacity);
        }

        if let Err(err) = self.sink.record(&result).await {
            // Surfaced for out-of-band reconciliation; settlement goes on
            log::error!(
                "failed to persist result for round {}: {}",
                result.round_id,
                err
            );
        }

        let view = self.game.view(now);
        self.broadcaster
            .publish(&RoundEvent::RoundSettled { view, result });

        self.reopen_at = Some(now + chrono::Duration::seconds(self.config.cooldown_secs as i64));
    }

    /// Replace the active round with a fresh open one.
    fn open_round(&mut self, now: DateTime<Utc>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let (game, rng) = Self::fresh_game(self.game_type, &self.config, sequence, now);
        self.game = game;
        self.rng = rng;

        log::info!(
            "{} round {} seq {} open for betting",
            self.game_type,
            self.game.core().id,
            sequence
        );

        let view = self.game.view(now);
        self.broadcaster.publish(&RoundEvent::RoundOpened { view });
    }

    fn fresh_game(
        game_type: GameType,
        config: &EngineConfig,
        sequence: u64,
        now: DateTime<Utc>,
    ) -> (ActiveGame, SeededRng) {
        let id = Uuid::new_v4();
        let mut rng = SeededRng::for_round(id, sequence, config.seed_nonce.as_bytes());
        let digest = rng.digest().to_string();
        let window = config.betting_window(game_type);

        let game = match game_type {
            GameType::Jackpot => ActiveGame::Jackpot(JackpotRound::new(
                id,
                sequence,
                now,
                window,
                config.tickets_per_unit,
                digest,
            )),
            GameType::Crash => ActiveGame::Crash(CrashRound::new(
                id,
                sequence,
                now,
                window,
                config.house_edge_bps,
                config.growth_rate,
                &mut rng,
                digest,
            )),
        };

        (game, rng)
    }
}
