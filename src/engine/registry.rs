//! Registry for spawning and addressing round actors.
//!
//! One actor runs per game type. Callers never hold a round directly;
//! every operation goes through the actor's handle, so concurrent joins
//! and cashouts against the same round are serialized by its inbox.

use super::{
    actor::{RoundActor, RoundHandle, RoundHistory},
    config::EngineConfig,
    messages::{CashoutReceipt, JoinReceipt},
};
use crate::{
    broadcast::{RoundEvent, SubscriberId},
    ledger::{Cents, StakeLedger, UserId},
    round::{
        RoundError, RoundView,
        entities::{GameType, RoundId, RoundResult},
    },
    sink::ResultSink,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::{RwLock, mpsc};

/// Round registry managing one actor per game type.
pub struct RoundRegistry {
    config: EngineConfig,
    ledger: Arc<dyn StakeLedger>,
    sink: Arc<dyn ResultSink>,
    engines: RwLock<HashMap<GameType, RoundHandle>>,
    /// Settled results, newest first, shared with every actor.
    history: RoundHistory,
    /// Set by `shutdown`; a shut-down registry never respawns engines.
    is_shut_down: AtomicBool,
}

impl RoundRegistry {
    /// Create a registry. The configuration is validated here so a bad
    /// config is refused up front instead of killing actors at runtime.
    pub fn new(
        config: EngineConfig,
        ledger: Arc<dyn StakeLedger>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self, String> {
        config.validate()?;

        Ok(Self {
            config,
            ledger,
            sink,
            engines: RwLock::new(HashMap::new()),
            history: Arc::new(RwLock::new(VecDeque::new())),
            is_shut_down: AtomicBool::new(false),
        })
    }

    /// Get the handle for a game type, spawning its actor on first use.
    ///
    /// Concurrent callers racing on the first use all end up with the
    /// same handle; the write-side re-check makes the spawn happen once.
    /// Fails `EngineClosed` once the registry has been shut down.
    pub async fn engine(&self, game_type: GameType) -> Result<RoundHandle, RoundError> {
        if self.is_shut_down.load(Ordering::Acquire) {
            return Err(RoundError::EngineClosed);
        }

        {
            let engines = self.engines.read().await;
            if let Some(handle) = engines.get(&game_type) {
                return Ok(handle.clone());
            }
        }

        let mut engines = self.engines.write().await;
        if self.is_shut_down.load(Ordering::Acquire) {
            return Err(RoundError::EngineClosed);
        }
        if let Some(handle) = engines.get(&game_type) {
            return Ok(handle.clone());
        }

        let (actor, handle) = RoundActor::new(
            game_type,
            self.config.clone(),
            self.ledger.clone(),
            self.sink.clone(),
            self.history.clone(),
        );
        engines.insert(game_type, handle.clone());

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!("Spawned {game_type} round engine");

        Ok(handle)
    }

    /// Join the active round of a game type.
    pub async fn join(
        &self,
        game_type: GameType,
        user_id: UserId,
        stake: Cents,
    ) -> Result<JoinReceipt, RoundError> {
        self.engine(game_type).await?.join(user_id, stake).await
    }

    /// Cash out of the active round. Jackpot rounds have no cashout and
    /// always answer `NoActiveBet`.
    pub async fn cashout(
        &self,
        game_type: GameType,
        user_id: UserId,
    ) -> Result<CashoutReceipt, RoundError> {
        self.engine(game_type).await?.cashout(user_id).await
    }

    /// Snapshot of the active round of a game type.
    pub async fn active_view(&self, game_type: GameType) -> Result<RoundView, RoundError> {
        self.engine(game_type).await?.view().await
    }

    /// Subscribe to a game type's event stream.
    pub async fn subscribe(
        &self,
        game_type: GameType,
    ) -> Result<(SubscriberId, mpsc::Receiver<RoundEvent>), RoundError> {
        self.engine(game_type).await?.subscribe().await
    }

    /// Drop a subscription.
    pub async fn unsubscribe(&self, game_type: GameType, id: SubscriberId) {
        if let Some(handle) = self.engines.read().await.get(&game_type) {
            handle.unsubscribe(id).await;
        }
    }

    /// Look up a settled round in the retained history.
    pub async fn settled(&self, round_id: RoundId) -> Option<RoundResult> {
        let history = self.history.read().await;
        history.iter().find(|r| r.round_id == round_id).cloned()
    }

    /// Most recent settled results, newest first.
    pub async fn recent_results(&self, limit: usize) -> Vec<RoundResult> {
        let history = self.history.read().await;
        history.iter().take(limit).cloned().collect()
    }

    /// Pause a game type's engine (operational drain).
    pub async fn pause(&self, game_type: GameType) -> Result<(), RoundError> {
        self.engine(game_type).await?.pause().await
    }

    /// Resume a paused engine.
    pub async fn resume(&self, game_type: GameType) -> Result<(), RoundError> {
        self.engine(game_type).await?.resume().await
    }

    /// Shut down every spawned engine. Terminal: later lookups fail
    /// `EngineClosed` instead of respawning.
    pub async fn shutdown(&self) {
        self.is_shut_down.store(true, Ordering::Release);

        let mut engines = self.engines.write().await;
        for (game_type, handle) in engines.drain() {
            if handle.close().await.is_err() {
                log::warn!("{game_type} engine was already gone at shutdown");
            }
        }
    }

    pub async fn engine_count(&self) -> usize {
        self.engines.read().await.len()
    }
}
