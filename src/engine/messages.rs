//! Engine actor message types.

use crate::broadcast::{RoundEvent, SubscriberId};
use crate::ledger::{Cents, UserId};
use crate::round::{
    RoundError, RoundView,
    entities::{Multiplier, RoundId},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Confirmation returned to a user whose join/bet was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinReceipt {
    pub round_id: RoundId,
    pub sequence: u64,
    pub user_id: UserId,
    pub stake: Cents,
    /// Jackpot only: the half-open ticket range bought by this stake.
    pub tickets: Option<(u64, u64)>,
    /// Balance after the stake debit.
    pub balance_after: Cents,
}

/// Confirmation returned to a user who cashed out of a crash round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashoutReceipt {
    pub round_id: RoundId,
    pub multiplier: Multiplier,
    pub payout: Cents,
}

/// Messages that can be sent to a `RoundActor`.
#[derive(Debug)]
pub enum RoundMessage {
    /// Join the active round (jackpot join / crash bet)
    Join {
        user_id: UserId,
        stake: Cents,
        response: oneshot::Sender<Result<JoinReceipt, RoundError>>,
    },

    /// Cash out of the active crash round
    Cashout {
        user_id: UserId,
        response: oneshot::Sender<Result<CashoutReceipt, RoundError>>,
    },

    /// Snapshot of the active round
    GetView {
        response: oneshot::Sender<RoundView>,
    },

    /// Subscribe to the game type's event stream
    Subscribe {
        response: oneshot::Sender<(SubscriberId, mpsc::Receiver<RoundEvent>)>,
    },

    /// Drop a subscription
    Unsubscribe { id: SubscriberId },

    /// Stop accepting stakes and freeze the clock (operational drain)
    Pause { response: oneshot::Sender<()> },

    /// Resume after a pause
    Resume { response: oneshot::Sender<()> },

    /// Shut the actor down
    Close { response: oneshot::Sender<()> },
}
