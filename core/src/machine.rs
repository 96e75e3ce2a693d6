use core::fmt;
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockReason {
    Unauthenticated,
    InsufficientBalance,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailReason {
    /// The card simply did not win.
    NoWin,
    /// Charging the round failed; the round is void.
    Settlement,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Idle,
    Ready,
    Scratching,
    FastReveal,
    Resolving,
    Success,
    Fail(FailReason),
    Locked(LockReason),
}

impl GameState {
    pub const fn is_entry(self) -> bool {
        matches!(self, Self::Idle | Self::Ready)
    }

    /// A round is on the table and has not been resolved yet.
    pub const fn is_in_round(self) -> bool {
        matches!(self, Self::Scratching | Self::FastReveal | Self::Resolving)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Success | Self::Fail(_))
    }

    pub const fn is_busy(self) -> bool {
        matches!(self, Self::FastReveal | Self::Resolving)
    }
}

/// What the player's wallet and session look like right now.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ActionContext {
    pub authenticated: bool,
    pub balance: Money,
    pub price: Money,
}

impl ActionContext {
    pub fn lock_reason(&self) -> Option<LockReason> {
        if !self.authenticated {
            Some(LockReason::Unauthenticated)
        } else if self.balance < self.price {
            Some(LockReason::InsufficientBalance)
        } else {
            None
        }
    }

    /// How much is missing to afford one card.
    pub fn shortfall(&self) -> Money {
        self.price.saturating_sub(self.balance)
    }
}

/// Idempotency key of one round's charge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundId {
    pub session: u64,
    pub seq: u64,
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}-{}", self.session, self.seq)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    NotRequested,
    Pending,
    Confirmed,
    Failed,
}

/// Side effect the caller has to carry out after a transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    None,
    RequestDeal,
    /// Reset the previous round's presentation, then deal.
    Replay,
    ForceReveal,
    AddBalance,
    Settle(RoundId),
}

/// Which affordance the primary control offers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Affordance {
    Play,
    RevealAll,
    Wait,
    PlayAgain,
    AddBalance,
    SignIn,
}

/// Drives the primary action control through a round: deal, scratch,
/// reveal, settle and resolve.
#[derive(Clone, Debug)]
pub struct ScratchMachine {
    state: GameState,
    session: u64,
    next_seq: u64,
    round: Option<RoundId>,
    settlement: Settlement,
    awaiting_deal: bool,
    outcome: Option<bool>,
}

impl ScratchMachine {
    pub fn new(session: u64) -> Self {
        Self {
            state: GameState::Idle,
            session,
            next_seq: 0,
            round: None,
            settlement: Settlement::NotRequested,
            awaiting_deal: false,
            outcome: None,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn round(&self) -> Option<RoundId> {
        self.round
    }

    pub fn settlement(&self) -> Settlement {
        self.settlement
    }

    pub fn is_awaiting_deal(&self) -> bool {
        self.awaiting_deal
    }

    /// Whether the primary control reacts at all.
    pub fn is_enabled(&self) -> bool {
        !self.awaiting_deal
            && !self.state.is_busy()
            && self.state != GameState::Locked(LockReason::Unauthenticated)
    }

    pub fn affordance(&self) -> Affordance {
        use GameState::*;
        if self.awaiting_deal {
            return Affordance::Wait;
        }
        match self.state {
            Idle | Ready => Affordance::Play,
            Scratching => Affordance::RevealAll,
            FastReveal | Resolving => Affordance::Wait,
            Success | Fail(_) => Affordance::PlayAgain,
            Locked(LockReason::InsufficientBalance) => Affordance::AddBalance,
            Locked(LockReason::Unauthenticated) => Affordance::SignIn,
        }
    }

    /// Re-evaluates the lock against the current wallet and session.
    ///
    /// A paid round keeps going when the balance drops under the price; only
    /// losing the session interrupts it.
    pub fn refresh_lock(&mut self, ctx: &ActionContext) {
        use GameState::*;
        let next = match (self.state, ctx.lock_reason()) {
            (Locked(_), None) => Ready,
            (Locked(_), Some(reason)) => Locked(reason),
            (state, Some(LockReason::InsufficientBalance)) if state.is_in_round() => state,
            (state, Some(LockReason::InsufficientBalance)) if self.awaiting_deal => state,
            (_, Some(reason)) => Locked(reason),
            (state, None) => state,
        };
        if next != self.state {
            log::debug!("lock refresh: {:?} -> {:?}", self.state, next);
            if matches!(next, Locked(LockReason::Unauthenticated)) {
                self.abandon_round();
            }
            self.state = next;
        }
    }

    /// Activation of the primary control.
    pub fn primary_action(&mut self, ctx: &ActionContext) -> Command {
        use GameState::*;

        self.refresh_lock(ctx);
        if self.awaiting_deal {
            log::trace!("primary action ignored, deal in flight");
            return Command::None;
        }

        match self.state {
            Idle | Ready => {
                self.awaiting_deal = true;
                Command::RequestDeal
            }
            Scratching => {
                self.state = FastReveal;
                Command::ForceReveal
            }
            FastReveal | Resolving => Command::None,
            Success | Fail(_) => {
                self.reset();
                self.awaiting_deal = true;
                Command::Replay
            }
            Locked(LockReason::InsufficientBalance) => Command::AddBalance,
            Locked(LockReason::Unauthenticated) => Command::None,
        }
    }

    /// A card arrived for the outstanding deal request.
    pub fn deal_received(&mut self) -> bool {
        if !self.awaiting_deal {
            log::warn!("ignoring unsolicited deal");
            return false;
        }
        self.awaiting_deal = false;
        if matches!(self.state, GameState::Locked(_)) {
            return false;
        }

        self.round = Some(RoundId {
            session: self.session,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.settlement = Settlement::NotRequested;
        self.outcome = None;
        self.state = GameState::Scratching;
        true
    }

    pub fn deal_failed(&mut self) {
        self.awaiting_deal = false;
        if !matches!(self.state, GameState::Locked(_)) {
            self.state = GameState::Ready;
        }
    }

    /// The player started erasing; charges the round once.
    pub fn scratch_started(&mut self) -> Command {
        if self.state != GameState::Scratching {
            return Command::None;
        }
        self.request_settlement()
    }

    /// An auto or forced reveal animation began.
    pub fn reveal_started(&mut self) -> Command {
        if !matches!(self.state, GameState::Scratching | GameState::FastReveal) {
            return Command::None;
        }
        self.state = GameState::FastReveal;
        self.request_settlement()
    }

    /// The card has been decided locally; waits for settlement if needed.
    pub fn reveal_finished(&mut self, won: bool) -> Command {
        if !self.state.is_in_round() {
            return Command::None;
        }
        self.outcome = Some(won);
        self.state = GameState::Resolving;
        let command = self.request_settlement();
        self.try_finish();
        command
    }

    pub fn settle_confirmed(&mut self, round: RoundId) {
        if self.round != Some(round) || self.settlement != Settlement::Pending {
            log::debug!("stale settlement confirmation for {round}");
            return;
        }
        self.settlement = Settlement::Confirmed;
        self.try_finish();
    }

    pub fn settle_failed(&mut self, round: RoundId) {
        if self.round != Some(round) || self.settlement != Settlement::Pending {
            log::debug!("stale settlement failure for {round}");
            return;
        }
        self.settlement = Settlement::Failed;
        if self.state.is_in_round() {
            self.state = GameState::Fail(FailReason::Settlement);
        }
    }

    /// Forgets the finished round, back to an entry state.
    pub fn reset(&mut self) {
        if !matches!(self.state, GameState::Locked(_)) {
            self.state = GameState::Ready;
        }
        self.round = None;
        self.settlement = Settlement::NotRequested;
        self.awaiting_deal = false;
        self.outcome = None;
    }

    fn abandon_round(&mut self) {
        self.round = None;
        self.settlement = Settlement::NotRequested;
        self.awaiting_deal = false;
        self.outcome = None;
    }

    fn request_settlement(&mut self) -> Command {
        match (self.settlement, self.round) {
            (Settlement::NotRequested, Some(round)) => {
                self.settlement = Settlement::Pending;
                Command::Settle(round)
            }
            _ => Command::None,
        }
    }

    fn try_finish(&mut self) {
        if self.state != GameState::Resolving || self.settlement != Settlement::Confirmed {
            return;
        }
        if let Some(won) = self.outcome {
            self.state = if won {
                GameState::Success
            } else {
                GameState::Fail(FailReason::NoWin)
            };
            log::info!("round resolved: {:?}", self.state);
        }
    }
}
