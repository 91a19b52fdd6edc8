//! Error taxonomy for the vault core and the strategy boundary.
//!
//! Three classes, kept distinct on purpose: policy violations reject with a
//! specific reason and no state change, market rejections pass through
//! unchanged via `#[from]`, and invariant violations block a transition
//! outright.

use chrono::{DateTime, Utc};
use round_vault_market::{MarketError, PositionId, StrikeId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::shares::AccountId;

/// Errors from vault operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Caller is not the vault manager.
    #[error("Caller {caller} is not the vault manager")]
    Unauthorized { caller: AccountId },

    /// A round is already in progress.
    #[error("Round in progress")]
    RoundInProgress,

    /// No round is in progress.
    #[error("No round in progress")]
    RoundNotInProgress,

    /// Amount must be positive.
    #[error("Amount must be positive")]
    InvalidAmount,

    /// Deposit would push assets under management past the cap.
    #[error("Deposit would raise assets to {would_be}, above cap {cap}")]
    CapExceeded { would_be: Decimal, cap: Decimal },

    /// Caller's unlocked share balance cannot cover the request.
    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares {
        requested: Decimal,
        available: Decimal,
    },

    /// Requested more shares than the depositor's receipt can redeem.
    #[error("Redeem of {requested} exceeds redeemable {available}")]
    ExceedsRedeemable {
        requested: Decimal,
        available: Decimal,
    },

    /// A withdrawal queued in an earlier round must be completed first.
    #[error("Unresolved withdrawal from round {round} must be completed first")]
    WithdrawalPendingFromRound { round: u32 },

    /// Nothing is queued for withdrawal.
    #[error("No queued withdrawal")]
    NoQueuedWithdrawal,

    /// The withdrawal's round has not rolled over yet.
    #[error("Withdrawal round {round} has not rolled over")]
    WithdrawalNotRolled { round: u32 },

    /// Strategy still holds funds from the previous round.
    #[error("Strategy still holds {amount}; previous round's funds must be returned")]
    StrategyHoldingFunds { amount: Decimal },

    /// Assets went to zero while shares remain outstanding.
    #[error("Share price collapsed to zero")]
    SharePriceCollapsed,

    /// Strategy rejected the handoff or trade.
    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Errors from strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// No board has been set for the round.
    #[error("No active board set")]
    NoActiveBoard,

    /// Board failed strategy validation.
    #[error("Board {board_id} rejected: {reason}")]
    InvalidBoard { board_id: u64, reason: String },

    /// Per-strike trade cooldown has not elapsed.
    #[error("Cooldown active for strike {strike_id}; next trade at {next_trade_at}")]
    CooldownActive {
        strike_id: StrikeId,
        next_trade_at: DateTime<Utc>,
    },

    /// GWAV vol and spot vol have diverged past the configured bound.
    #[error("Vol variance {variance} exceeds maximum {max}")]
    VolVarianceExceeded { variance: Decimal, max: Decimal },

    /// Strike failed validity checks (expiry, vol band, or delta band).
    #[error("Invalid strike {strike_id}: {reason}")]
    InvalidStrike { strike_id: StrikeId, reason: String },

    /// Strategy does not hold enough funds for the required collateral.
    #[error("Insufficient strategy funds: need {required}, have {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// Position is not tracked by this strategy's strike cache.
    #[error("Position {position_id} is not tracked by this strategy")]
    PositionNotTracked { position_id: PositionId },

    /// Reduction beyond what collateral coverage allows.
    #[error("Close amount {requested} exceeds allowed {allowed}")]
    CloseExceedsAllowed {
        requested: Decimal,
        allowed: Decimal,
    },

    /// This strategy variant never reduces positions.
    #[error("Position reduction is not supported by this strategy")]
    ReductionUnsupported,

    /// Funds cannot return while positions remain open at the market.
    #[error("{count} position(s) still active at the options market")]
    PositionsStillActive { count: usize },

    /// Market rejection, propagated unchanged.
    #[error(transparent)]
    Market(#[from] MarketError),
}
