//! Core types for the options-market boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type BoardId = u64;
pub type StrikeId = u64;
pub type PositionId = u64;

/// Option kind (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
        }
    }
}

/// Direction of a trade from the caller's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

/// An expiry board: a set of strikes sharing one expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub expiry: DateTime<Utc>,
    pub strike_ids: Vec<StrikeId>,
    /// Frozen boards reject all new trades.
    pub frozen: bool,
}

/// A single listed strike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strike {
    pub id: StrikeId,
    pub board_id: BoardId,
    pub strike_price: Decimal,
    pub expiry: DateTime<Utc>,
}

/// Lifecycle state of a position at the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionState {
    Active,
    Closed,
    Liquidated,
    Settled,
}

impl PositionState {
    /// True once the market considers the position finished.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// A position held at the market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub strike_id: StrikeId,
    pub kind: OptionKind,
    pub direction: TradeDirection,
    pub amount: Decimal,
    pub collateral: Decimal,
    pub state: PositionState,
}

/// Parameters for opening, adding to, or closing a position.
///
/// `min_total_cost`/`max_total_cost` are the caller's price-protection bounds:
/// the market rejects the trade if the executed premium falls outside them.
#[derive(Debug, Clone)]
pub struct TradeInput {
    pub strike_id: StrikeId,
    /// Existing position to modify, or `None` to open a new one.
    pub position_id: Option<PositionId>,
    pub kind: OptionKind,
    pub direction: TradeDirection,
    pub amount: Decimal,
    /// Absolute collateral the position should hold after the trade.
    pub set_collateral_to: Decimal,
    pub min_total_cost: Decimal,
    pub max_total_cost: Decimal,
}

/// Result of an executed trade.
#[derive(Debug, Clone)]
pub struct TradeResult {
    pub position_id: PositionId,
    /// Premium exchanged: received by the caller on a short open,
    /// paid by the caller on a long open or a buyback.
    pub total_cost: Decimal,
    /// Collateral moved into the market (positive) or returned (negative).
    pub collateral_delta: Decimal,
}

/// Spot and quote/base exchange parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeParams {
    pub spot_price: Decimal,
    /// Base asset received per unit of quote asset exchanged.
    pub quote_to_base_rate: Decimal,
    pub exchange_fee_rate: Decimal,
}

/// Market-wide trade limit parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParams {
    /// Normal closes require `cutoff <= |delta| <= 1 - cutoff`.
    pub force_close_delta_cutoff: Decimal,
    /// Normal closes require at least this long to expiry.
    pub force_close_seconds_to_expiry: i64,
    /// Premium penalty applied by the force-close path.
    pub force_close_penalty: Decimal,
}
