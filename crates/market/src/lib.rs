//! Options-market boundary.
//!
//! The vault consumes an external options market for pricing, greeks, and
//! trade execution; it never reimplements them. [`OptionsMarket`] is that
//! boundary, and [`sim::SimMarket`] is a deterministic in-memory
//! implementation used by tests and the demo binary.

pub mod error;
pub mod sim;
pub mod types;

use async_trait::async_trait;
use rust_decimal::Decimal;

pub use error::MarketError;
pub use types::{
    Board, BoardId, ExchangeParams, MarketParams, OptionKind, Position, PositionId,
    PositionState, Strike, StrikeId, TradeDirection, TradeInput, TradeResult,
};

/// The external options-market collaborator.
///
/// Read methods expose market data and pricing; the four mutating methods
/// execute trades. Implementations are expected to be transactional per call:
/// a returned error means no state changed.
#[async_trait]
pub trait OptionsMarket: Send + Sync {
    async fn get_board(&self, board_id: BoardId) -> Result<Board, MarketError>;

    async fn get_strike(&self, strike_id: StrikeId) -> Result<Strike, MarketError>;

    /// Current spot implied volatility for a strike.
    async fn get_vols(&self, strike_id: StrikeId) -> Result<Decimal, MarketError>;

    /// Geometric-weighted average volatility over a lookback period.
    async fn vol_gwav(&self, strike_id: StrikeId, period_secs: i64)
        -> Result<Decimal, MarketError>;

    /// Call delta for a strike. Put delta is `call_delta - 1`.
    async fn get_deltas(&self, strike_id: StrikeId) -> Result<Decimal, MarketError>;

    async fn get_position(&self, position_id: PositionId) -> Result<Position, MarketError>;

    async fn get_exchange_params(&self) -> Result<ExchangeParams, MarketError>;

    async fn get_market_params(&self) -> Result<MarketParams, MarketError>;

    /// Minimum collateral the market requires for a short of `amount` units.
    async fn get_min_collateral(
        &self,
        strike_id: StrikeId,
        kind: OptionKind,
        amount: Decimal,
    ) -> Result<Decimal, MarketError>;

    /// Black-Scholes premium per the market's pricer at the given vol,
    /// for `amount` units.
    async fn get_pure_premium(
        &self,
        strike_id: StrikeId,
        kind: OptionKind,
        vol: Decimal,
        amount: Decimal,
    ) -> Result<Decimal, MarketError>;

    async fn open_position(&mut self, input: TradeInput) -> Result<TradeResult, MarketError>;

    async fn close_position(&mut self, input: TradeInput) -> Result<TradeResult, MarketError>;

    /// Close regardless of the safe-close window, accepting penalized pricing.
    async fn force_close_position(
        &mut self,
        input: TradeInput,
    ) -> Result<TradeResult, MarketError>;

    /// Swap an exact quote-asset amount into base, enforcing a
    /// minimum-received guard.
    async fn exchange_from_exact_quote(
        &mut self,
        quote_amount: Decimal,
        min_base_received: Decimal,
    ) -> Result<Decimal, MarketError>;
}
