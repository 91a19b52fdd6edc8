//! Strategy boundary.
//!
//! The vault hands a round's locked capital to a [`Strategy`] and takes it
//! back at round end. Strategies own their position bookkeeping exclusively;
//! the vault never reaches into it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use round_vault_market::{BoardId, OptionsMarket, PositionId, StrikeId};
use rust_decimal::Decimal;

use crate::error::StrategyError;

/// Result of a trade executed through a strategy.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub position_id: PositionId,
    /// Premium received (short open) or paid (long open / buyback).
    pub premium: Decimal,
    /// Collateral committed to the market by this trade.
    pub collateral_added: Decimal,
}

#[async_trait]
pub trait Strategy: Send + Sync {
    /// Funds currently held by the strategy, in the vault's asset.
    fn held_funds(&self) -> Decimal;

    /// Credits capital to the strategy (round handoff or settlement).
    fn receive_funds(&mut self, amount: Decimal);

    /// Accepts a board for the round; fails if the board is outside the
    /// strategy's expiry policy.
    async fn set_board(
        &mut self,
        board_id: BoardId,
        now: DateTime<Utc>,
        market: &mut dyn OptionsMarket,
    ) -> Result<(), StrategyError>;

    /// Validates and executes one trade against the active board.
    async fn do_trade(
        &mut self,
        strike_id: StrikeId,
        now: DateTime<Utc>,
        market: &mut dyn OptionsMarket,
    ) -> Result<TradeOutcome, StrategyError>;

    /// Partially closes a position, bounded by collateral coverage.
    async fn reduce_position(
        &mut self,
        position_id: PositionId,
        close_amount: Decimal,
        now: DateTime<Utc>,
        market: &mut dyn OptionsMarket,
    ) -> Result<TradeOutcome, StrategyError>;

    /// Returns all held funds to the caller and clears the strike cache.
    /// Fails if any tracked position is still active at the market.
    async fn return_funds_and_clear_strikes(
        &mut self,
        market: &mut dyn OptionsMarket,
    ) -> Result<Decimal, StrategyError>;
}
