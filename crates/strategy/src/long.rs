//! Premium-buying strategy.
//!
//! Buys options with the round's capital. Longs post no collateral, so the
//! only sizing constraint is the cash needed for the worst-case premium, and
//! positions are never reduced mid-round; they ride to settlement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use round_vault_core::{Strategy, StrategyError, TradeOutcome};
use round_vault_market::{
    Board, BoardId, OptionsMarket, PositionId, PositionState, StrikeId, TradeDirection,
    TradeInput,
};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::{PolicyConfig, StrategyConfig};
use crate::policy;
use crate::strikes::StrikeCache;

pub struct LongStrategy {
    config: StrategyConfig,
    policy: PolicyConfig,
    active_board: Option<Board>,
    cache: StrikeCache,
    funds: Decimal,
}

impl LongStrategy {
    #[must_use]
    pub fn new(config: StrategyConfig, policy: PolicyConfig) -> Self {
        Self {
            config,
            policy,
            active_board: None,
            cache: StrikeCache::new(),
            funds: Decimal::ZERO,
        }
    }
}

#[async_trait]
impl Strategy for LongStrategy {
    fn held_funds(&self) -> Decimal {
        self.funds
    }

    fn receive_funds(&mut self, amount: Decimal) {
        self.funds += amount;
    }

    async fn set_board(
        &mut self,
        board_id: BoardId,
        now: DateTime<Utc>,
        market: &mut dyn OptionsMarket,
    ) -> Result<(), StrategyError> {
        if !self.cache.is_empty() {
            return Err(StrategyError::InvalidBoard {
                board_id,
                reason: "previous round's strikes have not been cleared".to_string(),
            });
        }
        let board = market.get_board(board_id).await?;
        policy::validate_board(&board, now, &self.policy)?;
        info!(board_id, expiry = %board.expiry, "Board accepted for round");
        self.active_board = Some(board);
        Ok(())
    }

    async fn do_trade(
        &mut self,
        strike_id: StrikeId,
        now: DateTime<Utc>,
        market: &mut dyn OptionsMarket,
    ) -> Result<TradeOutcome, StrategyError> {
        let board_expiry = self
            .active_board
            .as_ref()
            .ok_or(StrategyError::NoActiveBoard)?
            .expiry;

        policy::check_cooldown(strike_id, self.cache.last_trade_at(strike_id), now, &self.policy)?;

        let spot_vol = market.get_vols(strike_id).await?;
        let gwav_vol = market.vol_gwav(strike_id, self.policy.gwav_period_secs).await?;
        policy::check_vol_variance(gwav_vol, spot_vol, &self.policy)?;

        let strike = market.get_strike(strike_id).await?;
        let call_delta = market.get_deltas(strike_id).await?;
        policy::validate_strike(
            &strike,
            board_expiry,
            spot_vol,
            call_delta,
            self.config.kind,
            &self.policy,
        )?;

        // Never pay above the fair premium at the top of the vol band, and
        // only trade if the worst case is affordable.
        let max_total_cost = market
            .get_pure_premium(strike_id, self.config.kind, self.policy.max_vol, self.config.trade_size)
            .await?;
        if max_total_cost > self.funds {
            return Err(StrategyError::InsufficientFunds {
                required: max_total_cost,
                available: self.funds,
            });
        }

        let existing_id = self.cache.position_for_strike(strike_id);
        let result = market
            .open_position(TradeInput {
                strike_id,
                position_id: existing_id,
                kind: self.config.kind,
                direction: TradeDirection::Long,
                amount: self.config.trade_size,
                set_collateral_to: Decimal::ZERO,
                min_total_cost: Decimal::ZERO,
                max_total_cost,
            })
            .await?;

        self.funds -= result.total_cost;
        self.cache.record_trade(strike_id, result.position_id, now);

        info!(
            strike_id,
            position_id = result.position_id,
            premium = %result.total_cost,
            "Bought options"
        );
        Ok(TradeOutcome {
            position_id: result.position_id,
            premium: result.total_cost,
            collateral_added: Decimal::ZERO,
        })
    }

    async fn reduce_position(
        &mut self,
        _position_id: PositionId,
        _close_amount: Decimal,
        _now: DateTime<Utc>,
        _market: &mut dyn OptionsMarket,
    ) -> Result<TradeOutcome, StrategyError> {
        Err(StrategyError::ReductionUnsupported)
    }

    async fn return_funds_and_clear_strikes(
        &mut self,
        market: &mut dyn OptionsMarket,
    ) -> Result<Decimal, StrategyError> {
        let mut active = 0;
        for (_, position_id) in self.cache.tracked_positions() {
            let position = market.get_position(position_id).await?;
            if position.state == PositionState::Active {
                active += 1;
            }
        }
        if active > 0 {
            return Err(StrategyError::PositionsStillActive { count: active });
        }

        for strike_id in self.cache.active_strike_ids() {
            self.cache.remove(strike_id);
        }
        self.active_board = None;

        let returned = self.funds;
        self.funds = Decimal::ZERO;
        info!(%returned, "Returned round funds");
        Ok(returned)
    }
}
