//! Premium-selling strategy.
//!
//! Sells options against the round's capital, posting collateral per the
//! sizing rules in [`crate::collateral`] and gating every trade through the
//! policy pipeline. One strategy instance serves one vault round at a time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use round_vault_core::{Strategy, StrategyError, TradeOutcome};
use round_vault_market::{
    Board, BoardId, OptionsMarket, PositionId, PositionState, StrikeId, TradeDirection,
    TradeInput,
};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::collateral::{allowed_close_amount, full_collateral, required_collateral};
use crate::config::{PolicyConfig, StrategyConfig};
use crate::policy;
use crate::strikes::StrikeCache;

pub struct ShortStrategy {
    config: StrategyConfig,
    policy: PolicyConfig,
    active_board: Option<Board>,
    cache: StrikeCache,
    /// Free capital in the vault's asset.
    funds: Decimal,
    /// Premiums collected in the market's quote asset, awaiting conversion
    /// at round end. Stays zero when premiums settle in the vault asset.
    premium_funds: Decimal,
}

impl ShortStrategy {
    #[must_use]
    pub fn new(config: StrategyConfig, policy: PolicyConfig) -> Self {
        Self {
            config,
            policy,
            active_board: None,
            cache: StrikeCache::new(),
            funds: Decimal::ZERO,
            premium_funds: Decimal::ZERO,
        }
    }

    fn active_board(&self) -> Result<&Board, StrategyError> {
        self.active_board.as_ref().ok_or(StrategyError::NoActiveBoard)
    }

    /// Active position on a strike, if the market still reports one.
    async fn active_position(
        &self,
        strike_id: StrikeId,
        market: &dyn OptionsMarket,
    ) -> Result<Option<round_vault_market::Position>, StrategyError> {
        let Some(position_id) = self.cache.position_for_strike(strike_id) else {
            return Ok(None);
        };
        let position = market.get_position(position_id).await?;
        Ok((position.state == PositionState::Active).then_some(position))
    }

    async fn count_active_positions(
        &self,
        market: &dyn OptionsMarket,
    ) -> Result<usize, StrategyError> {
        let mut count = 0;
        for (_, position_id) in self.cache.tracked_positions() {
            let position = market.get_position(position_id).await?;
            if position.state == PositionState::Active {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Converts quote-asset premiums back to the vault asset, guarding the
    /// swap with the configured slippage tolerance.
    async fn convert_premiums(
        &mut self,
        market: &mut dyn OptionsMarket,
    ) -> Result<(), StrategyError> {
        if self.premium_funds.is_zero() {
            return Ok(());
        }
        let params = market.get_exchange_params().await?;
        let expected = self.premium_funds
            * params.quote_to_base_rate
            * (Decimal::ONE - params.exchange_fee_rate);
        let min_received = expected * (Decimal::ONE - self.config.exchange_slippage);
        let received = market
            .exchange_from_exact_quote(self.premium_funds, min_received)
            .await?;
        info!(quote = %self.premium_funds, %received, "Converted round premiums");
        self.funds += received;
        self.premium_funds = Decimal::ZERO;
        Ok(())
    }
}

#[async_trait]
impl Strategy for ShortStrategy {
    fn held_funds(&self) -> Decimal {
        self.funds + self.premium_funds
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
        let board_expiry = self.active_board()?.expiry;

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

        let existing = self.active_position(strike_id, market).await?;
        let (existing_id, existing_collateral) = existing
            .as_ref()
            .map(|p| (Some(p.id), p.collateral))
            .unwrap_or((None, Decimal::ZERO));
        let existing_amount = existing.map(|p| p.amount).unwrap_or(Decimal::ZERO);

        let new_amount = existing_amount + self.config.trade_size;
        let min_collateral = market
            .get_min_collateral(strike_id, self.config.kind, new_amount)
            .await?;
        let exchange = market.get_exchange_params().await?;
        let full_added = full_collateral(
            self.config.kind,
            strike.strike_price,
            exchange.spot_price,
            self.config.trade_size,
        );
        let target_collateral = required_collateral(
            min_collateral,
            full_added,
            existing_collateral,
            self.config.collat_buffer,
            self.config.collat_percent,
        );
        let collateral_needed = target_collateral - existing_collateral;
        if collateral_needed > self.funds {
            return Err(StrategyError::InsufficientFunds {
                required: collateral_needed,
                available: self.funds,
            });
        }

        // Never sell below the fair premium at the bottom of the vol band.
        let min_total_cost = market
            .get_pure_premium(strike_id, self.config.kind, self.policy.min_vol, self.config.trade_size)
            .await?;

        let result = market
            .open_position(TradeInput {
                strike_id,
                position_id: existing_id,
                kind: self.config.kind,
                direction: TradeDirection::Short,
                amount: self.config.trade_size,
                set_collateral_to: target_collateral,
                min_total_cost,
                max_total_cost: Decimal::MAX,
            })
            .await?;

        self.funds -= result.collateral_delta;
        if self.config.premium_in_vault_asset {
            self.funds += result.total_cost;
        } else {
            self.premium_funds += result.total_cost;
        }
        self.cache.record_trade(strike_id, result.position_id, now);

        info!(
            strike_id,
            position_id = result.position_id,
            premium = %result.total_cost,
            collateral = %result.collateral_delta,
            "Sold options"
        );
        Ok(TradeOutcome {
            position_id: result.position_id,
            premium: result.total_cost,
            collateral_added: result.collateral_delta,
        })
    }

    async fn reduce_position(
        &mut self,
        position_id: PositionId,
        close_amount: Decimal,
        now: DateTime<Utc>,
        market: &mut dyn OptionsMarket,
    ) -> Result<TradeOutcome, StrategyError> {
        let strike_id = self
            .cache
            .strike_for_position(position_id)
            .ok_or(StrategyError::PositionNotTracked { position_id })?;
        let position = market.get_position(position_id).await?;

        let buffered_per_unit = market
            .get_min_collateral(strike_id, position.kind, Decimal::ONE)
            .await?
            * self.config.collat_buffer;
        let allowed = allowed_close_amount(position.amount, position.collateral, buffered_per_unit);
        if close_amount > allowed {
            return Err(StrategyError::CloseExceedsAllowed {
                requested: close_amount,
                allowed,
            });
        }

        // Partial closes keep the posted collateral; a full close releases it.
        let remaining = position.amount - close_amount;
        let set_collateral_to = if remaining.is_zero() {
            Decimal::ZERO
        } else {
            position.collateral
        };

        // Never buy back above the fair premium at the top of the vol band.
        let mut max_total_cost = market
            .get_pure_premium(strike_id, position.kind, self.policy.max_vol, close_amount)
            .await?;

        let strike = market.get_strike(strike_id).await?;
        let params = market.get_market_params().await?;
        let delta = policy::option_delta(market.get_deltas(strike_id).await?, position.kind).abs();
        let seconds_to_expiry = (strike.expiry - now).num_seconds();
        let in_safe_window = delta >= params.force_close_delta_cutoff
            && delta <= Decimal::ONE - params.force_close_delta_cutoff
            && seconds_to_expiry >= params.force_close_seconds_to_expiry;
        if !in_safe_window {
            max_total_cost *= Decimal::ONE + params.force_close_penalty;
        }
        if max_total_cost > self.funds {
            return Err(StrategyError::InsufficientFunds {
                required: max_total_cost,
                available: self.funds,
            });
        }

        let input = TradeInput {
            strike_id,
            position_id: Some(position_id),
            kind: position.kind,
            direction: TradeDirection::Short,
            amount: close_amount,
            set_collateral_to,
            min_total_cost: Decimal::ZERO,
            max_total_cost,
        };
        let result = if in_safe_window {
            market.close_position(input).await?
        } else {
            warn!(position_id, %delta, "Reducing outside the safe-close window");
            market.force_close_position(input).await?
        };

        self.funds -= result.total_cost;
        self.funds -= result.collateral_delta;
        if remaining.is_zero() {
            self.cache.clear_position(strike_id);
        }

        info!(
            position_id,
            closed = %close_amount,
            cost = %result.total_cost,
            "Reduced position"
        );
        Ok(TradeOutcome {
            position_id,
            premium: result.total_cost,
            collateral_added: result.collateral_delta,
        })
    }

    async fn return_funds_and_clear_strikes(
        &mut self,
        market: &mut dyn OptionsMarket,
    ) -> Result<Decimal, StrategyError> {
        let active = self.count_active_positions(market).await?;
        if active > 0 {
            return Err(StrategyError::PositionsStillActive { count: active });
        }

        self.convert_premiums(market).await?;

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
