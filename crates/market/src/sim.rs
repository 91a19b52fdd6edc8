//! Deterministic in-memory options market.
//!
//! Fills trades against configured vols, deltas, and premiums without any
//! external venue. Useful for exercising the full vault pipeline under test;
//! also drives the demo binary.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::error::MarketError;
use crate::types::{
    Board, BoardId, ExchangeParams, MarketParams, OptionKind, Position, PositionId,
    PositionState, Strike, StrikeId, TradeDirection, TradeInput, TradeResult,
};
use crate::OptionsMarket;

/// Per-strike quote configuration.
#[derive(Debug, Clone)]
pub struct StrikeQuote {
    pub spot_vol: Decimal,
    pub gwav_vol: Decimal,
    /// Call delta; put delta is derived as `call_delta - 1`.
    pub call_delta: Decimal,
    /// Premium per unit at `spot_vol`. Scales linearly with executed vol.
    pub premium_per_unit: Decimal,
    /// Market-mandated minimum collateral per unit of short exposure.
    pub min_collateral_per_unit: Decimal,
}

#[derive(Debug, Clone)]
struct SimStrike {
    strike: Strike,
    quote: StrikeQuote,
}

/// Deterministic simulated options market.
pub struct SimMarket {
    now: DateTime<Utc>,
    boards: HashMap<BoardId, Board>,
    strikes: HashMap<StrikeId, SimStrike>,
    positions: HashMap<PositionId, Position>,
    next_position_id: PositionId,
    exchange_params: ExchangeParams,
    market_params: MarketParams,
}

impl SimMarket {
    #[must_use]
    pub fn new(now: DateTime<Utc>, spot_price: Decimal) -> Self {
        Self {
            now,
            boards: HashMap::new(),
            strikes: HashMap::new(),
            positions: HashMap::new(),
            next_position_id: 1,
            exchange_params: ExchangeParams {
                spot_price,
                quote_to_base_rate: Decimal::ONE,
                exchange_fee_rate: Decimal::ZERO,
            },
            market_params: MarketParams {
                force_close_delta_cutoff: Decimal::new(15, 2),
                force_close_seconds_to_expiry: 6 * 3600,
                force_close_penalty: Decimal::new(10, 2),
            },
        }
    }

    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    pub fn set_exchange_params(&mut self, params: ExchangeParams) {
        self.exchange_params = params;
    }

    pub fn set_market_params(&mut self, params: MarketParams) {
        self.market_params = params;
    }

    pub fn add_board(&mut self, id: BoardId, expiry: DateTime<Utc>) {
        self.boards.insert(
            id,
            Board {
                id,
                expiry,
                strike_ids: Vec::new(),
                frozen: false,
            },
        );
    }

    /// Lists a strike on an existing board.
    ///
    /// # Panics
    ///
    /// Panics if the board has not been added; this is test/demo setup code.
    pub fn add_strike(
        &mut self,
        id: StrikeId,
        board_id: BoardId,
        strike_price: Decimal,
        quote: StrikeQuote,
    ) {
        let board = self.boards.get_mut(&board_id).expect("board must exist");
        board.strike_ids.push(id);
        self.strikes.insert(
            id,
            SimStrike {
                strike: Strike {
                    id,
                    board_id,
                    strike_price,
                    expiry: board.expiry,
                },
                quote,
            },
        );
    }

    pub fn freeze_board(&mut self, board_id: BoardId) {
        if let Some(board) = self.boards.get_mut(&board_id) {
            board.frozen = true;
        }
    }

    pub fn set_spot_vol(&mut self, strike_id: StrikeId, vol: Decimal) {
        if let Some(s) = self.strikes.get_mut(&strike_id) {
            s.quote.spot_vol = vol;
        }
    }

    pub fn set_gwav_vol(&mut self, strike_id: StrikeId, vol: Decimal) {
        if let Some(s) = self.strikes.get_mut(&strike_id) {
            s.quote.gwav_vol = vol;
        }
    }

    pub fn set_call_delta(&mut self, strike_id: StrikeId, delta: Decimal) {
        if let Some(s) = self.strikes.get_mut(&strike_id) {
            s.quote.call_delta = delta;
        }
    }

    pub fn set_min_collateral_per_unit(&mut self, strike_id: StrikeId, per_unit: Decimal) {
        if let Some(s) = self.strikes.get_mut(&strike_id) {
            s.quote.min_collateral_per_unit = per_unit;
        }
    }

    /// Settles every active position on a board at the given price and marks
    /// them terminal. Returns the total amount owed back to the position
    /// holder: remaining collateral net of payouts for shorts, the payout
    /// itself for longs.
    pub fn settle_board(&mut self, board_id: BoardId, settlement_price: Decimal) -> Decimal {
        let mut owed = Decimal::ZERO;
        for position in self.positions.values_mut() {
            let Some(sim_strike) = self.strikes.get(&position.strike_id) else {
                continue;
            };
            if sim_strike.strike.board_id != board_id
                || position.state != PositionState::Active
            {
                continue;
            }
            let intrinsic = match position.kind {
                OptionKind::Call => {
                    (settlement_price - sim_strike.strike.strike_price).max(Decimal::ZERO)
                }
                OptionKind::Put => {
                    (sim_strike.strike.strike_price - settlement_price).max(Decimal::ZERO)
                }
            };
            let payout = intrinsic * position.amount;
            owed += match position.direction {
                TradeDirection::Short => (position.collateral - payout).max(Decimal::ZERO),
                TradeDirection::Long => payout,
            };
            position.state = PositionState::Settled;
            position.collateral = Decimal::ZERO;
        }
        info!(board_id, %settlement_price, %owed, "Board settled");
        owed
    }

    fn strike(&self, strike_id: StrikeId) -> Result<&SimStrike, MarketError> {
        self.strikes
            .get(&strike_id)
            .ok_or(MarketError::StrikeNotFound(strike_id))
    }

    fn premium(&self, strike_id: StrikeId, vol: Decimal, amount: Decimal) -> Result<Decimal, MarketError> {
        let quote = &self.strike(strike_id)?.quote;
        if quote.spot_vol.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(quote.premium_per_unit * vol / quote.spot_vol * amount)
    }

    fn check_bounds(
        total_cost: Decimal,
        min: Decimal,
        max: Decimal,
    ) -> Result<(), MarketError> {
        if total_cost < min || total_cost > max {
            return Err(MarketError::TotalCostOutsideBounds {
                total_cost,
                min,
                max,
            });
        }
        Ok(())
    }

    /// Whether a position can leave via the normal close path.
    fn in_safe_close_window(&self, position: &Position) -> Result<bool, MarketError> {
        let sim_strike = self.strike(position.strike_id)?;
        let delta = match position.kind {
            OptionKind::Call => sim_strike.quote.call_delta,
            OptionKind::Put => sim_strike.quote.call_delta - Decimal::ONE,
        }
        .abs();
        let cutoff = self.market_params.force_close_delta_cutoff;
        let seconds_to_expiry = (sim_strike.strike.expiry - self.now).num_seconds();
        Ok(delta >= cutoff
            && delta <= Decimal::ONE - cutoff
            && seconds_to_expiry >= self.market_params.force_close_seconds_to_expiry)
    }

    fn apply_close(
        &mut self,
        input: &TradeInput,
        total_cost: Decimal,
    ) -> Result<TradeResult, MarketError> {
        let position_id = input
            .position_id
            .ok_or(MarketError::InvalidAmount)?;
        let position = self
            .positions
            .get_mut(&position_id)
            .ok_or(MarketError::PositionNotFound(position_id))?;
        if position.state != PositionState::Active {
            return Err(MarketError::PositionNotActive(position_id));
        }
        if input.amount <= Decimal::ZERO || input.amount > position.amount {
            return Err(MarketError::InvalidAmount);
        }

        position.amount -= input.amount;
        let collateral_delta = if position.amount.is_zero() {
            let released = -position.collateral;
            position.collateral = Decimal::ZERO;
            position.state = PositionState::Closed;
            released
        } else {
            let delta = input.set_collateral_to - position.collateral;
            position.collateral = input.set_collateral_to;
            delta
        };

        Ok(TradeResult {
            position_id,
            total_cost,
            collateral_delta,
        })
    }
}

#[async_trait]
impl OptionsMarket for SimMarket {
    async fn get_board(&self, board_id: BoardId) -> Result<Board, MarketError> {
        self.boards
            .get(&board_id)
            .cloned()
            .ok_or(MarketError::BoardNotFound(board_id))
    }

    async fn get_strike(&self, strike_id: StrikeId) -> Result<Strike, MarketError> {
        Ok(self.strike(strike_id)?.strike.clone())
    }

    async fn get_vols(&self, strike_id: StrikeId) -> Result<Decimal, MarketError> {
        Ok(self.strike(strike_id)?.quote.spot_vol)
    }

    async fn vol_gwav(
        &self,
        strike_id: StrikeId,
        _period_secs: i64,
    ) -> Result<Decimal, MarketError> {
        Ok(self.strike(strike_id)?.quote.gwav_vol)
    }

    async fn get_deltas(&self, strike_id: StrikeId) -> Result<Decimal, MarketError> {
        Ok(self.strike(strike_id)?.quote.call_delta)
    }

    async fn get_position(&self, position_id: PositionId) -> Result<Position, MarketError> {
        self.positions
            .get(&position_id)
            .cloned()
            .ok_or(MarketError::PositionNotFound(position_id))
    }

    async fn get_exchange_params(&self) -> Result<ExchangeParams, MarketError> {
        Ok(self.exchange_params.clone())
    }

    async fn get_market_params(&self) -> Result<MarketParams, MarketError> {
        Ok(self.market_params.clone())
    }

    async fn get_min_collateral(
        &self,
        strike_id: StrikeId,
        _kind: OptionKind,
        amount: Decimal,
    ) -> Result<Decimal, MarketError> {
        Ok(self.strike(strike_id)?.quote.min_collateral_per_unit * amount)
    }

    async fn get_pure_premium(
        &self,
        strike_id: StrikeId,
        _kind: OptionKind,
        vol: Decimal,
        amount: Decimal,
    ) -> Result<Decimal, MarketError> {
        self.premium(strike_id, vol, amount)
    }

    async fn open_position(&mut self, input: TradeInput) -> Result<TradeResult, MarketError> {
        if input.amount <= Decimal::ZERO {
            return Err(MarketError::InvalidAmount);
        }
        let sim_strike = self.strike(input.strike_id)?.clone();
        let board = self
            .boards
            .get(&sim_strike.strike.board_id)
            .ok_or(MarketError::BoardNotFound(sim_strike.strike.board_id))?;
        if board.frozen {
            return Err(MarketError::BoardFrozen(board.id));
        }

        let total_cost = self.premium(input.strike_id, sim_strike.quote.spot_vol, input.amount)?;
        Self::check_bounds(total_cost, input.min_total_cost, input.max_total_cost)?;

        // Existing active position merges; anything else opens fresh.
        let existing = input
            .position_id
            .and_then(|id| self.positions.get(&id))
            .filter(|p| p.state == PositionState::Active)
            .map(|p| (p.id, p.amount, p.collateral));

        let (position_id, new_amount, old_collateral) = match existing {
            Some((id, amount, collateral)) => (id, amount + input.amount, collateral),
            None => {
                let id = self.next_position_id;
                self.next_position_id += 1;
                (id, input.amount, Decimal::ZERO)
            }
        };

        if input.direction == TradeDirection::Short {
            let min_required = sim_strike.quote.min_collateral_per_unit * new_amount;
            if input.set_collateral_to < min_required {
                return Err(MarketError::InsufficientCollateral {
                    provided: input.set_collateral_to,
                    min_required,
                });
            }
        }

        let collateral = match input.direction {
            TradeDirection::Short => input.set_collateral_to,
            TradeDirection::Long => Decimal::ZERO,
        };
        self.positions.insert(
            position_id,
            Position {
                id: position_id,
                strike_id: input.strike_id,
                kind: input.kind,
                direction: input.direction,
                amount: new_amount,
                collateral,
                state: PositionState::Active,
            },
        );

        info!(
            position_id,
            strike_id = input.strike_id,
            %total_cost,
            amount = %input.amount,
            "Position opened"
        );
        Ok(TradeResult {
            position_id,
            total_cost,
            collateral_delta: collateral - old_collateral,
        })
    }

    async fn close_position(&mut self, input: TradeInput) -> Result<TradeResult, MarketError> {
        let position_id = input
            .position_id
            .ok_or(MarketError::InvalidAmount)?;
        let position = self
            .positions
            .get(&position_id)
            .ok_or(MarketError::PositionNotFound(position_id))?
            .clone();
        if !self.in_safe_close_window(&position)? {
            return Err(MarketError::ForceCloseRequired(position_id));
        }
        let spot_vol = self.strike(input.strike_id)?.quote.spot_vol;
        let total_cost = self.premium(input.strike_id, spot_vol, input.amount)?;
        Self::check_bounds(total_cost, input.min_total_cost, input.max_total_cost)?;
        self.apply_close(&input, total_cost)
    }

    async fn force_close_position(
        &mut self,
        input: TradeInput,
    ) -> Result<TradeResult, MarketError> {
        let spot_vol = self.strike(input.strike_id)?.quote.spot_vol;
        let base_cost = self.premium(input.strike_id, spot_vol, input.amount)?;
        // Force closes execute at penalized pricing.
        let total_cost = base_cost * (Decimal::ONE + self.market_params.force_close_penalty);
        Self::check_bounds(total_cost, input.min_total_cost, input.max_total_cost)?;
        self.apply_close(&input, total_cost)
    }

    async fn exchange_from_exact_quote(
        &mut self,
        quote_amount: Decimal,
        min_base_received: Decimal,
    ) -> Result<Decimal, MarketError> {
        let received = quote_amount
            * self.exchange_params.quote_to_base_rate
            * (Decimal::ONE - self.exchange_params.exchange_fee_rate);
        if received < min_base_received {
            return Err(MarketError::SlippageExceeded {
                received,
                min_received: min_base_received,
            });
        }
        Ok(received)
    }
}
