//! Strategy and policy configuration.

use round_vault_market::OptionKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bounds the trade-validation pipeline enforces on every trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Minimum seconds between trades on the same strike.
    pub min_trade_interval_secs: i64,
    /// Lookback period for the GWAV vol oracle read.
    pub gwav_period_secs: i64,
    /// Maximum allowed |gwavVol - spotVol| before trading halts on a strike.
    pub max_vol_variance: Decimal,
    /// Implied vol band for tradable strikes.
    pub min_vol: Decimal,
    pub max_vol: Decimal,
    /// Target absolute delta, sign-adjusted for calls vs puts.
    pub target_delta: Decimal,
    /// Tolerance around the target delta.
    pub max_delta_gap: Decimal,
    /// Acceptable board time-to-expiry window, in seconds.
    pub min_time_to_expiry_secs: i64,
    pub max_time_to_expiry_secs: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_trade_interval_secs: 600,
            gwav_period_secs: 3600,
            max_vol_variance: Decimal::new(10, 2),
            min_vol: Decimal::new(50, 2),
            max_vol: Decimal::new(150, 2),
            target_delta: Decimal::new(30, 2),
            max_delta_gap: Decimal::new(10, 2),
            min_time_to_expiry_secs: 24 * 3600,
            max_time_to_expiry_secs: 28 * 24 * 3600,
        }
    }
}

/// Per-strategy trade sizing and collateral parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Option kind this strategy trades.
    pub kind: OptionKind,
    /// Units sold or bought per `do_trade` call.
    pub trade_size: Decimal,
    /// Multiple applied to the market's minimum collateral (shorts only).
    pub collat_buffer: Decimal,
    /// Fraction of full collateral targeted per unit of new exposure.
    pub collat_percent: Decimal,
    /// Slippage tolerance for the round-end quote-to-base exchange.
    pub exchange_slippage: Decimal,
    /// False when premiums arrive in the market's quote asset and need
    /// converting back to the vault asset at round end.
    pub premium_in_vault_asset: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: OptionKind::Call,
            trade_size: Decimal::ONE,
            collat_buffer: Decimal::new(110, 2),
            collat_percent: Decimal::new(50, 2),
            exchange_slippage: Decimal::new(1, 2),
            premium_in_vault_asset: true,
        }
    }
}
