//! Trade validation rules.
//!
//! Each rule either passes or rejects with the specific reason; rejections
//! leave no state behind. The pipeline order matters and is fixed by the
//! callers: cooldown, vol variance, then strike validity.

use chrono::{DateTime, Duration, Utc};
use round_vault_core::StrategyError;
use round_vault_market::{Board, OptionKind, Strike, StrikeId};
use rust_decimal::Decimal;

use crate::config::PolicyConfig;

/// Rejects trades on a strike until its cooldown has elapsed.
pub fn check_cooldown(
    strike_id: StrikeId,
    last_trade_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &PolicyConfig,
) -> Result<(), StrategyError> {
    let Some(last) = last_trade_at else {
        return Ok(());
    };
    let next_trade_at = last + Duration::seconds(config.min_trade_interval_secs);
    if now < next_trade_at {
        return Err(StrategyError::CooldownActive {
            strike_id,
            next_trade_at,
        });
    }
    Ok(())
}

/// Rejects trading during abrupt vol dislocations: the smoothed GWAV vol and
/// the spot vol must agree within the configured variance.
pub fn check_vol_variance(
    gwav_vol: Decimal,
    spot_vol: Decimal,
    config: &PolicyConfig,
) -> Result<(), StrategyError> {
    let variance = (gwav_vol - spot_vol).abs();
    if variance >= config.max_vol_variance {
        return Err(StrategyError::VolVarianceExceeded {
            variance,
            max: config.max_vol_variance,
        });
    }
    Ok(())
}

/// Validates a board for the round: tradable and inside the expiry window.
pub fn validate_board(
    board: &Board,
    now: DateTime<Utc>,
    config: &PolicyConfig,
) -> Result<(), StrategyError> {
    if board.frozen {
        return Err(StrategyError::InvalidBoard {
            board_id: board.id,
            reason: "board is frozen".to_string(),
        });
    }
    let seconds_to_expiry = (board.expiry - now).num_seconds();
    if seconds_to_expiry < config.min_time_to_expiry_secs {
        return Err(StrategyError::InvalidBoard {
            board_id: board.id,
            reason: format!("expires in {seconds_to_expiry}s, below policy minimum"),
        });
    }
    if seconds_to_expiry > config.max_time_to_expiry_secs {
        return Err(StrategyError::InvalidBoard {
            board_id: board.id,
            reason: format!("expires in {seconds_to_expiry}s, above policy maximum"),
        });
    }
    Ok(())
}

/// Validates a strike against the active board and the vol/delta bands.
pub fn validate_strike(
    strike: &Strike,
    active_expiry: DateTime<Utc>,
    spot_vol: Decimal,
    call_delta: Decimal,
    kind: OptionKind,
    config: &PolicyConfig,
) -> Result<(), StrategyError> {
    if strike.expiry != active_expiry {
        return Err(StrategyError::InvalidStrike {
            strike_id: strike.id,
            reason: "expiry does not match the active board".to_string(),
        });
    }
    if spot_vol < config.min_vol || spot_vol > config.max_vol {
        return Err(StrategyError::InvalidStrike {
            strike_id: strike.id,
            reason: format!(
                "implied vol {spot_vol} outside [{}, {}]",
                config.min_vol, config.max_vol
            ),
        });
    }
    let delta = option_delta(call_delta, kind).abs();
    if (delta - config.target_delta).abs() > config.max_delta_gap {
        return Err(StrategyError::InvalidStrike {
            strike_id: strike.id,
            reason: format!(
                "delta {delta} outside target {} +/- {}",
                config.target_delta, config.max_delta_gap
            ),
        });
    }
    Ok(())
}

/// Sign-adjusted delta for the traded kind. Markets quote call delta; the
/// put delta is `call_delta - 1`.
#[must_use]
pub fn option_delta(call_delta: Decimal, kind: OptionKind) -> Decimal {
    match kind {
        OptionKind::Call => call_delta,
        OptionKind::Put => call_delta - Decimal::ONE,
    }
}
