//! Collateral sizing for short strategies.
//!
//! The sizing path only ever adds collateral: the target is the maximum of a
//! buffered market minimum, a leverage target, and whatever is already
//! posted.

use round_vault_market::OptionKind;
use rust_decimal::Decimal;

/// Full (maximum-loss) collateral for newly added short exposure: strike
/// value for cash-secured puts, spot value for covered calls.
#[must_use]
pub fn full_collateral(
    kind: OptionKind,
    strike_price: Decimal,
    spot_price: Decimal,
    amount: Decimal,
) -> Decimal {
    match kind {
        OptionKind::Call => spot_price * amount,
        OptionKind::Put => strike_price * amount,
    }
}

/// Absolute collateral a short position should hold after a trade.
///
/// Monotone in each argument and never below `existing_collateral`.
#[must_use]
pub fn required_collateral(
    min_collateral: Decimal,
    full_collateral_added: Decimal,
    existing_collateral: Decimal,
    collat_buffer: Decimal,
    collat_percent: Decimal,
) -> Decimal {
    let buffered_min = min_collateral * collat_buffer;
    let leverage_target = existing_collateral + collat_percent * full_collateral_added;
    buffered_min.max(leverage_target).max(existing_collateral)
}

/// How much of a position may be closed before remaining collateral would
/// drop below the buffered per-unit minimum. Zero for safe positions.
#[must_use]
pub fn allowed_close_amount(
    position_amount: Decimal,
    collateral: Decimal,
    min_collat_per_unit: Decimal,
) -> Decimal {
    if min_collat_per_unit <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if collateral >= min_collat_per_unit * position_amount {
        return Decimal::ZERO;
    }
    position_amount - collateral / min_collat_per_unit
}
