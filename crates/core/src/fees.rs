//! Round fee assessment.
//!
//! Fees come out of vault assets before the new share price is fixed, so
//! depositors absorb them pro-rata at redemption rather than at deposit.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const SECONDS_PER_YEAR: i64 = 365 * 24 * 3600;

/// Fee rates, mutable by the manager only between rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Annualized management fee rate (e.g., 0.02 = 2% per year).
    pub management_fee_rate: Decimal,
    /// Performance fee rate on positive round P&L (e.g., 0.20 = 20%).
    pub performance_fee_rate: Decimal,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            management_fee_rate: Decimal::new(2, 2),
            performance_fee_rate: Decimal::new(20, 2),
        }
    }
}

/// Fees assessed at one rollover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub management: Decimal,
    pub performance: Decimal,
}

impl FeeBreakdown {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.management + self.performance
    }
}

/// Assess rollover fees.
///
/// Management fee accrues on the previous round's locked capital, pro-rated
/// by elapsed time over a 365-day year, regardless of P&L. Performance fee
/// applies only to positive P&L versus the previous round's locked amount.
/// Both are zero when nothing was locked (the first round).
#[must_use]
pub fn assess_round_fees(
    config: &FeeConfig,
    gross_assets: Decimal,
    last_locked_amount: Decimal,
    elapsed: Duration,
) -> FeeBreakdown {
    if last_locked_amount <= Decimal::ZERO {
        return FeeBreakdown {
            management: Decimal::ZERO,
            performance: Decimal::ZERO,
        };
    }

    let elapsed_secs = Decimal::from(elapsed.num_seconds().max(0));
    let management = config.management_fee_rate * last_locked_amount * elapsed_secs
        / Decimal::from(SECONDS_PER_YEAR);

    let pnl = gross_assets - last_locked_amount;
    let performance = if pnl > Decimal::ZERO {
        config.performance_fee_rate * pnl
    } else {
        Decimal::ZERO
    };

    FeeBreakdown {
        management,
        performance,
    }
}
