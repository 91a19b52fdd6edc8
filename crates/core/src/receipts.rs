//! Per-depositor receipts.
//!
//! One deposit receipt and at most one unresolved withdrawal receipt per
//! account. Receipts are zeroed, never deleted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tracks a depositor's pending deposit and already-convertible shares.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Round of the most recent deposit.
    pub round: u32,
    /// Amount deposited in that round, not yet converted to shares.
    pub amount: Decimal,
    /// Shares minted at earlier rollovers, claimable via `redeem`.
    pub unredeemed_shares: Decimal,
}

/// Tracks shares a depositor has queued for withdrawal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    /// Round in which the withdrawal was initiated.
    pub round: u32,
    /// Shares queued for redemption at that round's frozen price.
    pub shares: Decimal,
}

impl WithdrawalReceipt {
    /// An unresolved receipt blocks new withdrawal initiations in later
    /// rounds until completed.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.shares > Decimal::ZERO
    }
}
