//! Round-based vault state machine.
//!
//! A vault alternates between two states per round: Open (accepting
//! deposits and withdrawal initiations, manager may reconfigure) and Active
//! (capital locked with the strategy). Deposits and withdrawals queued in
//! round N all settle at one share price, frozen when round N rolls over.
//!
//! Capital is never double-counted: at any instant `locked_amount` (when
//! active) plus the idle balance equals assets under management.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use round_vault_market::{BoardId, OptionsMarket};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::VaultParams;
use crate::error::VaultError;
use crate::fees::{self, FeeConfig};
use crate::receipts::{DepositReceipt, WithdrawalReceipt};
use crate::shares::{AccountId, ShareLedger};
use crate::traits::Strategy;

/// A deployed vault instance. One per asset and strategy.
pub struct Vault {
    cap: Decimal,
    fees: FeeConfig,
    manager: AccountId,
    fee_recipient: AccountId,

    round: u32,
    round_in_progress: bool,
    idle_balance: Decimal,
    locked_amount: Decimal,
    last_locked_amount: Decimal,
    total_pending: Decimal,
    /// Shares queued this round, not yet priced.
    queued_withdraw_shares: Decimal,
    /// Shares priced at earlier rollovers, awaiting completion.
    reserved_withdraw_shares: Decimal,
    /// Assets frozen to back `reserved_withdraw_shares`.
    withdraw_reserve: Decimal,
    /// Share price frozen at each round's rollover.
    round_price: HashMap<u32, Decimal>,
    last_rollover_at: Option<DateTime<Utc>>,
    fees_collected: Decimal,

    shares: ShareLedger,
    deposit_receipts: HashMap<AccountId, DepositReceipt>,
    withdrawal_receipts: HashMap<AccountId, WithdrawalReceipt>,
}

impl Vault {
    #[must_use]
    pub fn new(params: VaultParams, fees: FeeConfig) -> Self {
        Self {
            cap: params.cap,
            fees,
            manager: AccountId::new(params.manager),
            fee_recipient: AccountId::new(params.fee_recipient),
            round: 1,
            round_in_progress: false,
            idle_balance: Decimal::ZERO,
            locked_amount: Decimal::ZERO,
            last_locked_amount: Decimal::ZERO,
            total_pending: Decimal::ZERO,
            queued_withdraw_shares: Decimal::ZERO,
            reserved_withdraw_shares: Decimal::ZERO,
            withdraw_reserve: Decimal::ZERO,
            round_price: HashMap::new(),
            last_rollover_at: None,
            fees_collected: Decimal::ZERO,
            shares: ShareLedger::new(),
            deposit_receipts: HashMap::new(),
            withdrawal_receipts: HashMap::new(),
        }
    }

    /// Internal custody account holding unredeemed and queued shares.
    fn custody() -> AccountId {
        AccountId::from("__vault_custody__")
    }

    fn ensure_manager(&self, caller: &AccountId) -> Result<(), VaultError> {
        if caller != &self.manager {
            return Err(VaultError::Unauthorized {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// Rolls a deposit receipt forward: once the deposit's round has rolled
    /// over, its amount converts to shares at that round's frozen price.
    fn settle_deposit_receipt(&mut self, caller: &AccountId) {
        let Some(receipt) = self.deposit_receipts.get_mut(caller) else {
            return;
        };
        if receipt.round >= self.round || receipt.amount <= Decimal::ZERO {
            return;
        }
        if let Some(price) = self.round_price.get(&receipt.round) {
            receipt.unredeemed_shares += receipt.amount / *price;
            receipt.amount = Decimal::ZERO;
        }
    }

    // --- accessors -------------------------------------------------------

    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub fn round_in_progress(&self) -> bool {
        self.round_in_progress
    }

    #[must_use]
    pub fn idle_balance(&self) -> Decimal {
        self.idle_balance
    }

    #[must_use]
    pub fn locked_amount(&self) -> Decimal {
        self.locked_amount
    }

    #[must_use]
    pub fn total_pending(&self) -> Decimal {
        self.total_pending
    }

    #[must_use]
    pub fn withdraw_reserve(&self) -> Decimal {
        self.withdraw_reserve
    }

    #[must_use]
    pub fn fees_collected(&self) -> Decimal {
        self.fees_collected
    }

    #[must_use]
    pub fn fee_recipient(&self) -> &AccountId {
        &self.fee_recipient
    }

    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.shares.total_supply()
    }

    #[must_use]
    pub fn share_balance_of(&self, account: &AccountId) -> Decimal {
        self.shares.balance_of(account)
    }

    /// Share price frozen when the given round rolled over.
    #[must_use]
    pub fn share_price(&self, round: u32) -> Option<Decimal> {
        self.round_price.get(&round).copied()
    }

    /// Assets under management: idle balance plus capital deployed to the
    /// strategy at its last known value.
    #[must_use]
    pub fn total_assets(&self) -> Decimal {
        self.idle_balance + self.locked_amount
    }

    // --- depositor operations -------------------------------------------

    /// Queues a deposit for conversion at the next rollover's frozen price.
    pub fn deposit(&mut self, caller: &AccountId, amount: Decimal) -> Result<(), VaultError> {
        if amount <= Decimal::ZERO {
            return Err(VaultError::InvalidAmount);
        }
        let would_be = self.total_assets() + amount;
        if would_be > self.cap {
            return Err(VaultError::CapExceeded {
                would_be,
                cap: self.cap,
            });
        }

        self.settle_deposit_receipt(caller);
        let round = self.round;
        let receipt = self.deposit_receipts.entry(caller.clone()).or_default();
        receipt.round = round;
        receipt.amount += amount;
        self.total_pending += amount;
        self.idle_balance += amount;

        info!(%caller, %amount, round, "Deposit queued");
        Ok(())
    }

    /// Shares currently claimable by a depositor.
    #[must_use]
    pub fn shares_redeemable(&self, caller: &AccountId) -> Decimal {
        let Some(receipt) = self.deposit_receipts.get(caller) else {
            return Decimal::ZERO;
        };
        let mut total = receipt.unredeemed_shares;
        if receipt.round < self.round && receipt.amount > Decimal::ZERO {
            if let Some(price) = self.round_price.get(&receipt.round) {
                total += receipt.amount / *price;
            }
        }
        total
    }

    /// Claims shares minted for a rolled-over deposit.
    pub fn redeem(&mut self, caller: &AccountId, shares: Decimal) -> Result<(), VaultError> {
        if shares <= Decimal::ZERO {
            return Err(VaultError::InvalidAmount);
        }
        self.settle_deposit_receipt(caller);
        let available = self
            .deposit_receipts
            .get(caller)
            .map_or(Decimal::ZERO, |r| r.unredeemed_shares);
        if shares > available {
            return Err(VaultError::ExceedsRedeemable {
                requested: shares,
                available,
            });
        }

        self.shares.transfer(&Self::custody(), caller, shares)?;
        if let Some(receipt) = self.deposit_receipts.get_mut(caller) {
            receipt.unredeemed_shares -= shares;
        }
        info!(%caller, %shares, "Shares redeemed");
        Ok(())
    }

    /// Claims all redeemable shares. Returns the amount redeemed.
    pub fn max_redeem(&mut self, caller: &AccountId) -> Result<Decimal, VaultError> {
        self.settle_deposit_receipt(caller);
        let available = self
            .deposit_receipts
            .get(caller)
            .map_or(Decimal::ZERO, |r| r.unredeemed_shares);
        if available.is_zero() {
            return Ok(Decimal::ZERO);
        }
        self.redeem(caller, available)?;
        Ok(available)
    }

    /// Queues shares for withdrawal at the current round's eventual price.
    pub fn initiate_withdraw(
        &mut self,
        caller: &AccountId,
        shares: Decimal,
    ) -> Result<(), VaultError> {
        if shares <= Decimal::ZERO {
            return Err(VaultError::InvalidAmount);
        }
        if let Some(receipt) = self.withdrawal_receipts.get(caller) {
            if receipt.is_unresolved() && receipt.round != self.round {
                return Err(VaultError::WithdrawalPendingFromRound {
                    round: receipt.round,
                });
            }
        }

        self.shares.transfer(caller, &Self::custody(), shares)?;
        let round = self.round;
        let receipt = self.withdrawal_receipts.entry(caller.clone()).or_default();
        receipt.round = round;
        receipt.shares += shares;
        self.queued_withdraw_shares += shares;

        info!(%caller, %shares, round, "Withdrawal initiated");
        Ok(())
    }

    /// Burns queued shares and pays out at the price frozen when their round
    /// rolled over. Returns the amount released.
    pub fn complete_withdraw(&mut self, caller: &AccountId) -> Result<Decimal, VaultError> {
        let receipt = self
            .withdrawal_receipts
            .get(caller)
            .cloned()
            .filter(WithdrawalReceipt::is_unresolved)
            .ok_or(VaultError::NoQueuedWithdrawal)?;
        if receipt.round >= self.round {
            return Err(VaultError::WithdrawalNotRolled {
                round: receipt.round,
            });
        }
        let price = self
            .round_price
            .get(&receipt.round)
            .copied()
            .ok_or(VaultError::WithdrawalNotRolled {
                round: receipt.round,
            })?;

        let amount = receipt.shares * price;
        self.shares.burn(&Self::custody(), receipt.shares)?;
        self.reserved_withdraw_shares -= receipt.shares;
        self.withdraw_reserve -= amount;
        self.idle_balance -= amount;
        if let Some(stored) = self.withdrawal_receipts.get_mut(caller) {
            stored.shares = Decimal::ZERO;
        }

        info!(%caller, shares = %receipt.shares, %amount, %price, "Withdrawal completed");
        Ok(amount)
    }

    // --- manager operations ---------------------------------------------

    /// Updates fee rates. Only between rounds.
    pub fn set_fee_config(
        &mut self,
        caller: &AccountId,
        fees: FeeConfig,
    ) -> Result<(), VaultError> {
        self.ensure_manager(caller)?;
        if self.round_in_progress {
            return Err(VaultError::RoundInProgress);
        }
        self.fees = fees;
        Ok(())
    }

    /// Updates the deposit cap. Only between rounds.
    pub fn set_cap(&mut self, caller: &AccountId, cap: Decimal) -> Result<(), VaultError> {
        self.ensure_manager(caller)?;
        if self.round_in_progress {
            return Err(VaultError::RoundInProgress);
        }
        self.cap = cap;
        Ok(())
    }

    /// Rolls the vault into the next round: assesses fees, freezes the share
    /// price, mints pending deposits, reserves queued withdrawals, and hands
    /// the remaining capital to the strategy.
    pub async fn start_next_round(
        &mut self,
        caller: &AccountId,
        board_id: BoardId,
        now: DateTime<Utc>,
        strategy: &mut dyn Strategy,
        market: &mut dyn OptionsMarket,
    ) -> Result<(), VaultError> {
        self.ensure_manager(caller)?;
        if self.round_in_progress {
            return Err(VaultError::RoundInProgress);
        }
        let held = strategy.held_funds();
        if !held.is_zero() {
            return Err(VaultError::StrategyHoldingFunds { amount: held });
        }

        // Everything below is computed before any state changes, so a
        // rejected board leaves the vault untouched.
        let effective_supply = self.shares.total_supply() - self.reserved_withdraw_shares;
        let gross_assets = self.idle_balance - self.total_pending - self.withdraw_reserve;
        let elapsed = self
            .last_rollover_at
            .map_or_else(Duration::zero, |t| now - t);
        let assessed =
            fees::assess_round_fees(&self.fees, gross_assets, self.last_locked_amount, elapsed);
        let fee_total = assessed.total().min(gross_assets.max(Decimal::ZERO));
        let assets_after = gross_assets - fee_total;

        let price = if effective_supply.is_zero() {
            Decimal::ONE
        } else {
            assets_after / effective_supply
        };
        if price <= Decimal::ZERO
            && !(self.total_pending.is_zero() && self.queued_withdraw_shares.is_zero())
        {
            return Err(VaultError::SharePriceCollapsed);
        }

        let minted = if self.total_pending.is_zero() {
            Decimal::ZERO
        } else {
            self.total_pending / price
        };
        let reserve_add = self.queued_withdraw_shares * price;
        let locked = self.idle_balance - fee_total - self.withdraw_reserve - reserve_add;
        debug_assert!(locked >= Decimal::ZERO);

        // The strategy validates the board before any capital moves.
        strategy.set_board(board_id, now, market).await?;

        self.idle_balance -= fee_total;
        self.fees_collected += fee_total;
        self.round_price.insert(self.round, price);
        if !minted.is_zero() {
            self.shares.mint(&Self::custody(), minted);
        }
        self.withdraw_reserve += reserve_add;
        self.reserved_withdraw_shares += self.queued_withdraw_shares;
        self.queued_withdraw_shares = Decimal::ZERO;

        self.idle_balance -= locked;
        strategy.receive_funds(locked);
        self.locked_amount = locked;
        self.last_locked_amount = locked;
        self.total_pending = Decimal::ZERO;
        self.round_in_progress = true;
        self.round += 1;
        self.last_rollover_at = Some(now);

        info!(
            round = self.round,
            board_id,
            %price,
            %locked,
            fees = %fee_total,
            shares_minted = %minted,
            "Round started"
        );
        Ok(())
    }

    /// Ends the active round: pulls all funds back from the strategy and
    /// reopens the vault. Fails while strategy positions remain active.
    pub async fn end_round(
        &mut self,
        caller: &AccountId,
        strategy: &mut dyn Strategy,
        market: &mut dyn OptionsMarket,
    ) -> Result<(), VaultError> {
        self.ensure_manager(caller)?;
        if !self.round_in_progress {
            return Err(VaultError::RoundNotInProgress);
        }

        let returned = strategy.return_funds_and_clear_strikes(market).await?;
        self.idle_balance += returned;
        let pnl = returned - self.locked_amount;
        self.locked_amount = Decimal::ZERO;
        self.round_in_progress = false;

        info!(round = self.round, %returned, %pnl, "Round ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use round_vault_market::sim::SimMarket;
    use round_vault_market::{PositionId, StrikeId};
    use rust_decimal_macros::dec;

    use crate::error::StrategyError;
    use crate::traits::TradeOutcome;

    /// Strategy stub: holds funds and returns them with a configured P&L.
    struct TestStrategy {
        funds: Decimal,
        pnl: Decimal,
    }

    impl TestStrategy {
        fn new(pnl: Decimal) -> Self {
            Self {
                funds: Decimal::ZERO,
                pnl,
            }
        }
    }

    #[async_trait]
    impl Strategy for TestStrategy {
        fn held_funds(&self) -> Decimal {
            self.funds
        }

        fn receive_funds(&mut self, amount: Decimal) {
            self.funds += amount;
        }

        async fn set_board(
            &mut self,
            _board_id: BoardId,
            _now: DateTime<Utc>,
            _market: &mut dyn OptionsMarket,
        ) -> Result<(), StrategyError> {
            Ok(())
        }

        async fn do_trade(
            &mut self,
            _strike_id: StrikeId,
            _now: DateTime<Utc>,
            _market: &mut dyn OptionsMarket,
        ) -> Result<TradeOutcome, StrategyError> {
            Err(StrategyError::NoActiveBoard)
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
            _market: &mut dyn OptionsMarket,
        ) -> Result<Decimal, StrategyError> {
            let total = self.funds + self.pnl;
            self.funds = Decimal::ZERO;
            Ok(total)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn params() -> VaultParams {
        VaultParams {
            cap: dec!(10000),
            manager: "manager".to_string(),
            fee_recipient: "fee-recipient".to_string(),
        }
    }

    /// Zero fees: flow tests can assert exact amounts.
    fn new_vault() -> Vault {
        Vault::new(
            params(),
            FeeConfig {
                management_fee_rate: dec!(0),
                performance_fee_rate: dec!(0),
            },
        )
    }

    fn vault_with_fees() -> Vault {
        Vault::new(
            params(),
            FeeConfig {
                management_fee_rate: dec!(0.02),
                performance_fee_rate: dec!(0.20),
            },
        )
    }

    fn market() -> SimMarket {
        SimMarket::new(t0(), dec!(3000))
    }

    fn mgr() -> AccountId {
        AccountId::from("manager")
    }

    #[tokio::test]
    async fn deposit_rolls_into_locked_capital() {
        let mut vault = new_vault();
        let mut strategy = TestStrategy::new(dec!(0));
        let mut market = market();
        let alice = AccountId::from("alice");

        vault.deposit(&alice, dec!(100)).unwrap();
        assert_eq!(vault.total_pending(), dec!(100));

        vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap();
        assert_eq!(vault.locked_amount(), dec!(100));
        assert_eq!(vault.total_pending(), dec!(0));
        assert_eq!(vault.share_price(1), Some(dec!(1)));
        assert_eq!(strategy.held_funds(), dec!(100));

        // 100 shares minted at price 1, claimable by the depositor.
        assert_eq!(vault.shares_redeemable(&alice), dec!(100));
        vault.redeem(&alice, dec!(100)).unwrap();
        assert_eq!(vault.share_balance_of(&alice), dec!(100));
    }

    #[tokio::test]
    async fn start_fails_while_round_in_progress() {
        let mut vault = new_vault();
        let mut strategy = TestStrategy::new(dec!(0));
        let mut market = market();
        let alice = AccountId::from("alice");

        vault.deposit(&alice, dec!(100)).unwrap();
        vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap();

        let err = vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::RoundInProgress));
    }

    #[tokio::test]
    async fn start_fails_while_strategy_holds_funds() {
        let mut vault = new_vault();
        let mut strategy = TestStrategy::new(dec!(0));
        let mut market = market();
        strategy.receive_funds(dec!(5));

        let err = vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::StrategyHoldingFunds { .. }));
    }

    #[tokio::test]
    async fn only_manager_can_roll_rounds() {
        let mut vault = new_vault();
        let mut strategy = TestStrategy::new(dec!(0));
        let mut market = market();
        let alice = AccountId::from("alice");

        let err = vault
            .start_next_round(&alice, 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn deposit_rejects_amounts_past_cap() {
        let mut vault = new_vault();
        let alice = AccountId::from("alice");
        assert!(matches!(
            vault.deposit(&alice, dec!(0)),
            Err(VaultError::InvalidAmount)
        ));
        assert!(matches!(
            vault.deposit(&alice, dec!(10001)),
            Err(VaultError::CapExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn fees_charged_on_profitable_round() {
        let mut vault = vault_with_fees();
        // Strategy returns 10 profit on top of whatever was locked.
        let mut strategy = TestStrategy::new(dec!(10));
        let mut market = market();
        let alice = AccountId::from("alice");

        vault.deposit(&alice, dec!(100)).unwrap();
        vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap();
        vault
            .end_round(&mgr(), &mut strategy, &mut market)
            .await
            .unwrap();
        assert_eq!(vault.idle_balance(), dec!(110));
        assert!(!vault.round_in_progress());

        // Roll again half a year later: 20% of the 10 profit plus 2%/yr on
        // the 100 locked for half a year.
        let half_year = t0() + Duration::seconds(365 * 24 * 3600 / 2);
        vault
            .start_next_round(&mgr(), 2, half_year, &mut strategy, &mut market)
            .await
            .unwrap();
        assert_eq!(vault.fees_collected(), dec!(3)); // 2 performance + 1 management
        assert_eq!(vault.locked_amount(), dec!(107));
        // Share price reflects fees: 107 assets over 100 shares.
        assert_eq!(vault.share_price(2), Some(dec!(1.07)));
    }

    #[tokio::test]
    async fn round_capital_conservation() {
        let mut vault = vault_with_fees();
        let mut strategy = TestStrategy::new(dec!(20));
        let mut market = market();
        let alice = AccountId::from("alice");
        let bob = AccountId::from("bob");

        vault.deposit(&alice, dec!(300)).unwrap();
        vault.deposit(&bob, dec!(100)).unwrap();
        vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap();
        vault
            .end_round(&mgr(), &mut strategy, &mut market)
            .await
            .unwrap();

        // Bob queues half his shares for withdrawal.
        vault.redeem(&bob, dec!(100)).unwrap();
        vault.initiate_withdraw(&bob, dec!(50)).unwrap();

        let assets_before = vault.idle_balance();
        let fees_before = vault.fees_collected();
        let later = t0() + Duration::days(7);
        vault
            .start_next_round(&mgr(), 2, later, &mut strategy, &mut market)
            .await
            .unwrap();
        let fees = vault.fees_collected() - fees_before;

        // assetsBefore - fees == new locked + queued withdrawal reserve.
        assert_eq!(
            assets_before - fees,
            vault.locked_amount() + vault.withdraw_reserve()
        );
    }

    #[tokio::test]
    async fn withdrawal_settles_at_frozen_price_after_rollover() {
        let mut vault = new_vault();
        let mut strategy = TestStrategy::new(dec!(40)); // 10% profit on 400
        let mut market = market();
        let alice = AccountId::from("alice");

        vault.deposit(&alice, dec!(400)).unwrap();
        vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap();
        vault
            .end_round(&mgr(), &mut strategy, &mut market)
            .await
            .unwrap();

        vault.redeem(&alice, dec!(400)).unwrap();
        vault.initiate_withdraw(&alice, dec!(50)).unwrap();

        // Not rolled yet: completion must fail.
        let err = vault.complete_withdraw(&alice).unwrap_err();
        assert!(matches!(err, VaultError::WithdrawalNotRolled { .. }));

        let later = t0() + Duration::days(7);
        vault
            .start_next_round(&mgr(), 2, later, &mut strategy, &mut market)
            .await
            .unwrap();

        // Price for round 2 (where the withdrawal was queued) is frozen now.
        let price = vault.share_price(2).unwrap();
        let paid = vault.complete_withdraw(&alice).unwrap();
        assert_eq!(paid, dec!(50) * price);
        assert_eq!(vault.withdraw_reserve(), dec!(0));

        // Receipt is spent.
        let err = vault.complete_withdraw(&alice).unwrap_err();
        assert!(matches!(err, VaultError::NoQueuedWithdrawal));
    }

    #[tokio::test]
    async fn withdrawal_across_rounds_must_complete_first() {
        let mut vault = new_vault();
        let mut strategy = TestStrategy::new(dec!(0));
        let mut market = market();
        let alice = AccountId::from("alice");

        vault.deposit(&alice, dec!(100)).unwrap();
        vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap();
        vault
            .end_round(&mgr(), &mut strategy, &mut market)
            .await
            .unwrap();
        vault.redeem(&alice, dec!(100)).unwrap();
        vault.initiate_withdraw(&alice, dec!(10)).unwrap();

        vault
            .start_next_round(&mgr(), 2, t0() + Duration::days(7), &mut strategy, &mut market)
            .await
            .unwrap();
        vault
            .end_round(&mgr(), &mut strategy, &mut market)
            .await
            .unwrap();

        // New round, old receipt unresolved: initiation is rejected.
        let err = vault.initiate_withdraw(&alice, dec!(10)).unwrap_err();
        assert!(matches!(err, VaultError::WithdrawalPendingFromRound { .. }));

        vault.complete_withdraw(&alice).unwrap();
        vault.initiate_withdraw(&alice, dec!(10)).unwrap();
    }

    #[tokio::test]
    async fn same_round_withdrawals_accumulate() {
        let mut vault = new_vault();
        let mut strategy = TestStrategy::new(dec!(0));
        let mut market = market();
        let alice = AccountId::from("alice");

        vault.deposit(&alice, dec!(100)).unwrap();
        vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap();
        vault.redeem(&alice, dec!(100)).unwrap();
        vault.initiate_withdraw(&alice, dec!(10)).unwrap();
        vault.initiate_withdraw(&alice, dec!(15)).unwrap();

        vault
            .end_round(&mgr(), &mut strategy, &mut market)
            .await
            .unwrap();
        vault
            .start_next_round(&mgr(), 2, t0() + Duration::days(7), &mut strategy, &mut market)
            .await
            .unwrap();
        let paid = vault.complete_withdraw(&alice).unwrap();
        assert_eq!(paid, dec!(25));
    }

    #[tokio::test]
    async fn redemption_value_independent_of_submission_order() {
        // Two depositors in one round settle at the same frozen price, each
        // getting (pending / totalPending) of the minted shares.
        let mut vault = new_vault();
        let mut strategy = TestStrategy::new(dec!(0));
        let mut market = market();
        let alice = AccountId::from("alice");
        let bob = AccountId::from("bob");

        vault.deposit(&alice, dec!(75)).unwrap();
        vault.deposit(&bob, dec!(25)).unwrap();
        vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap();

        let minted = vault.total_supply();
        assert_eq!(vault.shares_redeemable(&alice), minted * dec!(0.75));
        assert_eq!(vault.shares_redeemable(&bob), minted * dec!(0.25));
    }

    #[tokio::test]
    async fn config_changes_blocked_mid_round() {
        let mut vault = new_vault();
        let mut strategy = TestStrategy::new(dec!(0));
        let mut market = market();
        let alice = AccountId::from("alice");

        vault.deposit(&alice, dec!(100)).unwrap();
        vault.set_cap(&mgr(), dec!(20000)).unwrap();
        vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap();

        assert!(matches!(
            vault.set_cap(&mgr(), dec!(30000)),
            Err(VaultError::RoundInProgress)
        ));
        assert!(matches!(
            vault.set_fee_config(&mgr(), FeeConfig::default()),
            Err(VaultError::RoundInProgress)
        ));
    }

    #[tokio::test]
    async fn deposits_during_active_round_queue_for_next() {
        let mut vault = new_vault();
        let mut strategy = TestStrategy::new(dec!(0));
        let mut market = market();
        let alice = AccountId::from("alice");
        let bob = AccountId::from("bob");

        vault.deposit(&alice, dec!(100)).unwrap();
        vault
            .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
            .await
            .unwrap();

        // Bob deposits mid-round; nothing is redeemable until the next roll.
        vault.deposit(&bob, dec!(50)).unwrap();
        assert_eq!(vault.total_pending(), dec!(50));
        assert_eq!(vault.shares_redeemable(&bob), dec!(0));

        vault
            .end_round(&mgr(), &mut strategy, &mut market)
            .await
            .unwrap();
        vault
            .start_next_round(&mgr(), 2, t0() + Duration::days(7), &mut strategy, &mut market)
            .await
            .unwrap();
        assert_eq!(vault.shares_redeemable(&bob), dec!(50));
        assert_eq!(vault.locked_amount(), dec!(150));
    }
}
