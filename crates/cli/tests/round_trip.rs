//! Full-stack round lifecycle: vault, short strategy, and simulated market
//! wired together the way the demo runs them.

use chrono::{DateTime, Duration, TimeZone, Utc};
use round_vault_core::{AccountId, FeeConfig, Strategy, Vault, VaultParams};
use round_vault_market::sim::{SimMarket, StrikeQuote};
use round_vault_strategy::{PolicyConfig, ShortStrategy, StrategyConfig};
use rust_decimal_macros::dec;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn setup_market() -> SimMarket {
    let mut market = SimMarket::new(t0(), dec!(3000));
    market.add_board(1, t0() + Duration::days(7));
    market.add_strike(
        10,
        1,
        dec!(3200),
        StrikeQuote {
            spot_vol: dec!(0.80),
            gwav_vol: dec!(0.80),
            call_delta: dec!(0.30),
            premium_per_unit: dec!(50),
            min_collateral_per_unit: dec!(400),
        },
    );
    market
}

fn add_next_board(market: &mut SimMarket) {
    market.add_board(2, t0() + Duration::days(14));
    market.add_strike(
        20,
        2,
        dec!(3300),
        StrikeQuote {
            spot_vol: dec!(0.80),
            gwav_vol: dec!(0.80),
            call_delta: dec!(0.30),
            premium_per_unit: dec!(55),
            min_collateral_per_unit: dec!(420),
        },
    );
}

/// Zero fees so every amount asserts exactly.
fn zero_fee_vault() -> Vault {
    Vault::new(
        VaultParams {
            cap: dec!(100000),
            manager: "manager".to_string(),
            fee_recipient: "fee-recipient".to_string(),
        },
        FeeConfig {
            management_fee_rate: dec!(0),
            performance_fee_rate: dec!(0),
        },
    )
}

fn short_strategy() -> ShortStrategy {
    ShortStrategy::new(StrategyConfig::default(), PolicyConfig::default())
}

fn mgr() -> AccountId {
    AccountId::from("manager")
}

#[tokio::test]
async fn profitable_round_pays_withdrawals_above_par() {
    let mut market = setup_market();
    let mut vault = zero_fee_vault();
    let mut strategy = short_strategy();
    let alice = AccountId::from("alice");

    vault.deposit(&alice, dec!(5000)).unwrap();
    vault
        .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
        .await
        .unwrap();
    assert_eq!(vault.max_redeem(&alice).unwrap(), dec!(5000));

    // Sell one call: 1500 collateral out, 50 premium in.
    strategy.do_trade(10, t0(), &mut market).await.unwrap();
    assert_eq!(strategy.held_funds(), dec!(3550));

    // Expires out of the money; full collateral returns.
    let owed = market.settle_board(1, dec!(2900));
    assert_eq!(owed, dec!(1500));
    strategy.receive_funds(owed);
    vault
        .end_round(&mgr(), &mut strategy, &mut market)
        .await
        .unwrap();
    assert_eq!(vault.idle_balance(), dec!(5050));

    // Queue the whole stake, roll, and withdraw at the frozen 1.01 price.
    vault.initiate_withdraw(&alice, dec!(5000)).unwrap();
    add_next_board(&mut market);
    let later = t0() + Duration::days(7) + Duration::hours(1);
    market.set_now(later);
    vault
        .start_next_round(&mgr(), 2, later, &mut strategy, &mut market)
        .await
        .unwrap();
    assert_eq!(vault.share_price(2), Some(dec!(1.01)));
    assert_eq!(vault.locked_amount(), dec!(0)); // everything was queued out

    let paid = vault.complete_withdraw(&alice).unwrap();
    assert_eq!(paid, dec!(5050));
    assert_eq!(vault.withdraw_reserve(), dec!(0));
    assert_eq!(vault.total_supply(), dec!(0));
}

#[tokio::test]
async fn losing_round_marks_the_share_price_down() {
    let mut market = setup_market();
    let mut vault = zero_fee_vault();
    let mut strategy = short_strategy();
    let alice = AccountId::from("alice");

    vault.deposit(&alice, dec!(5000)).unwrap();
    vault
        .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
        .await
        .unwrap();
    vault.max_redeem(&alice).unwrap();
    strategy.do_trade(10, t0(), &mut market).await.unwrap();

    // Settles 200 in the money: 1500 collateral returns as 1300.
    let owed = market.settle_board(1, dec!(3400));
    assert_eq!(owed, dec!(1300));
    strategy.receive_funds(owed);
    vault
        .end_round(&mgr(), &mut strategy, &mut market)
        .await
        .unwrap();
    assert_eq!(vault.idle_balance(), dec!(4850));

    vault.initiate_withdraw(&alice, dec!(1000)).unwrap();
    add_next_board(&mut market);
    let later = t0() + Duration::days(7) + Duration::hours(1);
    market.set_now(later);
    vault
        .start_next_round(&mgr(), 2, later, &mut strategy, &mut market)
        .await
        .unwrap();

    // 4850 assets over 5000 shares.
    assert_eq!(vault.share_price(2), Some(dec!(0.97)));
    let paid = vault.complete_withdraw(&alice).unwrap();
    assert_eq!(paid, dec!(970));
}

#[tokio::test]
async fn mid_round_deposit_waits_for_the_next_roll() {
    let mut market = setup_market();
    let mut vault = zero_fee_vault();
    let mut strategy = short_strategy();
    let alice = AccountId::from("alice");
    let bob = AccountId::from("bob");

    vault.deposit(&alice, dec!(5000)).unwrap();
    vault
        .start_next_round(&mgr(), 1, t0(), &mut strategy, &mut market)
        .await
        .unwrap();

    vault.deposit(&bob, dec!(2000)).unwrap();
    assert_eq!(vault.shares_redeemable(&bob), dec!(0));

    let owed = market.settle_board(1, dec!(2900));
    strategy.receive_funds(owed);
    vault
        .end_round(&mgr(), &mut strategy, &mut market)
        .await
        .unwrap();

    add_next_board(&mut market);
    let later = t0() + Duration::days(7) + Duration::hours(1);
    market.set_now(later);
    vault
        .start_next_round(&mgr(), 2, later, &mut strategy, &mut market)
        .await
        .unwrap();

    // No trades happened in round 1, so the price held at par and Bob's
    // deposit converts one to one.
    assert_eq!(vault.share_price(2), Some(dec!(1)));
    assert_eq!(vault.shares_redeemable(&bob), dec!(2000));
    assert_eq!(vault.locked_amount(), dec!(7000));
}
