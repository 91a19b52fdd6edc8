//! Scripted vault lifecycle against the simulated options market.
//!
//! Runs two full rounds: deposits roll into locked capital, the strategy
//! sells premium on two strikes, the board settles out of the money, and a
//! withdrawal queued mid-stream completes at its frozen share price.

use chrono::{Duration, Utc};
use round_vault_core::{AccountId, Strategy, Vault};
use round_vault_market::sim::{SimMarket, StrikeQuote};
use rust_decimal_macros::dec;
use tracing::info;

use crate::config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let manager = AccountId::new(config.vault.manager.clone());
    let alice = AccountId::from("alice");
    let bob = AccountId::from("bob");

    let t0 = Utc::now();
    let expiry = t0 + Duration::days(7);
    let mut market = SimMarket::new(t0, dec!(3000));
    market.add_board(1, expiry);
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
    market.add_strike(
        11,
        1,
        dec!(3400),
        StrikeQuote {
            spot_vol: dec!(0.85),
            gwav_vol: dec!(0.84),
            call_delta: dec!(0.25),
            premium_per_unit: dec!(35),
            min_collateral_per_unit: dec!(350),
        },
    );

    let mut vault = Vault::new(config.vault, config.fees);
    let mut strategy =
        round_vault_strategy::ShortStrategy::new(config.strategy, config.policy);

    vault.deposit(&alice, dec!(5000))?;
    vault.deposit(&bob, dec!(2500))?;
    info!(idle = %vault.idle_balance(), "Deposits queued");

    vault
        .start_next_round(&manager, 1, t0, &mut strategy, &mut market)
        .await?;
    let alice_shares = vault.max_redeem(&alice)?;
    let bob_shares = vault.max_redeem(&bob)?;
    info!(%alice_shares, %bob_shares, locked = %vault.locked_amount(), "Round 1 running");

    strategy.do_trade(10, t0, &mut market).await?;
    strategy.do_trade(11, t0, &mut market).await?;

    // Bob wants out next round; his shares queue at round 2's eventual price.
    vault.initiate_withdraw(&bob, bob_shares)?;

    // Expiry passes out of the money: collateral comes back intact.
    let after_expiry = expiry + Duration::hours(1);
    market.set_now(after_expiry);
    let owed = market.settle_board(1, dec!(3100));
    strategy.receive_funds(owed);
    vault
        .end_round(&manager, &mut strategy, &mut market)
        .await?;
    info!(
        idle = %vault.idle_balance(),
        price = %vault.share_price(1).unwrap_or_default(),
        "Round 1 settled"
    );

    // Round 2 freezes the withdrawal price and locks the remaining capital.
    market.add_board(2, after_expiry + Duration::days(7));
    market.add_strike(
        20,
        2,
        dec!(3300),
        StrikeQuote {
            spot_vol: dec!(0.82),
            gwav_vol: dec!(0.82),
            call_delta: dec!(0.30),
            premium_per_unit: dec!(55),
            min_collateral_per_unit: dec!(420),
        },
    );
    vault
        .start_next_round(&manager, 2, after_expiry, &mut strategy, &mut market)
        .await?;
    let paid = vault.complete_withdraw(&bob)?;
    info!(%paid, price = %vault.share_price(2).unwrap_or_default(), "Bob withdrew");

    strategy.do_trade(20, after_expiry, &mut market).await?;
    let round2_end = after_expiry + Duration::days(7) + Duration::hours(1);
    market.set_now(round2_end);
    let owed = market.settle_board(2, dec!(3250));
    strategy.receive_funds(owed);
    vault
        .end_round(&manager, &mut strategy, &mut market)
        .await?;

    info!(
        rounds = vault.round(),
        idle = %vault.idle_balance(),
        fees = %vault.fees_collected(),
        alice_shares = %vault.share_balance_of(&alice),
        "Demo complete"
    );
    Ok(())
}
