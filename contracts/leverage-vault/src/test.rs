#![cfg(test)]

use leverage_strategy::{LeverageStrategy, LeverageStrategyClient};
use mock_lending_market::{MockLendingMarket, MockLendingMarketClient};
use mock_reward_router::{MockRewardRouter, MockRewardRouterClient};
use soroban_sdk::testutils::{Address as _, Ledger};
use soroban_sdk::{token, Address, Env, String};

use crate::storage::DataKey;
use crate::{Error, LeverageVault, LeverageVaultClient, VaultConfig, WAD};

const THRESHOLD: u128 = 800_000_000_000_000_000; // 0.80
const E: u128 = 1_000_000_000;

struct Setup<'a> {
    env: Env,
    vault: LeverageVaultClient<'a>,
    strategy: LeverageStrategyClient<'a>,
    market: MockLendingMarketClient<'a>,
    router: MockRewardRouterClient<'a>,
    token: token::Client<'a>,
    treasury: Address,
}

fn setup_with(config: VaultConfig) -> Setup<'static> {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().with_mut(|l| l.timestamp = 1_000);

    let governance = Address::generate(&env);
    let treasury = Address::generate(&env);
    let strategist = Address::generate(&env);

    let router_id = env.register(MockRewardRouter, ());
    let underlying = env
        .register_stellar_asset_contract_v2(router_id.clone())
        .address();
    let reward = env
        .register_stellar_asset_contract_v2(router_id.clone())
        .address();
    let router = MockRewardRouterClient::new(&env, &router_id);
    router.initialize(&reward, &underlying, &WAD);

    let market_id = env.register(MockLendingMarket, ());
    let market = MockLendingMarketClient::new(&env, &market_id);
    market.initialize(&underlying, &THRESHOLD);
    token::StellarAssetClient::new(&env, &underlying)
        .mint(&market_id, &1_000_000_000_000_000i128);

    let vault_id = env.register(LeverageVault, ());
    let strategy_id = env.register(LeverageStrategy, ());

    let vault = LeverageVaultClient::new(&env, &vault_id);
    vault.initialize(
        &underlying,
        &strategy_id,
        &governance,
        &treasury,
        &String::from_str(&env, "Leveraged USDC"),
        &String::from_str(&env, "lvUSDC"),
        &config,
    );
    let strategy = LeverageStrategyClient::new(&env, &strategy_id);
    strategy.initialize(
        &vault_id,
        &underlying,
        &market_id,
        &router_id,
        &governance,
        &treasury,
        &strategist,
    );

    let token = token::Client::new(&env, &underlying);
    Setup {
        env,
        vault,
        strategy,
        market,
        router,
        token,
        treasury,
    }
}

fn no_fees() -> VaultConfig {
    VaultConfig {
        deposit_fee_bps: 0,
        withdraw_fee_bps: 0,
        tvl_cap: 0,
    }
}

fn setup() -> Setup<'static> {
    setup_with(no_fees())
}

fn user_with(s: &Setup, amount: u128) -> Address {
    let user = Address::generate(&s.env);
    token::StellarAssetClient::new(&s.env, &s.token.address).mint(&user, &(amount as i128));
    user
}

#[test]
fn first_deposit_prices_shares_at_par() {
    let s = setup_with(VaultConfig {
        deposit_fee_bps: 10,
        withdraw_fee_bps: 0,
        tvl_cap: 0,
    });
    let user = user_with(&s, 100);

    assert_eq!(s.vault.get_price_per_full_share(), WAD);
    let shares = s.vault.deposit(&user, &100u128);
    assert_eq!(shares, 99);
    assert_eq!(s.vault.share_balance(&user), 99);
    assert_eq!(s.token.balance(&s.treasury), 1);
    assert_eq!(s.vault.get_price_per_full_share(), WAD);
    assert_eq!(s.vault.balance(), 99);
    // everything was forwarded
    assert_eq!(s.vault.available(), 0);
    assert_eq!(s.strategy.balance_of(), 99);
}

#[test]
fn metadata_follows_underlying() {
    let s = setup();
    assert_eq!(s.vault.decimals(), s.token.decimals());
    assert_eq!(s.vault.symbol(), String::from_str(&s.env, "lvUSDC"));
    assert_eq!(s.vault.name(), String::from_str(&s.env, "Leveraged USDC"));
}

#[test]
fn round_trip_returns_deposit_minus_fees() {
    let s = setup_with(VaultConfig {
        deposit_fee_bps: 0,
        withdraw_fee_bps: 10,
        tvl_cap: 0,
    });
    let user = user_with(&s, E);

    s.vault.deposit(&user, &E);
    let pos = s.strategy.position();
    assert_eq!(pos.borrowed, 2_703_703_703);

    let paid = s.vault.withdraw_all(&user);
    assert_eq!(paid, 999_000_000);
    assert_eq!(s.token.balance(&user), 999_000_000);
    assert_eq!(s.token.balance(&s.treasury), 1_000_000);
    assert_eq!(s.vault.total_supply(), 0);
    assert_eq!(s.vault.balance(), 0);
    let pos = s.strategy.position();
    assert_eq!(pos.supplied, 0);
    assert_eq!(pos.borrowed, 0);
}

#[test]
fn entitlement_rounds_down() {
    let s = setup();
    s.strategy.set_target_ltv(&0u128);
    let alice = user_with(&s, 1_000);
    let bob = user_with(&s, 1_000);

    s.vault.deposit(&alice, &1_000u128);
    s.market
        .accrue_interest(&s.strategy.address, &500u128, &0u128);
    assert_eq!(s.vault.balance(), 1_500);
    assert_eq!(s.vault.get_price_per_full_share(), 1_500_000_000_000_000_000);

    // 3 * 1500 / 1000 = 4.5
    assert_eq!(s.vault.withdraw(&alice, &3u128), 4);

    // 1000 * 997 / 1496 = 666.44
    assert_eq!(s.vault.deposit(&bob, &1_000u128), 666);
}

#[test]
fn partial_withdraw_keeps_leverage() {
    let s = setup();
    let user = user_with(&s, E);
    s.vault.deposit(&user, &E);

    assert_eq!(s.vault.withdraw(&user, &400_000_000u128), 400_000_000);
    assert_eq!(s.vault.share_balance(&user), 600_000_000);
    assert_eq!(s.vault.balance(), 600_000_000);
    assert_eq!(s.strategy.position().borrowed, 1_622_222_222);
    assert_eq!(s.vault.get_price_per_full_share(), WAD);
}

#[test]
fn slippage_aborts_withdrawal_without_side_effects() {
    let s = setup();
    let user = user_with(&s, E);
    s.vault.deposit(&user, &E);
    let before = s.strategy.position();

    s.market.set_withdraw_haircut(&200u128);
    assert_eq!(
        s.vault.try_withdraw(&user, &400_000_000u128),
        Err(Ok(Error::SlippageExceeded))
    );
    assert_eq!(s.vault.share_balance(&user), E);
    assert_eq!(s.vault.total_supply(), E);
    assert_eq!(s.strategy.position(), before);
    assert_eq!(s.token.balance(&user), 0);
}

#[test]
fn short_strategy_payout_shrinks_entitlement() {
    let s = setup();
    s.strategy.set_target_ltv(&0u128);
    let user = user_with(&s, 1_000_000);
    s.vault.deposit(&user, &1_000_000u128);

    s.market.set_withdraw_haircut(&30u128);
    assert_eq!(s.vault.withdraw(&user, &100_000u128), 99_700);
    assert_eq!(s.token.balance(&user), 99_700);
    assert_eq!(s.vault.total_supply(), 900_000);
    assert_eq!(s.vault.balance(), 900_000);
}

#[test]
fn deposit_guards() {
    let s = setup();
    let user = user_with(&s, 1_000);
    assert_eq!(
        s.vault.try_deposit(&user, &0u128),
        Err(Ok(Error::InvalidAmount))
    );
    assert_eq!(
        s.vault.try_withdraw(&user, &0u128),
        Err(Ok(Error::InvalidAmount))
    );
    s.vault.deposit(&user, &1_000u128);
    assert_eq!(
        s.vault.try_withdraw(&user, &1_001u128),
        Err(Ok(Error::InsufficientShares))
    );
}

#[test]
fn tvl_cap_limits_pooled_value() {
    let s = setup();
    s.vault.set_tvl_cap(&1_000u128);
    let user = user_with(&s, 2_000);

    assert_eq!(
        s.vault.try_deposit(&user, &1_001u128),
        Err(Ok(Error::CapExceeded))
    );
    s.vault.deposit(&user, &1_000u128);
    assert_eq!(
        s.vault.try_deposit(&user, &1u128),
        Err(Ok(Error::CapExceeded))
    );

    s.vault.set_tvl_cap(&0u128);
    assert_eq!(s.vault.deposit_all(&user), 1_000);
    assert_eq!(s.token.balance(&user), 0);
}

#[test]
fn tvl_cap_counts_deposit_net_of_fee() {
    let s = setup_with(VaultConfig {
        deposit_fee_bps: 10,
        withdraw_fee_bps: 0,
        tvl_cap: 1_000,
    });
    let user = user_with(&s, 2_000);

    // fee of 2 leaves exactly 1_000 in the pool
    assert_eq!(s.vault.deposit(&user, &1_002u128), 1_000);
    assert_eq!(s.vault.balance(), 1_000);
    assert_eq!(s.token.balance(&s.treasury), 2);

    // fee of 1 leaves 1 above the cap
    assert_eq!(
        s.vault.try_deposit(&user, &2u128),
        Err(Ok(Error::CapExceeded))
    );
    assert_eq!(s.token.balance(&user), 998);
}

#[test]
fn paused_strategy_blocks_deposits_not_withdrawals() {
    let s = setup();
    let user = user_with(&s, E + 1_000);
    s.vault.deposit(&user, &E);

    s.strategy.pause();
    assert_eq!(
        s.vault.try_deposit(&user, &1_000u128),
        Err(Ok(Error::InvalidState))
    );
    assert_eq!(s.token.balance(&user), 1_000);

    assert_eq!(s.vault.withdraw(&user, &400_000_000u128), 400_000_000);
    assert_eq!(s.vault.balance(), 600_000_000);
}

#[test]
fn pool_empties_exactly_when_last_share_burns() {
    let s = setup();
    let alice = user_with(&s, E);
    let bob = user_with(&s, E / 2);
    assert_eq!(s.vault.total_supply(), 0);
    assert_eq!(s.vault.balance(), 0);

    s.vault.deposit(&alice, &E);
    assert_eq!(s.vault.deposit(&bob, &(E / 2)), E / 2);
    assert_eq!(s.vault.balance(), 1_500_000_000);

    s.router
        .set_pending_rewards(&s.strategy.address, &10_000_000u128);
    s.env.ledger().with_mut(|l| l.timestamp += 86_400);
    s.strategy.harvest(&Address::generate(&s.env));
    assert_eq!(s.vault.balance(), 1_509_550_000);

    // 1e9 * 1_509_550_000 / 1.5e9 = 1_006_366_666.67
    assert_eq!(s.vault.withdraw_all(&alice), 1_006_366_666);
    assert_eq!(s.vault.total_supply(), E / 2);
    assert_eq!(s.vault.balance(), 503_183_334);

    assert_eq!(s.vault.withdraw_all(&bob), 503_183_334);
    assert_eq!(s.vault.total_supply(), 0);
    assert_eq!(s.vault.balance(), 0);
    assert_eq!(s.vault.get_price_per_full_share(), WAD);
    let pos = s.strategy.position();
    assert_eq!(pos.supplied, 0);
    assert_eq!(pos.borrowed, 0);
}

#[test]
fn fee_setters_are_bounded() {
    let s = setup();
    assert_eq!(
        s.vault.try_set_deposit_fee(&1_001u32),
        Err(Ok(Error::InvalidParameter))
    );
    assert_eq!(
        s.vault.try_set_withdraw_fee(&1_001u32),
        Err(Ok(Error::InvalidParameter))
    );
    s.vault.set_deposit_fee(&25u32);
    s.vault.set_withdraw_fee(&1_000u32);
    let config = s.vault.config();
    assert_eq!(config.deposit_fee_bps, 25);
    assert_eq!(config.withdraw_fee_bps, 1_000);

    let treasury = Address::generate(&s.env);
    s.vault.set_treasury(&treasury);
    assert_eq!(s.vault.treasury(), treasury);
}

#[test]
fn harvest_raises_price_per_share() {
    let s = setup();
    let user = user_with(&s, E);
    s.vault.deposit(&user, &E);

    s.router
        .set_pending_rewards(&s.strategy.address, &10_000_000u128);
    s.env.ledger().with_mut(|l| l.timestamp += 86_400);
    let keeper = Address::generate(&s.env);
    s.strategy.harvest(&keeper);

    assert_eq!(s.vault.balance(), 1_009_550_000);
    assert_eq!(
        s.vault.get_price_per_full_share(),
        1_009_550_000_000_000_000
    );
    assert_eq!(s.vault.withdraw_all(&user), 1_009_550_000);
}

#[test]
fn panicked_strategy_pays_out_from_vault() {
    let s = setup();
    let user = user_with(&s, E + 1);
    s.vault.deposit(&user, &E);

    s.strategy.panic();
    assert_eq!(s.vault.available(), E);
    assert_eq!(s.vault.balance(), E);
    assert_eq!(
        s.vault.try_deposit(&user, &1u128),
        Err(Ok(Error::InvalidState))
    );

    assert_eq!(s.vault.withdraw_all(&user), E);
    assert_eq!(s.vault.total_supply(), 0);
    assert_eq!(s.vault.balance(), 0);
}

#[test]
fn retired_strategy_returns_everything() {
    let s = setup();
    let user = user_with(&s, E);
    s.vault.deposit(&user, &E);

    s.strategy.retire();
    s.strategy.retire();
    assert_eq!(s.strategy.balance_of(), 0);
    assert_eq!(s.vault.available(), E);
    assert_eq!(s.vault.withdraw(&user, &(E / 2)), E / 2);
}

#[test]
fn shares_are_transferable() {
    let s = setup();
    let alice = user_with(&s, 10_000);
    let bob = Address::generate(&s.env);
    s.vault.deposit(&alice, &10_000u128);

    s.vault.transfer(&alice, &bob, &4_000u128);
    assert_eq!(s.vault.share_balance(&alice), 6_000);
    assert_eq!(s.vault.share_balance(&bob), 4_000);
    assert_eq!(
        s.vault.try_transfer(&alice, &bob, &6_001u128),
        Err(Ok(Error::InsufficientShares))
    );

    assert_eq!(s.vault.withdraw_all(&bob), 4_000);
    assert_eq!(s.token.balance(&bob), 4_000);
}

#[test]
fn reentrant_call_is_rejected() {
    let s = setup();
    let user = user_with(&s, 1_000);
    s.env.as_contract(&s.vault.address, || {
        s.env.storage().instance().set(&DataKey::Locked, &true);
    });
    assert_eq!(
        s.vault.try_deposit(&user, &1_000u128),
        Err(Ok(Error::OperationInFlight))
    );
}

#[test]
fn uninitialized_vault_rejects_calls() {
    let env = Env::default();
    env.mock_all_auths();
    let vault = LeverageVaultClient::new(&env, &env.register(LeverageVault, ()));
    let user = Address::generate(&env);
    assert_eq!(
        vault.try_deposit(&user, &1u128),
        Err(Ok(Error::NotInitialized))
    );
    assert_eq!(vault.try_balance(), Err(Ok(Error::NotInitialized)));
}

#[test]
fn double_initialize_fails() {
    let s = setup();
    let other = Address::generate(&s.env);
    assert_eq!(
        s.vault.try_initialize(
            &other,
            &other,
            &other,
            &other,
            &String::from_str(&s.env, "x"),
            &String::from_str(&s.env, "x"),
            &no_fees(),
        ),
        Err(Ok(Error::AlreadyInitialized))
    );
}
