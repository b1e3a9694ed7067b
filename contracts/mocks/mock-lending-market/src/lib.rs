#![no_std]
use soroban_sdk::{contract, contractimpl, contracttype, token, Address, Env};

const WAD: u128 = 1_000_000_000_000_000_000u128;
const BPS: u128 = 10_000u128;

#[contracttype]
enum DataKey {
    Token,
    Initialized,
    LiquidationThreshold,
    Supplied(Address),
    Borrowed(Address),
    WithdrawHaircutBps,
    BorrowLimitPerCall,
    SupplyRatePerSecond,
    BorrowRatePerSecond,
    ExchangeRate,
}

/// Single-asset money market used as the strategy's lending venue in tests.
///
/// Accounts supply and borrow the same token. Borrowing and withdrawing are
/// gated by the liquidation threshold (WAD). Two knobs simulate stress:
/// a withdrawal haircut (slippage) and a per-call borrow limit (market depth).
#[contract]
pub struct MockLendingMarket;

#[contractimpl]
impl MockLendingMarket {
    pub fn initialize(env: Env, token: Address, liquidation_threshold: u128) {
        if env
            .storage()
            .persistent()
            .get::<_, bool>(&DataKey::Initialized)
            .is_some()
        {
            panic!("already initialized");
        }
        if liquidation_threshold == 0 || liquidation_threshold >= WAD {
            panic!("bad threshold");
        }
        env.storage().persistent().set(&DataKey::Token, &token);
        env.storage()
            .persistent()
            .set(&DataKey::LiquidationThreshold, &liquidation_threshold);
        env.storage().persistent().set(&DataKey::ExchangeRate, &WAD);
        env.storage().persistent().set(&DataKey::Initialized, &true);
    }

    pub fn supply(env: Env, account: Address, amount: u128) -> u128 {
        account.require_auth();
        if amount == 0 {
            panic!("bad amount");
        }
        let token = get_token(&env);
        let market = env.current_contract_address();
        token::Client::new(&env, &token).transfer(&account, &market, &to_i128(amount));
        let supplied = get_supplied(&env, &account);
        set_supplied(&env, &account, supplied + amount);
        amount
    }

    pub fn withdraw(env: Env, account: Address, amount: u128) -> u128 {
        account.require_auth();
        if amount == 0 {
            panic!("bad amount");
        }
        let supplied = get_supplied(&env, &account);
        if amount > supplied {
            panic!("insufficient supply");
        }
        let remaining = supplied - amount;
        let borrowed = get_borrowed(&env, &account);
        if borrowed.saturating_mul(WAD) > remaining.saturating_mul(get_threshold(&env)) {
            panic!("insufficient collateral");
        }
        set_supplied(&env, &account, remaining);
        let haircut_bps: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::WithdrawHaircutBps)
            .unwrap_or(0u128);
        let out = amount - amount * haircut_bps / BPS;
        if out > 0 {
            let token = get_token(&env);
            let market = env.current_contract_address();
            token::Client::new(&env, &token).transfer(&market, &account, &to_i128(out));
        }
        out
    }

    pub fn borrow(env: Env, account: Address, amount: u128) -> u128 {
        account.require_auth();
        if amount == 0 {
            panic!("bad amount");
        }
        let limit: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::BorrowLimitPerCall)
            .unwrap_or(0u128);
        let amount = if limit > 0 && amount > limit { limit } else { amount };
        let supplied = get_supplied(&env, &account);
        let borrowed = get_borrowed(&env, &account) + amount;
        if borrowed.saturating_mul(WAD) > supplied.saturating_mul(get_threshold(&env)) {
            panic!("insufficient collateral");
        }
        set_borrowed(&env, &account, borrowed);
        let token = get_token(&env);
        let market = env.current_contract_address();
        token::Client::new(&env, &token).transfer(&market, &account, &to_i128(amount));
        amount
    }

    pub fn repay(env: Env, account: Address, amount: u128) -> u128 {
        account.require_auth();
        let borrowed = get_borrowed(&env, &account);
        let pay = if amount > borrowed { borrowed } else { amount };
        if pay == 0 {
            return 0;
        }
        let token = get_token(&env);
        let market = env.current_contract_address();
        token::Client::new(&env, &token).transfer(&account, &market, &to_i128(pay));
        set_borrowed(&env, &account, borrowed - pay);
        pay
    }

    pub fn current_supplied(env: Env, account: Address) -> u128 {
        get_supplied(&env, &account)
    }

    pub fn current_borrowed(env: Env, account: Address) -> u128 {
        get_borrowed(&env, &account)
    }

    pub fn liquidation_threshold(env: Env) -> u128 {
        get_threshold(&env)
    }

    pub fn exchange_rate(env: Env) -> u128 {
        env.storage()
            .persistent()
            .get(&DataKey::ExchangeRate)
            .unwrap_or(WAD)
    }

    pub fn supply_rate_per_second(env: Env) -> u128 {
        env.storage()
            .persistent()
            .get(&DataKey::SupplyRatePerSecond)
            .unwrap_or(0u128)
    }

    pub fn borrow_rate_per_second(env: Env) -> u128 {
        env.storage()
            .persistent()
            .get(&DataKey::BorrowRatePerSecond)
            .unwrap_or(0u128)
    }

    // Test knobs

    pub fn set_liquidation_threshold(env: Env, liquidation_threshold: u128) {
        if liquidation_threshold == 0 || liquidation_threshold >= WAD {
            panic!("bad threshold");
        }
        env.storage()
            .persistent()
            .set(&DataKey::LiquidationThreshold, &liquidation_threshold);
    }

    pub fn set_withdraw_haircut(env: Env, haircut_bps: u128) {
        if haircut_bps > BPS {
            panic!("bad haircut");
        }
        env.storage()
            .persistent()
            .set(&DataKey::WithdrawHaircutBps, &haircut_bps);
    }

    pub fn set_borrow_limit_per_call(env: Env, limit: u128) {
        env.storage()
            .persistent()
            .set(&DataKey::BorrowLimitPerCall, &limit);
    }

    pub fn set_rates(env: Env, supply_rate_per_second: u128, borrow_rate_per_second: u128) {
        env.storage()
            .persistent()
            .set(&DataKey::SupplyRatePerSecond, &supply_rate_per_second);
        env.storage()
            .persistent()
            .set(&DataKey::BorrowRatePerSecond, &borrow_rate_per_second);
    }

    /// Credits interest directly to an account's balances.
    pub fn accrue_interest(env: Env, account: Address, supply_gain: u128, borrow_gain: u128) {
        let supplied = get_supplied(&env, &account);
        let borrowed = get_borrowed(&env, &account);
        set_supplied(&env, &account, supplied + supply_gain);
        set_borrowed(&env, &account, borrowed + borrow_gain);
    }
}

fn get_token(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Token)
        .expect("token not set")
}

fn get_threshold(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::LiquidationThreshold)
        .expect("threshold not set")
}

fn get_supplied(env: &Env, account: &Address) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::Supplied(account.clone()))
        .unwrap_or(0u128)
}

fn set_supplied(env: &Env, account: &Address, value: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::Supplied(account.clone()), &value);
}

fn get_borrowed(env: &Env, account: &Address) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::Borrowed(account.clone()))
        .unwrap_or(0u128)
}

fn set_borrowed(env: &Env, account: &Address, value: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::Borrowed(account.clone()), &value);
}

fn to_i128(amount: u128) -> i128 {
    if amount > i128::MAX as u128 {
        panic!("amount exceeds i128");
    }
    amount as i128
}
