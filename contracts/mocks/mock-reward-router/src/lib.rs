#![no_std]
use soroban_sdk::{contract, contractimpl, contracttype, token, Address, Env};

const WAD: u128 = 1_000_000_000_000_000_000u128;

#[contracttype]
enum DataKey {
    Initialized,
    RewardToken,
    Underlying,
    Rate,
    Pending(Address),
}

/// Reward emissions plus reward→underlying conversion for tests.
///
/// The router must be the admin of both Stellar asset contracts: claims mint
/// reward tokens, swaps take the reward tokens and mint underlying at `rate`
/// (underlying per reward token, WAD).
#[contract]
pub struct MockRewardRouter;

#[contractimpl]
impl MockRewardRouter {
    pub fn initialize(env: Env, reward_token: Address, underlying: Address, rate: u128) {
        if env
            .storage()
            .persistent()
            .get::<_, bool>(&DataKey::Initialized)
            .is_some()
        {
            panic!("already initialized");
        }
        env.storage()
            .persistent()
            .set(&DataKey::RewardToken, &reward_token);
        env.storage()
            .persistent()
            .set(&DataKey::Underlying, &underlying);
        env.storage().persistent().set(&DataKey::Rate, &rate);
        env.storage().persistent().set(&DataKey::Initialized, &true);
    }

    pub fn set_rate(env: Env, rate: u128) {
        env.storage().persistent().set(&DataKey::Rate, &rate);
    }

    pub fn set_pending_rewards(env: Env, account: Address, amount: u128) {
        env.storage()
            .persistent()
            .set(&DataKey::Pending(account), &amount);
    }

    pub fn reward_token(env: Env) -> Address {
        get_address(&env, &DataKey::RewardToken)
    }

    pub fn pending_rewards(env: Env, account: Address) -> u128 {
        env.storage()
            .persistent()
            .get(&DataKey::Pending(account))
            .unwrap_or(0u128)
    }

    pub fn claim_rewards(env: Env, account: Address) -> u128 {
        account.require_auth();
        let pending = Self::pending_rewards(env.clone(), account.clone());
        if pending == 0 {
            return 0;
        }
        env.storage()
            .persistent()
            .set(&DataKey::Pending(account.clone()), &0u128);
        let reward_token = get_address(&env, &DataKey::RewardToken);
        token::StellarAssetClient::new(&env, &reward_token).mint(&account, &to_i128(pending));
        pending
    }

    pub fn quote_to_underlying(env: Env, reward_amount: u128) -> u128 {
        reward_amount.saturating_mul(get_rate(&env)) / WAD
    }

    pub fn swap_to_underlying(
        env: Env,
        account: Address,
        reward_amount: u128,
        min_out: u128,
    ) -> u128 {
        account.require_auth();
        if reward_amount == 0 {
            panic!("bad amount");
        }
        let out = Self::quote_to_underlying(env.clone(), reward_amount);
        if out < min_out {
            panic!("insufficient output");
        }
        let reward_token = get_address(&env, &DataKey::RewardToken);
        let router = env.current_contract_address();
        token::Client::new(&env, &reward_token).transfer(
            &account,
            &router,
            &to_i128(reward_amount),
        );
        if out > 0 {
            let underlying = get_address(&env, &DataKey::Underlying);
            token::StellarAssetClient::new(&env, &underlying).mint(&account, &to_i128(out));
        }
        out
    }
}

fn get_address(env: &Env, key: &DataKey) -> Address {
    env.storage()
        .persistent()
        .get(key)
        .expect("router not initialized")
}

fn get_rate(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::Rate)
        .unwrap_or(WAD)
}

fn to_i128(amount: u128) -> i128 {
    if amount > i128::MAX as u128 {
        panic!("amount exceeds i128");
    }
    amount as i128
}
