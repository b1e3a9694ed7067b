use soroban_sdk::{contracttype, token, Address, Env};
use stellar_tokens::fungible::Base as TokenBase;

use crate::constants::*;
use crate::error::Error;

#[soroban_sdk::contractclient(name = "StrategyClient")]
pub trait Strategy {
    fn deposit(env: Env) -> Result<(), Error>;
    fn withdraw(env: Env, amount: u128) -> Result<u128, Error>;
    fn balance_of(env: Env) -> Result<u128, Error>;
}

#[contracttype]
pub enum DataKey {
    Initialized,
    Underlying,
    Strategy,
    Governance,
    Treasury,
    Config,
    Locked,
}

/// Fees in bps. A zero `tvl_cap` leaves deposits uncapped.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VaultConfig {
    pub deposit_fee_bps: u32,
    pub withdraw_fee_bps: u32,
    pub tvl_cap: u128,
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().persistent().has(&DataKey::Initialized)
}

pub fn ensure_initialized(env: &Env) -> Result<(), Error> {
    if !is_initialized(env) {
        return Err(Error::NotInitialized);
    }
    bump_core_ttl(env);
    Ok(())
}

pub fn get_address(env: &Env, key: &DataKey) -> Result<Address, Error> {
    env.storage()
        .persistent()
        .get(key)
        .ok_or(Error::NotInitialized)
}

pub fn set_address(env: &Env, key: &DataKey, addr: &Address) {
    env.storage().persistent().set(key, addr);
}

pub fn require_governance(env: &Env) -> Result<(), Error> {
    let governance = get_address(env, &DataKey::Governance)?;
    governance.require_auth();
    Ok(())
}

pub fn get_strategy(env: &Env) -> Result<StrategyClient<'_>, Error> {
    let addr = get_address(env, &DataKey::Strategy)?;
    Ok(StrategyClient::new(env, &addr))
}

pub fn get_config(env: &Env) -> Result<VaultConfig, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)
}

pub fn set_config(env: &Env, config: &VaultConfig) {
    env.storage().persistent().set(&DataKey::Config, config);
}

pub fn acquire_lock(env: &Env) -> Result<(), Error> {
    let locked: bool = env
        .storage()
        .instance()
        .get(&DataKey::Locked)
        .unwrap_or(false);
    if locked {
        return Err(Error::OperationInFlight);
    }
    env.storage().instance().set(&DataKey::Locked, &true);
    Ok(())
}

pub fn release_lock(env: &Env) {
    env.storage().instance().remove(&DataKey::Locked);
}

pub fn share_balance(env: &Env, addr: &Address) -> u128 {
    let bal = TokenBase::balance(env, addr);
    if bal < 0 {
        0
    } else {
        bal as u128
    }
}

pub fn total_shares(env: &Env) -> u128 {
    let supply = TokenBase::total_supply(env);
    if supply < 0 {
        0
    } else {
        supply as u128
    }
}

pub fn token_balance(env: &Env, token: &Address, owner: &Address) -> u128 {
    let bal = token::Client::new(env, token).balance(owner);
    if bal < 0 {
        0
    } else {
        bal as u128
    }
}

pub fn bump_core_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    for key in [
        DataKey::Initialized,
        DataKey::Underlying,
        DataKey::Strategy,
        DataKey::Governance,
        DataKey::Treasury,
        DataKey::Config,
    ] {
        if persistent.has(&key) {
            persistent.extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
        }
    }
}
