use soroban_sdk::auth::{ContractContext, InvokerContractAuthEntry, SubContractInvocation};
use soroban_sdk::{token, Address, Env, IntoVal, Symbol, Vec};

use crate::constants::*;
use crate::error::Error;
use crate::storage::DataKey;

pub fn to_i128(amount: u128) -> Result<i128, Error> {
    if amount > i128::MAX as u128 {
        return Err(Error::ArithmeticOverflow);
    }
    Ok(amount as i128)
}

pub fn token_balance(env: &Env, token: &Address, owner: &Address) -> u128 {
    let balance = token::Client::new(env, token).balance(owner);
    if balance < 0 {
        0
    } else {
        balance as u128
    }
}

pub fn transfer_out(env: &Env, token: &Address, to: &Address, amount: u128) -> Result<(), Error> {
    if amount == 0 {
        return Ok(());
    }
    let amount = to_i128(amount)?;
    token::Client::new(env, token).transfer(&env.current_contract_address(), to, &amount);
    Ok(())
}

/// Pre-authorizes a `transfer(self, to, amount)` that `to` will pull from
/// this contract during the next cross-contract call.
pub fn authorize_transfer(env: &Env, token: &Address, to: &Address, amount: u128) -> Result<(), Error> {
    let args = (env.current_contract_address(), to.clone(), to_i128(amount)?).into_val(env);
    let ctx = ContractContext {
        contract: token.clone(),
        fn_name: Symbol::new(env, "transfer"),
        args,
    };
    let mut auths = Vec::new(env);
    auths.push_back(InvokerContractAuthEntry::Contract(SubContractInvocation {
        context: ctx,
        sub_invocations: Vec::new(env),
    }));
    env.authorize_as_current_contract(auths);
    Ok(())
}

pub fn bump_core_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    for key in [
        DataKey::Initialized,
        DataKey::Vault,
        DataKey::Underlying,
        DataKey::Market,
        DataKey::RewardRouter,
        DataKey::Governance,
        DataKey::Treasury,
        DataKey::Strategist,
        DataKey::Config,
        DataKey::Fees,
        DataKey::Status,
        DataKey::HarvestLog,
    ] {
        if persistent.has(&key) {
            persistent.extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
        }
    }
}

pub fn bump_harvest_entry_ttl(env: &Env, slot: u32) {
    let key = DataKey::HarvestEntry(slot);
    let persistent = env.storage().persistent();
    if persistent.has(&key) {
        persistent.extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
}
