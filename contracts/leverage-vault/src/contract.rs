use soroban_sdk::{contract, contractimpl, token, Address, BytesN, Env, String};
use stellar_tokens::fungible::burnable::emit_burn;
use stellar_tokens::fungible::Base as TokenBase;

use crate::constants::*;
use crate::error::Error;
use crate::events::*;
use crate::helpers::{fee_ceil, mul_div, strategy_result, to_i128};
use crate::storage::*;

/// Share ledger in front of a single leverage strategy. Shares are a claim
/// on `balance()`: the vault's idle underlying plus the strategy's
/// `balance_of()`.
#[contract]
pub struct LeverageVault;

#[contractimpl]
impl LeverageVault {
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        env: Env,
        underlying: Address,
        strategy: Address,
        governance: Address,
        treasury: Address,
        name: String,
        symbol: String,
        config: VaultConfig,
    ) -> Result<(), Error> {
        if is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }
        governance.require_auth();
        if config.deposit_fee_bps > MAX_FEE_BPS || config.withdraw_fee_bps > MAX_FEE_BPS {
            return Err(Error::InvalidParameter);
        }
        set_address(&env, &DataKey::Underlying, &underlying);
        set_address(&env, &DataKey::Strategy, &strategy);
        set_address(&env, &DataKey::Governance, &governance);
        set_address(&env, &DataKey::Treasury, &treasury);
        set_config(&env, &config);

        // Shares mirror the underlying's precision.
        let decimals = token::Client::new(&env, &underlying).decimals();
        TokenBase::set_metadata(&env, decimals, name, symbol);

        env.storage().persistent().set(&DataKey::Initialized, &true);
        bump_core_ttl(&env);
        Ok(())
    }

    /// Takes `amount` from `user`, charges the deposit fee and mints shares
    /// against the pooled value before the deposit. Idle funds are then
    /// forwarded to the strategy.
    ///
    /// The vault has no pause of its own: a strategy that is not `Active`
    /// rejects the forwarded funds and the deposit fails with `InvalidState`.
    pub fn deposit(env: Env, user: Address, amount: u128) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        user.require_auth();
        acquire_lock(&env)?;
        let shares = do_deposit(&env, &user, amount)?;
        release_lock(&env);
        Ok(shares)
    }

    pub fn deposit_all(env: Env, user: Address) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        user.require_auth();
        acquire_lock(&env)?;
        let underlying = get_address(&env, &DataKey::Underlying)?;
        let amount = token_balance(&env, &underlying, &user);
        let shares = do_deposit(&env, &user, amount)?;
        release_lock(&env);
        Ok(shares)
    }

    /// Burns `shares` and pays out their entitlement net of the withdrawal
    /// fee. Returns the amount sent to `user`.
    pub fn withdraw(env: Env, user: Address, shares: u128) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        user.require_auth();
        acquire_lock(&env)?;
        let paid = do_withdraw(&env, &user, shares)?;
        release_lock(&env);
        Ok(paid)
    }

    pub fn withdraw_all(env: Env, user: Address) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        user.require_auth();
        acquire_lock(&env)?;
        let shares = share_balance(&env, &user);
        let paid = do_withdraw(&env, &user, shares)?;
        release_lock(&env);
        Ok(paid)
    }

    /// Idle underlying plus everything the strategy holds.
    pub fn balance(env: Env) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        pooled_value(&env)
    }

    /// Idle underlying held by the vault itself.
    pub fn available(env: Env) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        idle(&env)
    }

    /// Underlying per share, WAD scaled. `1e18` while no shares exist.
    pub fn get_price_per_full_share(env: Env) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        let supply = total_shares(&env);
        if supply == 0 {
            return Ok(WAD);
        }
        mul_div(pooled_value(&env)?, WAD, supply)
    }

    // Shares

    pub fn share_balance(env: Env, id: Address) -> u128 {
        share_balance(&env, &id)
    }

    pub fn total_supply(env: Env) -> u128 {
        total_shares(&env)
    }

    pub fn name(env: Env) -> String {
        TokenBase::name(&env)
    }

    pub fn symbol(env: Env) -> String {
        TokenBase::symbol(&env)
    }

    pub fn decimals(env: Env) -> u32 {
        TokenBase::decimals(&env)
    }

    pub fn transfer(env: Env, from: Address, to: Address, shares: u128) -> Result<(), Error> {
        ensure_initialized(&env)?;
        from.require_auth();
        if shares == 0 {
            return Err(Error::InvalidAmount);
        }
        if share_balance(&env, &from) < shares {
            return Err(Error::InsufficientShares);
        }
        TokenBase::update(&env, Some(&from), Some(&to), to_i128(shares)?);
        ShareTransfer { from, to, shares }.publish(&env);
        Ok(())
    }

    // Governance

    pub fn set_deposit_fee(env: Env, fee_bps: u32) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        if fee_bps > MAX_FEE_BPS {
            return Err(Error::InvalidParameter);
        }
        let mut config = get_config(&env)?;
        config.deposit_fee_bps = fee_bps;
        set_config(&env, &config);
        NewDepositFee { fee_bps }.publish(&env);
        Ok(())
    }

    pub fn set_withdraw_fee(env: Env, fee_bps: u32) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        if fee_bps > MAX_FEE_BPS {
            return Err(Error::InvalidParameter);
        }
        let mut config = get_config(&env)?;
        config.withdraw_fee_bps = fee_bps;
        set_config(&env, &config);
        NewWithdrawFee { fee_bps }.publish(&env);
        Ok(())
    }

    pub fn set_tvl_cap(env: Env, tvl_cap: u128) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        let mut config = get_config(&env)?;
        config.tvl_cap = tvl_cap;
        set_config(&env, &config);
        NewTvlCap { tvl_cap }.publish(&env);
        Ok(())
    }

    pub fn set_treasury(env: Env, treasury: Address) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        set_address(&env, &DataKey::Treasury, &treasury);
        NewTreasury { treasury }.publish(&env);
        Ok(())
    }

    pub fn upgrade_wasm(env: Env, new_wasm_hash: BytesN<32>) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        env.deployer().update_current_contract_wasm(new_wasm_hash);
        Ok(())
    }

    // Views

    pub fn config(env: Env) -> Result<VaultConfig, Error> {
        ensure_initialized(&env)?;
        get_config(&env)
    }

    pub fn strategy(env: Env) -> Result<Address, Error> {
        get_address(&env, &DataKey::Strategy)
    }

    pub fn underlying(env: Env) -> Result<Address, Error> {
        get_address(&env, &DataKey::Underlying)
    }

    pub fn treasury(env: Env) -> Result<Address, Error> {
        get_address(&env, &DataKey::Treasury)
    }
}

fn idle(env: &Env) -> Result<u128, Error> {
    let underlying = get_address(env, &DataKey::Underlying)?;
    Ok(token_balance(env, &underlying, &env.current_contract_address()))
}

fn pooled_value(env: &Env) -> Result<u128, Error> {
    let invested = strategy_result(get_strategy(env)?.try_balance_of())?;
    idle(env)?
        .checked_add(invested)
        .ok_or(Error::ArithmeticOverflow)
}

fn send(env: &Env, to: &Address, amount: u128) -> Result<(), Error> {
    if amount == 0 {
        return Ok(());
    }
    let underlying = get_address(env, &DataKey::Underlying)?;
    token::Client::new(env, &underlying).transfer(
        &env.current_contract_address(),
        to,
        &to_i128(amount)?,
    );
    Ok(())
}

fn do_deposit(env: &Env, user: &Address, amount: u128) -> Result<u128, Error> {
    if amount == 0 {
        return Err(Error::InvalidAmount);
    }
    let config = get_config(env)?;
    let fee = fee_ceil(amount, config.deposit_fee_bps)?;
    let net = amount - fee;
    // The fee leaves for the treasury, so only `net` counts against the cap.
    let pool_before = pooled_value(env)?;
    if config.tvl_cap > 0
        && pool_before
            .checked_add(net)
            .ok_or(Error::ArithmeticOverflow)?
            > config.tvl_cap
    {
        return Err(Error::CapExceeded);
    }

    let underlying = get_address(env, &DataKey::Underlying)?;
    let vault = env.current_contract_address();
    token::Client::new(env, &underlying).transfer(user, &vault, &to_i128(amount)?);
    send(env, &get_address(env, &DataKey::Treasury)?, fee)?;

    let supply = total_shares(env);
    let shares = if supply == 0 {
        net
    } else {
        mul_div(net, supply, pool_before)?
    };
    if shares == 0 {
        return Err(Error::InvalidAmount);
    }
    TokenBase::mint(env, user, to_i128(shares)?);

    earn(env, &underlying)?;

    Deposit {
        user: user.clone(),
        amount,
        fee,
        shares,
    }
    .publish(env);
    Ok(shares)
}

/// Hands every idle unit to the strategy and lets it rebalance.
fn earn(env: &Env, underlying: &Address) -> Result<(), Error> {
    let strategy = get_strategy(env)?;
    let vault = env.current_contract_address();
    let idle = token_balance(env, underlying, &vault);
    if idle > 0 {
        token::Client::new(env, underlying).transfer(&vault, &strategy.address, &to_i128(idle)?);
    }
    strategy_result(strategy.try_deposit())
}

fn do_withdraw(env: &Env, user: &Address, shares: u128) -> Result<u128, Error> {
    if shares == 0 {
        return Err(Error::InvalidAmount);
    }
    if share_balance(env, user) < shares {
        return Err(Error::InsufficientShares);
    }
    let config = get_config(env)?;
    let supply = total_shares(env);
    let mut entitled = mul_div(shares, pooled_value(env)?, supply)?;

    let burn = to_i128(shares)?;
    TokenBase::update(env, Some(user), None, burn);
    emit_burn(env, user, burn);

    let idle_before = idle(env)?;
    if idle_before < entitled {
        let shortfall = entitled - idle_before;
        strategy_result(get_strategy(env)?.try_withdraw(&shortfall))?;
        let received = idle(env)?.saturating_sub(idle_before);
        if received < shortfall {
            entitled = idle_before + received;
        }
    }
    if entitled == 0 {
        return Err(Error::InvalidAmount);
    }

    let fee = fee_ceil(entitled, config.withdraw_fee_bps)?;
    send(env, &get_address(env, &DataKey::Treasury)?, fee)?;
    let paid = entitled - fee;
    send(env, user, paid)?;

    Withdraw {
        user: user.clone(),
        shares,
        amount: paid,
        fee,
    }
    .publish(env);
    Ok(paid)
}
