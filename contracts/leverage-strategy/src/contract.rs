use soroban_sdk::{contract, contractimpl, Address, BytesN, Env, Vec};

use crate::constants::*;
use crate::error::Error;
use crate::events::*;
use crate::harvest_log;
use crate::helpers::{authorize_transfer, bump_core_ttl, transfer_out};
use crate::leverage::Leverage;
use crate::math::{bps_ceil, bps_floor, mul_div, seconds_until_liquidation, within_tolerance};
use crate::storage::{self, *};

#[contract]
pub struct LeverageStrategy;

#[contractimpl]
impl LeverageStrategy {
    /// Binds the strategy to its vault and collaborators. Starts `Active`
    /// with default leverage and fee configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        env: Env,
        vault: Address,
        underlying: Address,
        market: Address,
        reward_router: Address,
        governance: Address,
        treasury: Address,
        strategist: Address,
    ) -> Result<(), Error> {
        if is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }
        governance.require_auth();
        set_address(&env, &DataKey::Vault, &vault);
        set_address(&env, &DataKey::Underlying, &underlying);
        set_address(&env, &DataKey::Market, &market);
        set_address(&env, &DataKey::RewardRouter, &reward_router);
        set_address(&env, &DataKey::Governance, &governance);
        set_address(&env, &DataKey::Treasury, &treasury);
        set_address(&env, &DataKey::Strategist, &strategist);
        set_config(&env, &default_config());
        storage::set_fees(&env, &default_fees());
        set_status(&env, StrategyStatus::Active);
        harvest_log::init(&env, env.ledger().timestamp());
        env.storage().persistent().set(&DataKey::Initialized, &true);
        bump_core_ttl(&env);
        Ok(())
    }

    // Vault entry points

    /// Supplies everything the vault forwarded and rebalances.
    pub fn deposit(env: Env) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_vault(&env)?;
        acquire_lock(&env)?;
        if get_status(&env)? != StrategyStatus::Active {
            return Err(Error::InvalidState);
        }
        let config = get_config(&env)?;
        let lev = Leverage::load(&env)?;
        lev.supply_idle()?;
        lev.settle(&config)?;
        release_lock(&env);
        Ok(())
    }

    /// Frees `amount` of underlying and sends it to the vault. Returns what
    /// was sent, which may be short of `amount` by at most the configured
    /// slippage tolerance.
    pub fn withdraw(env: Env, amount: u128) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        let vault = require_vault(&env)?;
        acquire_lock(&env)?;
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }
        let status = get_status(&env)?;
        let config = get_config(&env)?;
        let lev = Leverage::load(&env)?;

        let idle = lev.idle();
        if idle < amount {
            lev.free_capital(&config, amount - idle)?;
        }
        let sent = amount.min(lev.idle());
        if !within_tolerance(sent, amount, config.withdraw_slippage_bps)? {
            return Err(Error::SlippageExceeded);
        }
        transfer_out(&env, lev.underlying(), &vault, sent)?;

        if matches!(status, StrategyStatus::Active | StrategyStatus::Paused) {
            lev.settle(&config)?;
        }
        release_lock(&env);
        Ok(sent)
    }

    // Keeper entry points

    /// Claims rewards, swaps them to underlying, pays the performance fee
    /// and compounds the rest into the position.
    pub fn harvest(env: Env, caller: Address) -> Result<HarvestReport, Error> {
        ensure_initialized(&env)?;
        caller.require_auth();
        acquire_lock(&env)?;
        if get_status(&env)? != StrategyStatus::Active {
            return Err(Error::InvalidState);
        }
        let config = get_config(&env)?;
        let fees = get_fees(&env)?;
        let lev = Leverage::load(&env)?;
        let this = env.current_contract_address();
        let balance_before = lev.balance();

        let router = get_reward_router(&env)?;
        let claimed = router.claim_rewards(&this);
        let profit = if claimed > 0 {
            let reward_token = router.reward_token();
            authorize_transfer(&env, &reward_token, &router.address, claimed)?;
            router.swap_to_underlying(&this, &claimed, &0u128)
        } else {
            0
        };

        let report = split_profit(profit, &fees)?;
        let underlying = lev.underlying().clone();
        transfer_out(&env, &underlying, &caller, report.call_fee)?;
        transfer_out(
            &env,
            &underlying,
            &get_address(&env, &DataKey::Treasury)?,
            report.treasury_fee,
        )?;
        transfer_out(
            &env,
            &underlying,
            &get_address(&env, &DataKey::Strategist)?,
            report.strategist_fee,
        )?;

        lev.supply_idle()?;
        lev.settle(&config)?;

        let yield_wad = if balance_before == 0 {
            0
        } else {
            mul_div(report.compounded, WAD, balance_before)?
        };
        harvest_log::record(&env, env.ledger().timestamp(), yield_wad)?;

        Harvested {
            caller,
            profit: report.profit,
            call_fee: report.call_fee,
            treasury_fee: report.treasury_fee,
            strategist_fee: report.strategist_fee,
            compounded: report.compounded,
        }
        .publish(&env);
        release_lock(&env);
        Ok(report)
    }

    /// Moves the position back inside the drift band. Returns the LTV
    /// reached. Surfaces `IterationLimitReached` when the loops run out.
    pub fn rebalance(env: Env) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        acquire_lock(&env)?;
        if !matches!(
            get_status(&env)?,
            StrategyStatus::Active | StrategyStatus::Paused
        ) {
            return Err(Error::InvalidState);
        }
        let config = get_config(&env)?;
        let lev = Leverage::load(&env)?;
        lev.rebalance(&config)?;
        let ltv = lev.position().ltv()?;
        release_lock(&env);
        Ok(ltv)
    }

    /// `(expected_profit, caller_fee)` for a harvest right now.
    pub fn estimate_harvest(env: Env) -> Result<(u128, u128), Error> {
        ensure_initialized(&env)?;
        let router = get_reward_router(&env)?;
        let pending = router.pending_rewards(&env.current_contract_address());
        let profit = if pending == 0 {
            0
        } else {
            router.quote_to_underlying(&pending)
        };
        let report = split_profit(profit, &get_fees(&env)?)?;
        Ok((report.profit, report.call_fee))
    }

    pub fn avg_apr_across_last_n_harvests(env: Env, n: u32) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        harvest_log::average_apr(&env, n)
    }

    pub fn harvest_entries(env: Env) -> Result<Vec<HarvestEntry>, Error> {
        ensure_initialized(&env)?;
        harvest_log::entries(&env)
    }

    pub fn harvest_log_state(env: Env) -> Result<HarvestLogState, Error> {
        ensure_initialized(&env)?;
        harvest_log::state(&env)
    }

    // Governance

    pub fn update_harvest_log_cadence(env: Env, min_interval: u64) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        harvest_log::set_cadence(&env, min_interval)?;
        NewHarvestLogCadence { min_interval }.publish(&env);
        Ok(())
    }

    /// Target must stay below `liquidation_threshold - safety_margin`.
    pub fn set_target_ltv(env: Env, target_ltv: u128) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        let mut config = get_config(&env)?;
        let threshold = get_market(&env)?.liquidation_threshold();
        if target_ltv >= threshold.saturating_sub(config.safety_margin) {
            return Err(Error::LtvOutOfBounds);
        }
        config.target_ltv = target_ltv;
        set_config(&env, &config);
        NewTargetLtv { target_ltv }.publish(&env);
        Ok(())
    }

    pub fn set_allowed_drift(env: Env, allowed_drift: u128) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        if allowed_drift > MAX_ALLOWED_DRIFT {
            return Err(Error::InvalidParameter);
        }
        let mut config = get_config(&env)?;
        config.allowed_drift = allowed_drift;
        set_config(&env, &config);
        publish_leverage_params(&env, &config);
        Ok(())
    }

    pub fn set_safety_margin(env: Env, safety_margin: u128) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        let mut config = get_config(&env)?;
        let threshold = get_market(&env)?.liquidation_threshold();
        if safety_margin >= threshold {
            return Err(Error::InvalidParameter);
        }
        if config.target_ltv >= threshold - safety_margin {
            return Err(Error::LtvOutOfBounds);
        }
        config.safety_margin = safety_margin;
        set_config(&env, &config);
        publish_leverage_params(&env, &config);
        Ok(())
    }

    pub fn set_min_leverage_amount(env: Env, min_leverage_amount: u128) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        let mut config = get_config(&env)?;
        config.min_leverage_amount = min_leverage_amount;
        set_config(&env, &config);
        publish_leverage_params(&env, &config);
        Ok(())
    }

    pub fn set_withdraw_slippage_tolerance(env: Env, tolerance_bps: u32) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        if tolerance_bps > PANIC_SLIPPAGE_CEILING_BPS {
            return Err(Error::InvalidParameter);
        }
        let mut config = get_config(&env)?;
        config.withdraw_slippage_bps = tolerance_bps;
        set_config(&env, &config);
        NewSlippageTolerance {
            withdraw_slippage_bps: tolerance_bps,
        }
        .publish(&env);
        Ok(())
    }

    pub fn set_fees(env: Env, fees: FeeConfig) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        if fees.total_fee_bps > MAX_TOTAL_FEE_BPS
            || fees.strategist_fee_bps > MAX_STRATEGIST_FEE_BPS
            || fees.call_fee_bps as u128 + fees.treasury_fee_bps as u128 != BPS
        {
            return Err(Error::InvalidParameter);
        }
        storage::set_fees(&env, &fees);
        NewFees {
            total_fee_bps: fees.total_fee_bps,
            call_fee_bps: fees.call_fee_bps,
            treasury_fee_bps: fees.treasury_fee_bps,
            strategist_fee_bps: fees.strategist_fee_bps,
        }
        .publish(&env);
        Ok(())
    }

    // Lifecycle

    pub fn pause(env: Env) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        transition(&env, StrategyStatus::Active, StrategyStatus::Paused)
    }

    pub fn unpause(env: Env) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        transition(&env, StrategyStatus::Paused, StrategyStatus::Active)
    }

    /// Emergency unwind with the slippage ceiling. Everything goes back to
    /// the vault and the strategy stays `Panicked`.
    pub fn panic(env: Env) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        match get_status(&env)? {
            StrategyStatus::Panicked => return Ok(()),
            StrategyStatus::Retired => return Err(Error::InvalidState),
            _ => {}
        }
        acquire_lock(&env)?;
        unwind_to_vault(&env, PANIC_SLIPPAGE_CEILING_BPS)?;
        set_status(&env, StrategyStatus::Panicked);
        StatusChanged {
            status: StrategyStatus::Panicked,
        }
        .publish(&env);
        release_lock(&env);
        Ok(())
    }

    /// Graceful unwind with the configured tolerance.
    pub fn retire(env: Env) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        match get_status(&env)? {
            StrategyStatus::Retired => return Ok(()),
            StrategyStatus::Panicked => return Err(Error::InvalidState),
            _ => {}
        }
        acquire_lock(&env)?;
        let config = get_config(&env)?;
        unwind_to_vault(&env, config.withdraw_slippage_bps)?;
        set_status(&env, StrategyStatus::Retired);
        StatusChanged {
            status: StrategyStatus::Retired,
        }
        .publish(&env);
        release_lock(&env);
        Ok(())
    }

    pub fn upgrade_wasm(env: Env, new_wasm_hash: BytesN<32>) -> Result<(), Error> {
        ensure_initialized(&env)?;
        require_governance(&env)?;
        env.deployer().update_current_contract_wasm(new_wasm_hash);
        Ok(())
    }

    // Views

    /// Idle underlying plus supplied minus borrowed.
    pub fn balance_of(env: Env) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        Ok(Leverage::load(&env)?.balance())
    }

    pub fn current_ltv(env: Env) -> Result<u128, Error> {
        ensure_initialized(&env)?;
        Leverage::load(&env)?.position().ltv()
    }

    pub fn position(env: Env) -> Result<PositionSnapshot, Error> {
        ensure_initialized(&env)?;
        let lev = Leverage::load(&env)?;
        let position = lev.position();
        Ok(PositionSnapshot {
            supplied: position.supplied,
            borrowed: position.borrowed,
            idle: lev.idle(),
            ltv: position.ltv()?,
            target_ltv: get_config(&env)?.target_ltv,
            liquidation_threshold: lev.threshold(),
            exchange_rate: lev.market().exchange_rate(),
        })
    }

    pub fn seconds_until_liquidation(env: Env) -> Result<u64, Error> {
        ensure_initialized(&env)?;
        let lev = Leverage::load(&env)?;
        let position = lev.position();
        let market = lev.market();
        seconds_until_liquidation(
            position.supplied,
            position.borrowed,
            lev.threshold(),
            market.supply_rate_per_second(),
            market.borrow_rate_per_second(),
        )
    }

    pub fn status(env: Env) -> Result<StrategyStatus, Error> {
        ensure_initialized(&env)?;
        get_status(&env)
    }

    pub fn config(env: Env) -> Result<LeverageConfig, Error> {
        ensure_initialized(&env)?;
        get_config(&env)
    }

    pub fn fees(env: Env) -> Result<FeeConfig, Error> {
        ensure_initialized(&env)?;
        get_fees(&env)
    }

    pub fn vault(env: Env) -> Result<Address, Error> {
        get_address(&env, &DataKey::Vault)
    }

    pub fn underlying(env: Env) -> Result<Address, Error> {
        get_address(&env, &DataKey::Underlying)
    }
}

fn transition(env: &Env, from: StrategyStatus, to: StrategyStatus) -> Result<(), Error> {
    if get_status(env)? != from {
        return Err(Error::InvalidState);
    }
    set_status(env, to);
    StatusChanged { status: to }.publish(env);
    Ok(())
}

fn unwind_to_vault(env: &Env, tolerance_bps: u32) -> Result<(), Error> {
    let lev = Leverage::load(env)?;
    lev.unwind(tolerance_bps)?;
    let vault = get_address(env, &DataKey::Vault)?;
    transfer_out(env, lev.underlying(), &vault, lev.idle())
}

/// Performance fee rounds up against the profit; the call fee and the
/// strategist cut round down so the treasury absorbs the remainder.
fn split_profit(profit: u128, fees: &FeeConfig) -> Result<HarvestReport, Error> {
    let fee = bps_ceil(profit, fees.total_fee_bps)?.min(profit);
    let call_fee = bps_floor(fee, fees.call_fee_bps)?;
    let treasury_share = fee - call_fee;
    let strategist_fee = bps_floor(treasury_share, fees.strategist_fee_bps)?;
    Ok(HarvestReport {
        profit,
        call_fee,
        treasury_fee: treasury_share - strategist_fee,
        strategist_fee,
        compounded: profit - fee,
    })
}

fn publish_leverage_params(env: &Env, config: &LeverageConfig) {
    NewLeverageParams {
        allowed_drift: config.allowed_drift,
        safety_margin: config.safety_margin,
        min_leverage_amount: config.min_leverage_amount,
    }
    .publish(env);
}
