use soroban_sdk::{contracttype, Address, Env};

use crate::constants::*;
use crate::error::Error;
use crate::helpers::bump_core_ttl;

#[soroban_sdk::contractclient(name = "MarketAdapterClient")]
pub trait MarketAdapter {
    fn supply(env: Env, account: Address, amount: u128) -> u128;
    fn withdraw(env: Env, account: Address, amount: u128) -> u128;
    fn borrow(env: Env, account: Address, amount: u128) -> u128;
    fn repay(env: Env, account: Address, amount: u128) -> u128;
    fn current_supplied(env: Env, account: Address) -> u128;
    fn current_borrowed(env: Env, account: Address) -> u128;
    fn liquidation_threshold(env: Env) -> u128;
    fn exchange_rate(env: Env) -> u128;
    fn supply_rate_per_second(env: Env) -> u128;
    fn borrow_rate_per_second(env: Env) -> u128;
}

#[soroban_sdk::contractclient(name = "RewardRouterClient")]
pub trait RewardRouter {
    fn reward_token(env: Env) -> Address;
    fn pending_rewards(env: Env, account: Address) -> u128;
    fn claim_rewards(env: Env, account: Address) -> u128;
    fn quote_to_underlying(env: Env, reward_amount: u128) -> u128;
    fn swap_to_underlying(env: Env, account: Address, reward_amount: u128, min_out: u128) -> u128;
}

#[contracttype]
pub enum DataKey {
    Initialized,
    Vault,
    Underlying,
    Market,
    RewardRouter,
    Governance,
    Treasury,
    Strategist,
    Config,
    Fees,
    Status,
    HarvestLog,
    HarvestEntry(u32), // ring slot
    Locked,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StrategyStatus {
    Active,
    Paused,
    Panicked,
    Retired,
}

/// Leverage parameters. Ratios are WAD scaled.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeverageConfig {
    pub target_ltv: u128,
    pub allowed_drift: u128,
    pub safety_margin: u128,
    pub withdraw_slippage_bps: u32,
    pub min_leverage_amount: u128,
}

/// Performance fee taken from each harvest. `call_fee_bps` and
/// `treasury_fee_bps` split the fee and sum to 10_000; the strategist cut
/// comes out of the treasury share.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeConfig {
    pub total_fee_bps: u32,
    pub call_fee_bps: u32,
    pub treasury_fee_bps: u32,
    pub strategist_fee_bps: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HarvestEntry {
    pub timestamp: u64,
    pub duration: u64,
    pub yield_wad: u128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HarvestLogState {
    pub cursor: u32,
    pub len: u32,
    pub cadence: u64,
    pub last_harvest: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HarvestReport {
    pub profit: u128,
    pub call_fee: u128,
    pub treasury_fee: u128,
    pub strategist_fee: u128,
    pub compounded: u128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionSnapshot {
    pub supplied: u128,
    pub borrowed: u128,
    pub idle: u128,
    pub ltv: u128,
    pub target_ltv: u128,
    pub liquidation_threshold: u128,
    pub exchange_rate: u128,
}

pub fn default_config() -> LeverageConfig {
    LeverageConfig {
        target_ltv: DEFAULT_TARGET_LTV,
        allowed_drift: DEFAULT_ALLOWED_DRIFT,
        safety_margin: DEFAULT_SAFETY_MARGIN,
        withdraw_slippage_bps: DEFAULT_WITHDRAW_SLIPPAGE_BPS,
        min_leverage_amount: DEFAULT_MIN_LEVERAGE_AMOUNT,
    }
}

pub fn default_fees() -> FeeConfig {
    FeeConfig {
        total_fee_bps: DEFAULT_TOTAL_FEE_BPS,
        call_fee_bps: DEFAULT_CALL_FEE_BPS,
        treasury_fee_bps: DEFAULT_TREASURY_FEE_BPS,
        strategist_fee_bps: DEFAULT_STRATEGIST_FEE_BPS,
    }
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

pub fn require_vault(env: &Env) -> Result<Address, Error> {
    let vault = get_address(env, &DataKey::Vault)?;
    vault.require_auth();
    Ok(vault)
}

pub fn get_market(env: &Env) -> Result<MarketAdapterClient<'_>, Error> {
    let addr = get_address(env, &DataKey::Market)?;
    Ok(MarketAdapterClient::new(env, &addr))
}

pub fn get_reward_router(env: &Env) -> Result<RewardRouterClient<'_>, Error> {
    let addr = get_address(env, &DataKey::RewardRouter)?;
    Ok(RewardRouterClient::new(env, &addr))
}

pub fn get_config(env: &Env) -> Result<LeverageConfig, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)
}

pub fn set_config(env: &Env, config: &LeverageConfig) {
    env.storage().persistent().set(&DataKey::Config, config);
}

pub fn get_fees(env: &Env) -> Result<FeeConfig, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Fees)
        .ok_or(Error::NotInitialized)
}

pub fn set_fees(env: &Env, fees: &FeeConfig) {
    env.storage().persistent().set(&DataKey::Fees, fees);
}

pub fn get_status(env: &Env) -> Result<StrategyStatus, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Status)
        .ok_or(Error::NotInitialized)
}

pub fn set_status(env: &Env, status: StrategyStatus) {
    env.storage().persistent().set(&DataKey::Status, &status);
}

/// Reentrancy guard shared by every state-changing entry point.
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
