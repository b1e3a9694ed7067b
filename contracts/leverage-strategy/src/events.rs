use soroban_sdk::{contractevent, Address};

use crate::storage::StrategyStatus;

/// Emitted whenever a lever or delever loop moved the position.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rebalanced {
    pub ltv_before: u128,
    pub ltv_after: u128,
    pub iterations: u32,
}

/// A rebalance ran out of iterations but the position stayed under the
/// safe limit, so the surrounding operation kept the closest LTV reached.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeverageIncomplete {
    pub ltv: u128,
    pub target_ltv: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Harvested {
    #[topic]
    pub caller: Address,
    pub profit: u128,
    pub call_fee: u128,
    pub treasury_fee: u128,
    pub strategist_fee: u128,
    pub compounded: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatusChanged {
    pub status: StrategyStatus,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewTargetLtv {
    pub target_ltv: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewLeverageParams {
    pub allowed_drift: u128,
    pub safety_margin: u128,
    pub min_leverage_amount: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewSlippageTolerance {
    pub withdraw_slippage_bps: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewFees {
    pub total_fee_bps: u32,
    pub call_fee_bps: u32,
    pub treasury_fee_bps: u32,
    pub strategist_fee_bps: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewHarvestLogCadence {
    pub min_interval: u64,
}
