use soroban_sdk::{contractevent, Address};

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deposit {
    #[topic]
    pub user: Address,
    pub amount: u128,
    pub fee: u128,
    pub shares: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Withdraw {
    #[topic]
    pub user: Address,
    pub shares: u128,
    pub amount: u128,
    pub fee: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShareTransfer {
    #[topic]
    pub from: Address,
    #[topic]
    pub to: Address,
    pub shares: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewDepositFee {
    pub fee_bps: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewWithdrawFee {
    pub fee_bps: u32,
}

/// Zero means uncapped.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewTvlCap {
    pub tvl_cap: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewTreasury {
    #[topic]
    pub treasury: Address,
}
